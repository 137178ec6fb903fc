//! URL-template tile providers.
//!
//! Most slippy-map services differ only in their URL. [`TemplateProvider`]
//! fills `{z}`, `{x}` and `{y}` placeholders and serves both the built-in
//! OpenStreetMap source and user-supplied custom endpoints.

use crate::provider::{AsyncHttpClient, AsyncProvider, ProviderError};

/// OpenStreetMap standard tile layer.
///
/// Subject to the OSM tile usage policy:
/// <https://operations.osmfoundation.org/policies/tiles/>
pub const OSM_URL_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Tile provider driven by an XYZ URL template.
pub struct TemplateProvider<C: AsyncHttpClient> {
    http_client: C,
    id: String,
    name: String,
    url_template: String,
    min_zoom: u8,
    max_zoom: u8,
}

impl<C: AsyncHttpClient> TemplateProvider<C> {
    /// Creates a provider from a template containing `{z}`, `{x}` and `{y}`.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if a placeholder is missing or the id is not
    /// usable as a cache key component.
    pub fn new(
        http_client: C,
        id: impl Into<String>,
        name: impl Into<String>,
        url_template: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let id = id.into();
        let url_template = url_template.into();

        for placeholder in ["{z}", "{x}", "{y}"] {
            if !url_template.contains(placeholder) {
                return Err(ProviderError::Configuration(format!(
                    "URL template '{}' is missing the {} placeholder",
                    url_template, placeholder
                )));
            }
        }
        if id.is_empty()
            || !id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ProviderError::Configuration(format!(
                "provider id '{}' must be non-empty and use only [A-Za-z0-9_-]",
                id
            )));
        }

        Ok(Self {
            http_client,
            id,
            name: name.into(),
            url_template,
            min_zoom: 0,
            max_zoom: 22,
        })
    }

    /// OpenStreetMap standard tiles (zoom 0-19).
    pub fn openstreetmap(http_client: C) -> Self {
        Self {
            http_client,
            id: "osm".to_string(),
            name: "OpenStreetMap".to_string(),
            url_template: OSM_URL_TEMPLATE.to_string(),
            min_zoom: 0,
            max_zoom: 19,
        }
    }

    /// Restricts the zoom levels this provider accepts.
    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    fn build_url(&self, x: u32, y: u32, zoom: u8) -> String {
        self.url_template
            .replace("{z}", &zoom.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }
}

impl<C: AsyncHttpClient> AsyncProvider for TemplateProvider<C> {
    async fn fetch_tile(&self, x: u32, y: u32, zoom: u8) -> Result<Vec<u8>, ProviderError> {
        if !self.supports_zoom(zoom) {
            return Err(ProviderError::UnsupportedZoom(zoom));
        }

        self.http_client.get(&self.build_url(x, y, zoom)).await
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockAsyncHttpClient;

    fn mock() -> MockAsyncHttpClient {
        MockAsyncHttpClient {
            response: Ok(vec![9]),
        }
    }

    #[test]
    fn test_osm_url() {
        let provider = TemplateProvider::openstreetmap(mock());
        assert_eq!(
            provider.build_url(44962, 104672, 18),
            "https://tile.openstreetmap.org/18/44962/104672.png"
        );
        assert_eq!(provider.id(), "osm");
        assert_eq!(provider.max_zoom(), 19);
    }

    #[test]
    fn test_custom_template_substitution() {
        let provider = TemplateProvider::new(
            mock(),
            "local",
            "Local server",
            "http://localhost:8080/tiles/{z}/{y}/{x}.jpg",
        )
        .unwrap();

        assert_eq!(
            provider.build_url(3, 5, 7),
            "http://localhost:8080/tiles/7/5/3.jpg"
        );
    }

    #[test]
    fn test_template_missing_placeholder() {
        let result = TemplateProvider::new(mock(), "bad", "Bad", "http://x/{z}/{x}.png");
        assert!(matches!(result, Err(ProviderError::Configuration(msg)) if msg.contains("{y}")));
    }

    #[test]
    fn test_template_rejects_unsafe_id() {
        let result = TemplateProvider::new(mock(), "../etc", "Bad", "http://x/{z}/{x}/{y}");
        assert!(matches!(result, Err(ProviderError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_zoom_range_enforced() {
        let provider = TemplateProvider::new(mock(), "c", "C", "http://x/{z}/{x}/{y}")
            .unwrap()
            .with_zoom_range(2, 4);

        assert_eq!(
            provider.fetch_tile(0, 0, 5).await,
            Err(ProviderError::UnsupportedZoom(5))
        );
        assert_eq!(provider.fetch_tile(0, 0, 3).await, Ok(vec![9]));
    }
}
