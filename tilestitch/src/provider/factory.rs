//! Provider factory for centralized provider creation.
//!
//! [`ProviderConfig`] describes which imagery source to use; [`ProviderFactory`]
//! turns it into a [`TileProviderKind`], a closed enum that dispatches to the
//! concrete provider without boxing.

use super::arcgis::ArcGisProvider;
use super::google::GoogleMapsProvider;
use super::http::{AsyncHttpClient, AsyncReqwestClient};
use super::template::TemplateProvider;
use super::types::{AsyncProvider, ProviderError};
use super::usgs::UsgsProvider;

/// Configuration for creating a provider.
///
/// # Example
///
/// ```
/// use tilestitch::provider::ProviderConfig;
///
/// let osm = ProviderConfig::osm();
/// let google = ProviderConfig::google("YOUR_API_KEY");
/// assert!(google.requires_api_key());
/// assert!(!osm.requires_api_key());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    /// ArcGIS World Imagery.
    ///
    /// No API key required.
    ArcGis,

    /// OpenStreetMap standard tiles.
    Osm,

    /// Google Maps satellite imagery (Map Tiles API).
    Google {
        /// Google Maps Platform API key
        api_key: String,
    },

    /// USGS orthoimagery, United States only.
    Usgs,

    /// Any XYZ endpoint described by a URL template.
    Custom {
        /// Identifier used in cache keys
        id: String,
        /// URL containing `{z}`, `{x}` and `{y}` placeholders
        url_template: String,
    },
}

impl ProviderConfig {
    pub fn arcgis() -> Self {
        Self::ArcGis
    }

    pub fn osm() -> Self {
        Self::Osm
    }

    pub fn google(api_key: impl Into<String>) -> Self {
        Self::Google {
            api_key: api_key.into(),
        }
    }

    pub fn usgs() -> Self {
        Self::Usgs
    }

    pub fn custom(id: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self::Custom {
            id: id.into(),
            url_template: url_template.into(),
        }
    }

    /// Parses a provider type name as used in config files and on the CLI.
    ///
    /// `google` and `custom` need extra settings and are filled in by the
    /// caller; here they get empty placeholders.
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "arcgis" => Some(Self::ArcGis),
            "osm" | "openstreetmap" => Some(Self::Osm),
            "google" => Some(Self::google("")),
            "usgs" => Some(Self::Usgs),
            "custom" => Some(Self::custom("custom", "")),
            _ => None,
        }
    }

    /// Returns the provider name for this configuration.
    pub fn name(&self) -> &str {
        match self {
            Self::ArcGis => "ArcGIS",
            Self::Osm => "OpenStreetMap",
            Self::Google { .. } => "Google Maps",
            Self::Usgs => "USGS",
            Self::Custom { .. } => "Custom",
        }
    }

    /// Returns whether this provider requires an API key.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::Google { .. })
    }
}

/// Concrete provider selected at runtime.
pub enum TileProviderKind<C: AsyncHttpClient = AsyncReqwestClient> {
    ArcGis(ArcGisProvider<C>),
    Google(GoogleMapsProvider<C>),
    Usgs(UsgsProvider<C>),
    Template(TemplateProvider<C>),
}

impl<C: AsyncHttpClient> AsyncProvider for TileProviderKind<C> {
    async fn fetch_tile(&self, x: u32, y: u32, zoom: u8) -> Result<Vec<u8>, ProviderError> {
        match self {
            Self::ArcGis(p) => p.fetch_tile(x, y, zoom).await,
            Self::Google(p) => p.fetch_tile(x, y, zoom).await,
            Self::Usgs(p) => p.fetch_tile(x, y, zoom).await,
            Self::Template(p) => p.fetch_tile(x, y, zoom).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::ArcGis(p) => p.name(),
            Self::Google(p) => p.name(),
            Self::Usgs(p) => p.name(),
            Self::Template(p) => p.name(),
        }
    }

    fn id(&self) -> &str {
        match self {
            Self::ArcGis(p) => p.id(),
            Self::Google(p) => p.id(),
            Self::Usgs(p) => p.id(),
            Self::Template(p) => p.id(),
        }
    }

    fn min_zoom(&self) -> u8 {
        match self {
            Self::ArcGis(p) => p.min_zoom(),
            Self::Google(p) => p.min_zoom(),
            Self::Usgs(p) => p.min_zoom(),
            Self::Template(p) => p.min_zoom(),
        }
    }

    fn max_zoom(&self) -> u8 {
        match self {
            Self::ArcGis(p) => p.max_zoom(),
            Self::Google(p) => p.max_zoom(),
            Self::Usgs(p) => p.max_zoom(),
            Self::Template(p) => p.max_zoom(),
        }
    }
}

/// Factory for creating provider instances.
///
/// ```ignore
/// use tilestitch::provider::{AsyncReqwestClient, ProviderConfig, ProviderFactory};
///
/// let factory = ProviderFactory::new(AsyncReqwestClient::new()?);
/// let provider = factory.create(&ProviderConfig::osm())?;
/// ```
pub struct ProviderFactory<C: AsyncHttpClient = AsyncReqwestClient> {
    http_client: C,
}

impl<C: AsyncHttpClient> ProviderFactory<C> {
    pub fn new(http_client: C) -> Self {
        Self { http_client }
    }

    /// Create a provider from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for a missing API key or a malformed URL
    /// template.
    pub fn create(self, config: &ProviderConfig) -> Result<TileProviderKind<C>, ProviderError> {
        let provider = match config {
            ProviderConfig::ArcGis => TileProviderKind::ArcGis(ArcGisProvider::new(self.http_client)),
            ProviderConfig::Osm => {
                TileProviderKind::Template(TemplateProvider::openstreetmap(self.http_client))
            }
            ProviderConfig::Google { api_key } => TileProviderKind::Google(
                GoogleMapsProvider::new(self.http_client, api_key.clone())?,
            ),
            ProviderConfig::Usgs => TileProviderKind::Usgs(UsgsProvider::new(self.http_client)),
            ProviderConfig::Custom { id, url_template } => {
                TileProviderKind::Template(TemplateProvider::new(
                    self.http_client,
                    id.clone(),
                    format!("Custom ({})", id),
                    url_template.clone(),
                )?)
            }
        };

        tracing::debug!(
            provider = provider.name(),
            id = provider.id(),
            max_zoom = provider.max_zoom(),
            "Created tile provider"
        );
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockAsyncHttpClient;

    fn factory() -> ProviderFactory<MockAsyncHttpClient> {
        ProviderFactory::new(MockAsyncHttpClient {
            response: Ok(vec![7, 7]),
        })
    }

    #[test]
    fn test_config_names() {
        assert_eq!(ProviderConfig::arcgis().name(), "ArcGIS");
        assert_eq!(ProviderConfig::osm().name(), "OpenStreetMap");
        assert_eq!(ProviderConfig::google("k").name(), "Google Maps");
        assert_eq!(ProviderConfig::usgs().name(), "USGS");
        assert_eq!(ProviderConfig::custom("a", "b").name(), "Custom");
    }

    #[test]
    fn test_from_type_name() {
        assert_eq!(ProviderConfig::from_type_name("ArcGIS"), Some(ProviderConfig::ArcGis));
        assert_eq!(ProviderConfig::from_type_name("openstreetmap"), Some(ProviderConfig::Osm));
        assert_eq!(ProviderConfig::from_type_name(" usgs "), Some(ProviderConfig::Usgs));
        assert_eq!(ProviderConfig::from_type_name("bing"), None);
    }

    #[test]
    fn test_create_each_builtin() {
        assert_eq!(factory().create(&ProviderConfig::ArcGis).unwrap().id(), "arcgis");
        assert_eq!(factory().create(&ProviderConfig::Osm).unwrap().id(), "osm");
        assert_eq!(factory().create(&ProviderConfig::Usgs).unwrap().id(), "usgs");
        assert_eq!(
            factory().create(&ProviderConfig::google("key")).unwrap().id(),
            "google"
        );
    }

    #[test]
    fn test_create_google_without_key_fails() {
        let result = factory().create(&ProviderConfig::google(""));
        assert!(matches!(result, Err(ProviderError::Configuration(_))));
    }

    #[test]
    fn test_create_custom() {
        let provider = factory()
            .create(&ProviderConfig::custom("mirror", "https://m/{z}/{x}/{y}.png"))
            .unwrap();
        assert_eq!(provider.id(), "mirror");
        assert_eq!(provider.name(), "Custom (mirror)");

        let bad = factory().create(&ProviderConfig::custom("mirror", "https://m/"));
        assert!(bad.is_err());
    }

    #[tokio::test]
    async fn test_dispatch_fetch() {
        let provider = factory().create(&ProviderConfig::Osm).unwrap();
        assert_eq!(provider.fetch_tile(1, 1, 3).await, Ok(vec![7, 7]));
        assert_eq!(
            provider.fetch_tile(1, 1, 20).await,
            Err(ProviderError::UnsupportedZoom(20))
        );
    }
}
