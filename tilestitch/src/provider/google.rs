//! Google Maps satellite imagery provider.
//!
//! Uses Google Maps Platform with an API key. Users need their own Google
//! Cloud project with the Map Tiles API enabled.
//!
//! # API Endpoints
//!
//! - Map Tiles API: `https://tile.googleapis.com/v1/2dtiles/{z}/{x}/{y}?key={API_KEY}`
//! - Legacy endpoint: `https://mt{server}.googleapis.com/vt?lyrs=s&x={x}&y={y}&z={z}&key={API_KEY}`
//!
//! Both take standard XYZ tile coordinates, so tile indices map straight
//! through without conversion.

use crate::provider::{AsyncHttpClient, AsyncProvider, ProviderError};

/// Google Maps satellite imagery provider.
///
/// Google Maps Platform is a paid service. Check current pricing at:
/// https://cloud.google.com/maps-platform/pricing
pub struct GoogleMapsProvider<C: AsyncHttpClient> {
    http_client: C,
    api_key: String,
    use_legacy_endpoint: bool,
}

impl<C: AsyncHttpClient> GoogleMapsProvider<C> {
    /// Creates a provider on the Map Tiles API endpoint.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the API key is blank.
    pub fn new(http_client: C, api_key: String) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "Google Maps requires a non-empty API key".to_string(),
            ));
        }
        Ok(Self {
            http_client,
            api_key,
            use_legacy_endpoint: false,
        })
    }

    /// Creates a provider using the legacy `mt{n}` tile servers.
    pub fn with_legacy_endpoint(http_client: C, api_key: String) -> Result<Self, ProviderError> {
        let mut provider = Self::new(http_client, api_key)?;
        provider.use_legacy_endpoint = true;
        Ok(provider)
    }

    fn build_url(&self, x: u32, y: u32, zoom: u8) -> String {
        if self.use_legacy_endpoint {
            // Spread load across mt0-mt3
            let server = (x + y) % 4;
            format!(
                "https://mt{}.googleapis.com/vt?lyrs=s&x={}&y={}&z={}&key={}",
                server, x, y, zoom, self.api_key
            )
        } else {
            format!(
                "https://tile.googleapis.com/v1/2dtiles/{}/{}/{}?key={}",
                zoom, x, y, self.api_key
            )
        }
    }
}

impl<C: AsyncHttpClient> AsyncProvider for GoogleMapsProvider<C> {
    async fn fetch_tile(&self, x: u32, y: u32, zoom: u8) -> Result<Vec<u8>, ProviderError> {
        if !self.supports_zoom(zoom) {
            return Err(ProviderError::UnsupportedZoom(zoom));
        }

        let url = self.build_url(x, y, zoom);
        self.http_client.get(&url).await
    }

    fn name(&self) -> &str {
        "Google Maps"
    }

    fn id(&self) -> &str {
        "google"
    }

    fn min_zoom(&self) -> u8 {
        0
    }

    fn max_zoom(&self) -> u8 {
        22
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockAsyncHttpClient;

    fn mock() -> MockAsyncHttpClient {
        MockAsyncHttpClient {
            response: Ok(vec![1, 2, 3, 4]),
        }
    }

    #[test]
    fn test_blank_api_key_rejected() {
        let result = GoogleMapsProvider::new(mock(), "  ".to_string());
        assert!(matches!(result, Err(ProviderError::Configuration(_))));
    }

    #[test]
    fn test_modern_url_construction() {
        let provider = GoogleMapsProvider::new(mock(), "test_api_key".to_string()).unwrap();

        assert_eq!(
            provider.build_url(200, 100, 10),
            "https://tile.googleapis.com/v1/2dtiles/10/200/100?key=test_api_key"
        );
    }

    #[test]
    fn test_legacy_url_server_distribution() {
        let provider =
            GoogleMapsProvider::with_legacy_endpoint(mock(), "test_api_key".to_string()).unwrap();

        assert_eq!(
            provider.build_url(200, 100, 10),
            "https://mt0.googleapis.com/vt?lyrs=s&x=200&y=100&z=10&key=test_api_key"
        );
        assert!(provider.build_url(1, 0, 10).contains("mt1."));
        assert!(provider.build_url(1, 1, 10).contains("mt2."));
        assert!(provider.build_url(4, 0, 10).contains("mt0."));
    }

    #[tokio::test]
    async fn test_fetch_tile_unsupported_zoom() {
        let provider = GoogleMapsProvider::new(mock(), "key".to_string()).unwrap();
        assert_eq!(
            provider.fetch_tile(100, 200, 23).await,
            Err(ProviderError::UnsupportedZoom(23))
        );
    }

    #[tokio::test]
    async fn test_fetch_tile_success() {
        let provider = GoogleMapsProvider::new(mock(), "key".to_string()).unwrap();
        assert_eq!(provider.fetch_tile(100, 200, 10).await, Ok(vec![1, 2, 3, 4]));
    }
}
