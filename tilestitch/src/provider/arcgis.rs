//! ArcGIS World Imagery provider.
//!
//! Provides access to Esri's World Imagery basemap, which offers high-resolution
//! satellite and aerial imagery with global coverage.
//!
//! # URL Pattern
//!
//! `https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}`
//!
//! - Path order is zoom, row, column
//! - No authentication required for the public tier
//!
//! # Terms of Use
//!
//! The World Imagery basemap is provided by Esri and is subject to their
//! terms of use. See: <https://www.esri.com/en-us/legal/terms/full-master-agreement>

use crate::provider::{AsyncHttpClient, AsyncProvider, ProviderError};

/// Base URL for ArcGIS World Imagery tiles.
const ARCGIS_BASE_URL: &str =
    "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile";

/// Minimum zoom level supported by ArcGIS World Imagery.
const MIN_ZOOM: u8 = 0;

/// Maximum zoom level supported by ArcGIS World Imagery.
/// ArcGIS provides imagery up to zoom level 19 in most areas.
const MAX_ZOOM: u8 = 19;

/// ArcGIS World Imagery satellite provider.
///
/// No API key or authentication required for the public tier. Higher zoom
/// levels (17-19) may not be available in all regions.
pub struct ArcGisProvider<C: AsyncHttpClient> {
    http_client: C,
}

impl<C: AsyncHttpClient> ArcGisProvider<C> {
    /// Creates a new ArcGIS World Imagery provider.
    pub fn new(http_client: C) -> Self {
        Self { http_client }
    }

    /// ArcGIS uses the pattern: `{base}/{z}/{y}/{x}`
    fn build_url(&self, x: u32, y: u32, zoom: u8) -> String {
        format!("{}/{}/{}/{}", ARCGIS_BASE_URL, zoom, y, x)
    }
}

impl<C: AsyncHttpClient> AsyncProvider for ArcGisProvider<C> {
    async fn fetch_tile(&self, x: u32, y: u32, zoom: u8) -> Result<Vec<u8>, ProviderError> {
        if !self.supports_zoom(zoom) {
            return Err(ProviderError::UnsupportedZoom(zoom));
        }

        let url = self.build_url(x, y, zoom);
        self.http_client.get(&url).await
    }

    fn name(&self) -> &str {
        "ArcGIS"
    }

    fn id(&self) -> &str {
        "arcgis"
    }

    fn min_zoom(&self) -> u8 {
        MIN_ZOOM
    }

    fn max_zoom(&self) -> u8 {
        MAX_ZOOM
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockAsyncHttpClient;

    fn sample_jpeg_response() -> Vec<u8> {
        // Minimal valid JPEG header
        vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46]
    }

    fn provider(response: Result<Vec<u8>, ProviderError>) -> ArcGisProvider<MockAsyncHttpClient> {
        ArcGisProvider::new(MockAsyncHttpClient { response })
    }

    #[test]
    fn test_zoom_range() {
        let provider = provider(Ok(sample_jpeg_response()));
        assert_eq!(provider.name(), "ArcGIS");
        assert_eq!(provider.id(), "arcgis");
        assert!(provider.supports_zoom(0));
        assert!(provider.supports_zoom(19));
        assert!(!provider.supports_zoom(20));
    }

    #[test]
    fn test_url_puts_row_before_column() {
        let provider = provider(Ok(sample_jpeg_response()));

        let url = provider.build_url(200, 100, 15);
        assert_eq!(
            url,
            "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/15/100/200"
        );
    }

    #[tokio::test]
    async fn test_fetch_tile_unsupported_zoom() {
        let provider = provider(Ok(sample_jpeg_response()));

        let result = provider.fetch_tile(100, 200, 20).await;
        assert_eq!(result, Err(ProviderError::UnsupportedZoom(20)));
    }

    #[tokio::test]
    async fn test_fetch_tile_success() {
        let provider = provider(Ok(sample_jpeg_response()));

        let result = provider.fetch_tile(100, 200, 15).await;
        assert_eq!(result.unwrap(), sample_jpeg_response());
    }

    #[tokio::test]
    async fn test_fetch_tile_network_error() {
        let provider = provider(Err(ProviderError::HttpError(
            "Connection refused".to_string(),
        )));

        match provider.fetch_tile(100, 200, 15).await {
            Err(ProviderError::HttpError(msg)) => assert!(msg.contains("Connection refused")),
            other => panic!("Expected HttpError, got {:?}", other),
        }
    }
}
