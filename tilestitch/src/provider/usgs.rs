//! USGS (United States Geological Survey) imagery provider.
//!
//! Provides free access to USGS orthoimagery via the National Map tile services.
//! Coverage is limited to the United States; tiles outside it come back as
//! errors or blank placeholders.
//!
//! # URL Pattern
//!
//! `https://basemap.nationalmap.gov/arcgis/rest/services/USGSImageryOnly/MapServer/tile/{z}/{y}/{x}`

use crate::provider::{AsyncHttpClient, AsyncProvider, ProviderError};

/// Base URL for USGS imagery tiles.
const USGS_BASE_URL: &str =
    "https://basemap.nationalmap.gov/arcgis/rest/services/USGSImageryOnly/MapServer/tile";

const MIN_ZOOM: u8 = 0;

/// USGS provides imagery up to zoom level 16.
const MAX_ZOOM: u8 = 16;

/// USGS orthoimagery provider. No API key required.
pub struct UsgsProvider<C: AsyncHttpClient> {
    http_client: C,
}

impl<C: AsyncHttpClient> UsgsProvider<C> {
    pub fn new(http_client: C) -> Self {
        Self { http_client }
    }

    fn build_url(&self, x: u32, y: u32, zoom: u8) -> String {
        format!("{}/{}/{}/{}", USGS_BASE_URL, zoom, y, x)
    }
}

impl<C: AsyncHttpClient> AsyncProvider for UsgsProvider<C> {
    async fn fetch_tile(&self, x: u32, y: u32, zoom: u8) -> Result<Vec<u8>, ProviderError> {
        if !self.supports_zoom(zoom) {
            return Err(ProviderError::UnsupportedZoom(zoom));
        }

        self.http_client.get(&self.build_url(x, y, zoom)).await
    }

    fn name(&self) -> &str {
        "USGS"
    }

    fn id(&self) -> &str {
        "usgs"
    }

    fn min_zoom(&self) -> u8 {
        MIN_ZOOM
    }

    fn max_zoom(&self) -> u8 {
        MAX_ZOOM
    }
}
