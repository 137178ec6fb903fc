//! Provider types and traits

use std::fmt;
use std::future::Future;

/// Errors that can occur during provider operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// HTTP request failed
    HttpError(String),
    /// Zoom level not supported by this provider
    UnsupportedZoom(u8),
    /// Invalid response data from provider
    InvalidResponse(String),
    /// Provider could not be configured (missing API key, bad template, ...)
    Configuration(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            ProviderError::UnsupportedZoom(zoom) => {
                write!(f, "Zoom level {} not supported by provider", zoom)
            }
            ProviderError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            ProviderError::Configuration(msg) => write!(f, "Provider configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Async capability for fetching slippy-map tiles.
///
/// Implementors return the raw encoded bytes (PNG, JPEG, ...) of one tile.
/// Retries and backoff are the caller's business; a failed request is
/// reported once and not repeated here.
pub trait AsyncProvider: Send + Sync {
    /// Fetches the tile at `(x, y)` for `zoom`.
    ///
    /// # Arguments
    ///
    /// * `x` - Tile column (west to east)
    /// * `y` - Tile row (north to south)
    /// * `zoom` - Zoom level
    fn fetch_tile(
        &self,
        x: u32,
        y: u32,
        zoom: u8,
    ) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;

    /// Returns the provider's display name for logging.
    fn name(&self) -> &str;

    /// Returns a short, filesystem-safe identifier used in cache keys.
    fn id(&self) -> &str;

    /// Returns the minimum supported zoom level.
    fn min_zoom(&self) -> u8;

    /// Returns the maximum supported zoom level.
    fn max_zoom(&self) -> u8;

    /// Checks if this provider supports the given zoom level.
    fn supports_zoom(&self, zoom: u8) -> bool {
        zoom >= self.min_zoom() && zoom <= self.max_zoom()
    }
}
