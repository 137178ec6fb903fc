//! Mosaic configuration, errors and reporting types.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::cache::TileFetchError;

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Default block edge length in tiles.
pub const DEFAULT_BLOCK_SIZE: u32 = 10;

/// Default number of blocks composited at once.
pub const DEFAULT_MAX_PARALLEL_BLOCKS: usize = 4;

/// Default pixel count at or below which the mosaic is built in memory
/// (4096 × 4096).
pub const DEFAULT_IN_MEMORY_THRESHOLD_PIXELS: u64 = 16_777_216;

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: u64 = 4;

/// Settings for one compose run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MosaicConfig {
    /// Edge length every tile is normalised to
    pub tile_size: u32,
    /// Blocks hold at most `block_size × block_size` tiles
    pub block_size: u32,
    /// Blocks fetched and composited concurrently
    pub max_parallel_blocks: usize,
    /// Largest mosaic (in pixels) built in a single canvas
    pub in_memory_threshold_pixels: u64,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            block_size: DEFAULT_BLOCK_SIZE,
            max_parallel_blocks: DEFAULT_MAX_PARALLEL_BLOCKS,
            in_memory_threshold_pixels: DEFAULT_IN_MEMORY_THRESHOLD_PIXELS,
        }
    }
}

impl MosaicConfig {
    /// Forces the out-of-core path regardless of mosaic size.
    pub fn streaming_only(mut self) -> Self {
        self.in_memory_threshold_pixels = 0;
        self
    }
}

/// Errors raised while composing a mosaic.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// A member tile could not be fetched
    #[error(transparent)]
    Fetch(#[from] TileFetchError),

    /// Tile bytes are not a decodable image
    #[error("Failed to decode tile {zoom}/{x}/{y}: {message}")]
    Decode {
        x: u32,
        y: u32,
        zoom: u8,
        message: String,
    },

    /// Two artifacts cannot be joined along the requested axis
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Workspace or output I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An artifact file is malformed or truncated
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// A blocking task panicked or was cancelled
    #[error("Compose task failed: {0}")]
    Join(String),

    /// Work abandoned because another block of the same mosaic failed
    #[error("Compose cancelled after another block failed")]
    Cancelled,
}

impl From<tokio::task::JoinError> for ComposeError {
    fn from(e: tokio::task::JoinError) -> Self {
        ComposeError::Join(e.to_string())
    }
}

impl From<image::ImageError> for ComposeError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::IoError(io) => ComposeError::Io(io),
            other => ComposeError::Artifact(other.to_string()),
        }
    }
}

/// Outcome of a successful compose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeReport {
    /// Final image width in pixels
    pub width: u32,
    /// Final image height in pixels
    pub height: u32,
    /// Tiles placed
    pub tiles: u64,
    /// Blocks composited
    pub blocks: usize,
    /// Pairwise merges performed
    pub merges: usize,
    /// Largest single pixel buffer allocated, in bytes
    pub peak_buffer_bytes: u64,
    /// Whether the single-canvas path was taken
    pub in_memory: bool,
}

impl ComposeReport {
    /// Size of the full mosaic as one RGBA8 buffer.
    pub fn full_size_bytes(&self) -> u64 {
        self.width as u64 * self.height as u64 * BYTES_PER_PIXEL
    }
}

impl fmt::Display for ComposeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}×{} px from {} tiles in {} blocks, {} merges, peak buffer {} bytes{}",
            self.width,
            self.height,
            self.tiles,
            self.blocks,
            self.merges,
            self.peak_buffer_bytes,
            if self.in_memory { " (in memory)" } else { "" }
        )
    }
}

/// Tracks the largest pixel buffer allocated across threads.
#[derive(Debug, Default)]
pub struct PeakTracker {
    peak: AtomicU64,
}

impl PeakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, bytes: u64) {
        self.peak.fetch_max(bytes, Ordering::Relaxed);
    }

    pub fn peak(&self) -> u64 {
        self.peak.load(Ordering::Relaxed)
    }
}
