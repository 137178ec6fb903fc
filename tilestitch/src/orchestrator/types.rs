//! Orchestrator types and errors

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::area::{AreaError, GridExpansion};
use crate::cache::FetchStatsSnapshot;
use crate::coord::{BoundingBox, TileRange};
use crate::mosaic::{ComposeError, ComposeReport, MosaicConfig};

/// Default zoom level.
pub const DEFAULT_ZOOM: u8 = 18;

/// Default tile-count ceiling per area.
pub const DEFAULT_MAX_TILES: u64 = 10_000;

/// Errors that end the processing of one area.
#[derive(Debug, Error)]
pub enum MosaicError {
    /// Pre-flight validation failed; nothing was fetched
    #[error(transparent)]
    Area(#[from] AreaError),

    /// The provider cannot serve the requested zoom
    #[error("{provider} does not serve zoom level {zoom} (supported: {min}-{max})")]
    UnsupportedZoom {
        provider: String,
        zoom: u8,
        min: u8,
        max: u8,
    },

    /// Another area of the batch already writes to the same file
    #[error("'{area}' would overwrite {} from area '{earlier}'", path.display())]
    DuplicateOutput {
        area: String,
        earlier: String,
        path: PathBuf,
    },

    /// Fetching or composing failed
    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings shared by every area in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub zoom: u8,
    pub expansion: GridExpansion,
    /// Tile-count ceiling checked before any fetch
    pub max_tiles: u64,
    pub output_dir: PathBuf,
    pub mosaic: MosaicConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            expansion: GridExpansion::None,
            max_tiles: DEFAULT_MAX_TILES,
            output_dir: PathBuf::from("output"),
            mosaic: MosaicConfig::default(),
        }
    }
}

/// Result of the pre-flight checks for one area.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaPlan {
    pub area_name: String,
    /// Tiles covering the area itself
    pub center: TileRange,
    /// Tiles that will be fetched, after expansion
    pub range: TileRange,
    pub tile_count: u64,
    /// Output image width in pixels
    pub width: u32,
    /// Output image height in pixels
    pub height: u32,
    /// Geographic extent of `range`
    pub geo_bounds: BoundingBox,
    pub output_path: PathBuf,
}

impl fmt::Display for AreaPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} = {} tiles -> {}×{} px -> {}",
            self.area_name,
            self.range,
            self.tile_count,
            self.width,
            self.height,
            self.output_path.display()
        )
    }
}

/// Summary of a successfully processed area.
#[derive(Debug, Clone)]
pub struct AreaReport {
    pub plan: AreaPlan,
    pub compose: ComposeReport,
    pub fetch: FetchStatsSnapshot,
    pub elapsed: Duration,
}

/// What happened to one area of a batch.
#[derive(Debug)]
pub struct AreaOutcome {
    pub area_name: String,
    pub result: Result<AreaReport, MosaicError>,
}

impl AreaOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<AreaOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    /// Fetch counters summed over successful areas.
    pub fn total_fetch_stats(&self) -> FetchStatsSnapshot {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .fold(FetchStatsSnapshot::default(), |acc, r| FetchStatsSnapshot {
                hits: acc.hits + r.fetch.hits,
                misses: acc.misses + r.fetch.misses,
                persist_failures: acc.persist_failures + r.fetch.persist_failures,
                bytes_fetched: acc.bytes_fetched + r.fetch.bytes_fetched,
            })
    }
}
