//! Batch orchestration
//!
//! Takes each [`Area`](crate::area::Area) through the pipeline:
//! bounding box → tile range → optional 3×3 expansion → tile-count
//! ceiling → fetch and compose → PNG on disk → report.
//!
//! Areas run strictly one after another, each with its own workspace. A
//! failing area is logged and recorded in the [`BatchReport`] and never
//! stops the batch.

mod runner;
mod types;

pub use runner::{
    output_file_name, plan_area, sanitize_area_name, MosaicOrchestrator, OutputClaims,
};
pub use types::{
    AreaOutcome, AreaPlan, AreaReport, BatchReport, MosaicError, RunConfig, DEFAULT_MAX_TILES,
    DEFAULT_ZOOM,
};
