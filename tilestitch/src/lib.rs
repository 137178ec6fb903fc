//! tilestitch - stitch slippy-map tiles into one large raster
//!
//! Given one or more named geographic areas, tilestitch resolves each to the
//! Web Mercator tiles covering it, fetches them through a persistent cache,
//! and composes a single PNG per area without holding the full image in
//! memory.
//!
//! The pipeline for one area:
//!
//! 1. [`area`] turns the area into a [`coord::TileRange`], optionally widened
//!    to a 3×3 grid, and checks it against the tile-count ceiling.
//! 2. [`cache::TileFetcher`] pulls each tile from the [`cache::Cache`] or,
//!    on a miss, from an [`provider::AsyncProvider`].
//! 3. [`mosaic::MosaicComposer`] builds blocks, merges them through on-disk
//!    artifacts and streams the final PNG.
//!
//! [`orchestrator::MosaicOrchestrator`] drives a batch of areas and reports
//! per-area outcomes.

pub mod area;
pub mod cache;
pub mod config;
pub mod coord;
pub mod logging;
pub mod mosaic;
pub mod orchestrator;
pub mod provider;
