//! Per-area pipeline and batch loop.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{error, info, info_span, warn, Instrument};

use crate::area::{compute_tile_count, enforce_limit, Area, AreaError, GridExpansion};
use crate::cache::TileFetcher;
use crate::mosaic::{output_dimensions, MosaicComposer};
use crate::provider::AsyncProvider;

use super::types::{AreaOutcome, AreaPlan, AreaReport, BatchReport, MosaicError, RunConfig};

/// Reduces an area name to `[A-Za-z0-9_-]` for use in file names.
///
/// Other characters become `_`; an empty name becomes `area`.
pub fn sanitize_area_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "area".to_string()
    } else {
        cleaned
    }
}

/// Output file name, e.g. `downtown_la_z18.png` or `downtown_la_z18_3x3.png`.
pub fn output_file_name(area_name: &str, zoom: u8, expansion: GridExpansion) -> String {
    format!(
        "{}_z{}{}.png",
        sanitize_area_name(area_name),
        zoom,
        expansion.suffix()
    )
}

/// Runs the pre-flight steps for `area` without any I/O.
///
/// Resolves the area to tiles, applies the grid expansion, and enforces
/// the tile-count ceiling.
///
/// # Errors
///
/// Returns `AreaError` for invalid coordinates, an expansion leaving the
/// tile pyramid, or `AreaTooLarge`.
pub fn plan_area(area: &Area, config: &RunConfig) -> Result<AreaPlan, AreaError> {
    let center = area.tile_range(config.zoom)?;
    let range = config.expansion.apply(center)?;
    let tile_count = compute_tile_count(&range);
    enforce_limit(tile_count, config.max_tiles)?;

    let (width, height) = output_dimensions(&range, config.mosaic.tile_size)
        .map_err(|e| AreaError::InvalidArea(e.to_string()))?;

    Ok(AreaPlan {
        area_name: area.name().to_string(),
        center,
        range,
        tile_count,
        width,
        height,
        geo_bounds: range.geo_bounds(),
        output_path: output_path(&config.output_dir, area.name(), config),
    })
}

fn output_path(dir: &Path, area_name: &str, config: &RunConfig) -> PathBuf {
    dir.join(output_file_name(area_name, config.zoom, config.expansion))
}

/// Output files already taken by earlier areas of a batch.
///
/// Distinct area names can clean up to the same file name (`LA/1` and
/// `LA_1`); the later area is refused instead of overwriting the earlier.
#[derive(Debug, Default)]
pub struct OutputClaims {
    claimed: HashMap<PathBuf, String>,
}

impl OutputClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes `path` for `area_name`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateOutput` naming the area that took `path` first.
    pub fn claim(&mut self, path: &Path, area_name: &str) -> Result<(), MosaicError> {
        if let Some(earlier) = self.claimed.get(path) {
            return Err(MosaicError::DuplicateOutput {
                area: area_name.to_string(),
                earlier: earlier.clone(),
                path: path.to_path_buf(),
            });
        }
        self.claimed.insert(path.to_path_buf(), area_name.to_string());
        Ok(())
    }
}

/// Drives areas through planning, fetching and composition.
pub struct MosaicOrchestrator<P: AsyncProvider> {
    fetcher: TileFetcher<P>,
    config: RunConfig,
}

impl<P: AsyncProvider> MosaicOrchestrator<P> {
    pub fn new(fetcher: TileFetcher<P>, config: RunConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &TileFetcher<P> {
        &self.fetcher
    }

    /// Pre-flight only; see [`plan_area`].
    pub fn plan_area(&self, area: &Area) -> Result<AreaPlan, MosaicError> {
        let plan = plan_area(area, &self.config)?;
        self.check_zoom()?;
        Ok(plan)
    }

    fn check_zoom(&self) -> Result<(), MosaicError> {
        let provider = self.fetcher.provider();
        if !provider.supports_zoom(self.config.zoom) {
            return Err(MosaicError::UnsupportedZoom {
                provider: provider.name().to_string(),
                zoom: self.config.zoom,
                min: provider.min_zoom(),
                max: provider.max_zoom(),
            });
        }
        Ok(())
    }

    /// Produces the mosaic for one area.
    ///
    /// Fetch counters are reset at the start, so the report's statistics
    /// cover this area only.
    pub async fn process_area(&self, area: &Area) -> Result<AreaReport, MosaicError> {
        let started = Instant::now();
        let plan = self.plan_area(area)?;
        info!(
            tiles = plan.tile_count,
            range = %plan.range,
            width = plan.width,
            height = plan.height,
            "Area planned"
        );

        self.fetcher.reset_stats();
        let composer = MosaicComposer::new(&self.fetcher, self.config.mosaic);
        let compose = composer.compose(&plan.range, &plan.output_path).await?;
        let fetch = self.fetcher.stats();

        info!(
            output = %plan.output_path.display(),
            width = compose.width,
            height = compose.height,
            cache_hits = fetch.hits,
            cache_misses = fetch.misses,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Area complete"
        );
        if fetch.persist_failures > 0 {
            warn!(
                failures = fetch.persist_failures,
                "Some downloaded tiles could not be cached"
            );
        }

        Ok(AreaReport {
            plan,
            compose,
            fetch,
            elapsed: started.elapsed(),
        })
    }

    /// Processes `areas` one after another.
    ///
    /// A failing area is logged and recorded; the batch always continues
    /// with the next one. An area whose output file was already claimed by
    /// an earlier area fails without fetching.
    pub async fn run_batch(&self, areas: &[Area]) -> BatchReport {
        let mut report = BatchReport::default();
        let mut claims = OutputClaims::new();

        for (index, area) in areas.iter().enumerate() {
            let span = info_span!("area", area = %area.name(), index, total = areas.len());
            let path = output_path(&self.config.output_dir, area.name(), &self.config);
            let result = match claims.claim(&path, area.name()) {
                Ok(()) => self.process_area(area).instrument(span).await,
                Err(e) => Err(e),
            };

            if let Err(e) = &result {
                error!(area = %area.name(), error = %e, "Area failed");
            }
            report.outcomes.push(AreaOutcome {
                area_name: area.name().to_string(),
                result,
            });
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Batch complete"
        );
        report
    }
}
