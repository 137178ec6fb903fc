//! Out-of-core mosaic composition.
//!
//! [`MosaicComposer`] turns a [`TileRange`] into one PNG whose pixel size
//! is `(width × tile_size) × (height × tile_size)`. Large mosaics never
//! exist in memory as a whole:
//!
//! 1. **Blocks**: the range is split into blocks of at most
//!    `block_size × block_size` tiles; each is fetched, composited and
//!    written to the workspace as a raw artifact.
//! 2. **Rows**: each block row is reduced left to right by pairwise
//!    horizontal merges. Rows reduce in parallel.
//! 3. **Column**: row artifacts are reduced top to bottom the same way.
//! 4. **Encode**: the final artifact is streamed into a PNG.
//!
//! Mosaics at or below `in_memory_threshold_pixels` skip the artifacts and
//! are built in one canvas.
//!
//! The output is written under a temporary name and renamed into place,
//! and the workspace is removed whatever the outcome.

mod artifact;
mod block;
mod merge;
mod png;
mod types;
mod workspace;

pub use artifact::{Artifact, ArtifactReader, ArtifactWriter};
pub use block::{partition, BlockSpec};
pub use merge::{merge_pair, reduce, Axis};
pub use png::{encode_artifact, PngStreamWriter};
pub use types::{
    ComposeError, ComposeReport, MosaicConfig, PeakTracker, BYTES_PER_PIXEL, DEFAULT_BLOCK_SIZE,
    DEFAULT_IN_MEMORY_THRESHOLD_PIXELS, DEFAULT_MAX_PARALLEL_BLOCKS, DEFAULT_TILE_SIZE,
};
pub use workspace::Workspace;

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use rayon::prelude::*;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::cache::TileFetcher;
use crate::coord::TileRange;
use crate::provider::AsyncProvider;

/// Largest width or height a PNG may declare.
pub const MAX_PNG_DIMENSION: u32 = i32::MAX as u32;

/// Pixel dimensions of the mosaic for `range`.
///
/// # Errors
///
/// Returns `DimensionMismatch` for a zero tile size or when a side exceeds
/// the PNG limit of 2^31 - 1 pixels.
pub fn output_dimensions(range: &TileRange, tile_size: u32) -> Result<(u32, u32), ComposeError> {
    if tile_size == 0 {
        return Err(ComposeError::DimensionMismatch(
            "tile size must be positive".to_string(),
        ));
    }
    let width = range.width().checked_mul(tile_size);
    let height = range.height().checked_mul(tile_size);
    match (width, height) {
        (Some(w), Some(h)) if w <= MAX_PNG_DIMENSION && h <= MAX_PNG_DIMENSION => Ok((w, h)),
        _ => Err(ComposeError::DimensionMismatch(format!(
            "{} at {} px per tile exceeds the maximum image size",
            range, tile_size
        ))),
    }
}

/// Composes tile ranges into PNG mosaics.
pub struct MosaicComposer<'a, P: AsyncProvider> {
    fetcher: &'a TileFetcher<P>,
    config: MosaicConfig,
}

impl<'a, P: AsyncProvider> MosaicComposer<'a, P> {
    pub fn new(fetcher: &'a TileFetcher<P>, config: MosaicConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &MosaicConfig {
        &self.config
    }

    /// Composes `range` and writes the PNG to `output`.
    ///
    /// On failure nothing is left at `output` (an existing file there is
    /// untouched), and every block task and intermediate file of this call
    /// is gone by the time the error is returned.
    pub async fn compose(
        &self,
        range: &TileRange,
        output: &Path,
    ) -> Result<ComposeReport, ComposeError> {
        let (width, height) = output_dimensions(range, self.config.tile_size)?;
        let pixels = width as u64 * height as u64;
        let output_dir = match output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => std::env::current_dir()?,
        };
        std::fs::create_dir_all(&output_dir)?;

        let report = if pixels <= self.config.in_memory_threshold_pixels {
            self.compose_in_memory(range, width, height, &output_dir, output)
                .await?
        } else {
            self.compose_streaming(range, width, height, &output_dir, output)
                .await?
        };

        info!(
            output = %output.display(),
            width = report.width,
            height = report.height,
            tiles = report.tiles,
            peak_buffer_bytes = report.peak_buffer_bytes,
            in_memory = report.in_memory,
            "Mosaic written"
        );
        Ok(report)
    }

    async fn compose_in_memory(
        &self,
        range: &TileRange,
        width: u32,
        height: u32,
        output_dir: &Path,
        output: &Path,
    ) -> Result<ComposeReport, ComposeError> {
        debug!(%range, width, height, "Composing in memory");
        let tiles = block::fetch_range(self.fetcher, range, &AtomicBool::new(false)).await?;
        let tile_count = tiles.len() as u64;

        let range = *range;
        let tile_size = self.config.tile_size;
        let output_dir = output_dir.to_path_buf();
        let output = output.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let peak = PeakTracker::new();
            let canvas = block::composite(&range, &tiles, tile_size, &peak, &AtomicBool::new(false))?;
            drop(tiles);

            let temp = new_output_temp(&output_dir)?;
            let mut writer = BufWriter::new(temp);
            PngEncoder::new(&mut writer).write_image(
                canvas.as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            )?;
            persist_output(writer, &output)?;

            Ok::<_, ComposeError>(ComposeReport {
                width,
                height,
                tiles: tile_count,
                blocks: 1,
                merges: 0,
                peak_buffer_bytes: peak.peak(),
                in_memory: true,
            })
        })
        .await?
    }

    async fn compose_streaming(
        &self,
        range: &TileRange,
        width: u32,
        height: u32,
        output_dir: &Path,
        output: &Path,
    ) -> Result<ComposeReport, ComposeError> {
        let workspace = Arc::new(Workspace::create(Some(output_dir))?);
        let result = self
            .stream_blocks(range, width, height, output_dir, output, &workspace)
            .await;

        // Every task holding a clone has been awaited by now
        match Arc::into_inner(workspace) {
            // Removal failures are logged by close()
            Some(workspace) => {
                let _ = workspace.close();
            }
            None => warn!("Workspace still shared after compose; removal deferred"),
        }
        result
    }

    async fn stream_blocks(
        &self,
        range: &TileRange,
        width: u32,
        height: u32,
        output_dir: &Path,
        output: &Path,
        workspace: &Arc<Workspace>,
    ) -> Result<ComposeReport, ComposeError> {
        let peak = Arc::new(PeakTracker::new());
        let abort = Arc::new(AtomicBool::new(false));

        let layout = partition(range, self.config.block_size);
        let block_count: usize = layout.iter().map(Vec::len).sum();
        info!(
            %range,
            width,
            height,
            blocks = block_count,
            block_size = self.config.block_size,
            "Composing out of core"
        );

        // Drained to the end even after a failure: dropping an unfinished
        // block would detach its blocking task from this compose.
        let mut built: Vec<(BlockSpec, Artifact)> = Vec::with_capacity(block_count);
        let mut failure: Option<ComposeError> = None;
        let mut blocks = stream::iter(layout.into_iter().flatten())
            .map(|spec| {
                block::build_block(
                    self.fetcher,
                    spec,
                    self.config.tile_size,
                    Arc::clone(workspace),
                    Arc::clone(&peak),
                    Arc::clone(&abort),
                )
            })
            .buffer_unordered(self.config.max_parallel_blocks.max(1));
        while let Some(result) = blocks.next().await {
            match result {
                Ok(block) => built.push(block),
                // Keep the first error that caused the abort, not a cancellation
                Err(e) => {
                    let replace = match &failure {
                        None => true,
                        Some(ComposeError::Cancelled) => !matches!(e, ComposeError::Cancelled),
                        Some(_) => false,
                    };
                    if replace {
                        failure = Some(e);
                    }
                }
            }
        }
        drop(blocks);
        if let Some(e) = failure {
            return Err(e);
        }

        let mut rows: Vec<Vec<(u32, Artifact)>> = Vec::new();
        for (spec, artifact) in built {
            let row = spec.row as usize;
            if rows.len() <= row {
                rows.resize_with(row + 1, Vec::new);
            }
            rows[row].push((spec.col, artifact));
        }
        let rows: Vec<Vec<Artifact>> = rows
            .into_iter()
            .map(|mut row| {
                row.sort_by_key(|(col, _)| *col);
                row.into_iter().map(|(_, artifact)| artifact).collect()
            })
            .collect();

        let output_dir = output_dir.to_path_buf();
        let output = output.to_path_buf();
        let task_workspace = Arc::clone(workspace);
        let task_peak = Arc::clone(&peak);

        let merges = tokio::task::spawn_blocking(move || {
            let ws = task_workspace.as_ref();
            let peak = task_peak.as_ref();

            let reduced: Vec<(Artifact, usize)> = rows
                .into_par_iter()
                .map(|row| reduce(row, Axis::Horizontal, ws, peak))
                .collect::<Result<_, _>>()?;
            let mut merges: usize = reduced.iter().map(|(_, n)| n).sum();
            let row_artifacts = reduced.into_iter().map(|(a, _)| a).collect();

            let (last, column_merges) = reduce(row_artifacts, Axis::Vertical, ws, peak)?;
            merges += column_merges;

            if (last.width(), last.height()) != (width, height) {
                return Err(ComposeError::DimensionMismatch(format!(
                    "merged mosaic is {}×{}, expected {}×{}",
                    last.width(),
                    last.height(),
                    width,
                    height
                )));
            }

            let temp = new_output_temp(&output_dir)?;
            let writer = encode_artifact(&last, BufWriter::new(temp), peak)?;
            persist_output(writer, &output)?;
            Ok::<_, ComposeError>(merges)
        })
        .await??;

        Ok(ComposeReport {
            width,
            height,
            tiles: range.width() as u64 * range.height() as u64,
            blocks: block_count,
            merges,
            peak_buffer_bytes: peak.peak(),
            in_memory: false,
        })
    }
}

fn new_output_temp(dir: &Path) -> Result<NamedTempFile, ComposeError> {
    Ok(tempfile::Builder::new()
        .prefix(".tilestitch-")
        .suffix(".png.part")
        .tempfile_in(dir)?)
}

/// Flushes `writer` and atomically renames its temp file onto `output`.
fn persist_output(writer: BufWriter<NamedTempFile>, output: &Path) -> Result<(), ComposeError> {
    let mut temp = writer
        .into_inner()
        .map_err(|e| ComposeError::Io(e.into_error()))?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(output).map_err(|e| ComposeError::Io(e.error))?;
    Ok(())
}
