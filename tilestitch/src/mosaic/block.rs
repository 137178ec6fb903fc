//! Block partitioning and per-block compositing.
//!
//! A block is a sub-grid of at most `block_size × block_size` tiles. Its
//! tiles are fetched together, decoded, normalised to the tile size and
//! composited into one canvas, which is then written out as an artifact.
//!
//! Every stage checks a shared abort flag, so once one block fails the
//! others stop at the next tile instead of running to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::try_join_all;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use tracing::{debug, trace};

use crate::cache::TileFetcher;
use crate::coord::{TileCoord, TileRange};
use crate::provider::AsyncProvider;

use super::artifact::Artifact;
use super::types::{ComposeError, PeakTracker, BYTES_PER_PIXEL};
use super::workspace::Workspace;

/// Position and extent of one block within the mosaic grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpec {
    /// Block row, top to bottom
    pub row: u32,
    /// Block column, left to right
    pub col: u32,
    /// Tiles covered by this block
    pub range: TileRange,
}

/// Splits `range` into rows of blocks of at most `block_size` tiles a side.
///
/// The last block in each row and the last row may be narrower. Returned
/// rows are ordered top to bottom and blocks within a row left to right.
pub fn partition(range: &TileRange, block_size: u32) -> Vec<Vec<BlockSpec>> {
    let block_size = block_size.max(1);
    let cols = range.width().div_ceil(block_size);
    let rows = range.height().div_ceil(block_size);

    (0..rows)
        .map(|row| {
            let min_y = range.min_y + row * block_size;
            let max_y = (min_y + block_size - 1).min(range.max_y);
            (0..cols)
                .map(|col| {
                    let min_x = range.min_x + col * block_size;
                    let max_x = (min_x + block_size - 1).min(range.max_x);
                    BlockSpec {
                        row,
                        col,
                        range: TileRange {
                            min_x,
                            max_x,
                            min_y,
                            max_y,
                            zoom: range.zoom,
                        },
                    }
                })
                .collect()
        })
        .collect()
}

/// Decodes tile bytes and normalises the result to `tile_size × tile_size`.
///
/// Tiles of another size are resampled with Lanczos3.
pub fn decode_tile(tile: TileCoord, data: &[u8], tile_size: u32) -> Result<RgbaImage, ComposeError> {
    let image = image::load_from_memory(data)
        .map_err(|e| ComposeError::Decode {
            x: tile.x,
            y: tile.y,
            zoom: tile.zoom,
            message: e.to_string(),
        })?
        .to_rgba8();

    if image.width() == tile_size && image.height() == tile_size {
        return Ok(image);
    }

    trace!(
        tile = %tile,
        width = image.width(),
        height = image.height(),
        tile_size,
        "Resampling tile"
    );
    Ok(imageops::resize(&image, tile_size, tile_size, FilterType::Lanczos3))
}

/// Composites decoded tiles of `range` (row-major) into one canvas.
///
/// Returns `Cancelled` as soon as `abort` is seen set between two tiles.
pub fn composite(
    range: &TileRange,
    tiles: &[(TileCoord, Vec<u8>)],
    tile_size: u32,
    peak: &PeakTracker,
    abort: &AtomicBool,
) -> Result<RgbaImage, ComposeError> {
    let width = range.width() * tile_size;
    let height = range.height() * tile_size;
    peak.record(width as u64 * height as u64 * BYTES_PER_PIXEL);

    let mut canvas = RgbaImage::new(width, height);
    for (tile, data) in tiles {
        if abort.load(Ordering::Acquire) {
            return Err(ComposeError::Cancelled);
        }
        let image = decode_tile(*tile, data, tile_size)?;
        let x = ((tile.x - range.min_x) * tile_size) as i64;
        let y = ((tile.y - range.min_y) * tile_size) as i64;
        imageops::replace(&mut canvas, &image, x, y);
    }
    Ok(canvas)
}

/// Fetches every tile of `range`, in row-major order.
///
/// Fetches run concurrently; the first failure cancels the rest. Tiles not
/// yet started when `abort` is set are skipped.
pub async fn fetch_range<P: AsyncProvider>(
    fetcher: &TileFetcher<P>,
    range: &TileRange,
    abort: &AtomicBool,
) -> Result<Vec<(TileCoord, Vec<u8>)>, ComposeError> {
    let fetches = range.tiles().map(|tile| async move {
        if abort.load(Ordering::Acquire) {
            return Err(ComposeError::Cancelled);
        }
        let data = fetcher.fetch(tile).await?;
        Ok::<_, ComposeError>((tile, data))
    });
    try_join_all(fetches).await
}

/// Fetches, composites and persists one block.
///
/// Any failure sets `abort` so sibling blocks wind down. The blocking
/// composite is always awaited; the returned future completes only after
/// it has released `workspace`.
pub async fn build_block<P: AsyncProvider>(
    fetcher: &TileFetcher<P>,
    spec: BlockSpec,
    tile_size: u32,
    workspace: Arc<Workspace>,
    peak: Arc<PeakTracker>,
    abort: Arc<AtomicBool>,
) -> Result<(BlockSpec, Artifact), ComposeError> {
    let result = composite_block(fetcher, spec, tile_size, workspace, peak, &abort).await;
    if let Err(e) = &result {
        if !matches!(e, ComposeError::Cancelled) {
            debug!(row = spec.row, col = spec.col, error = %e, "Block failed, aborting siblings");
        }
        abort.store(true, Ordering::Release);
    }
    result
}

async fn composite_block<P: AsyncProvider>(
    fetcher: &TileFetcher<P>,
    spec: BlockSpec,
    tile_size: u32,
    workspace: Arc<Workspace>,
    peak: Arc<PeakTracker>,
    abort: &Arc<AtomicBool>,
) -> Result<(BlockSpec, Artifact), ComposeError> {
    if abort.load(Ordering::Acquire) {
        return Err(ComposeError::Cancelled);
    }
    let tiles = fetch_range(fetcher, &spec.range, abort).await?;

    let task_abort = Arc::clone(abort);
    let artifact = tokio::task::spawn_blocking(move || {
        let canvas = composite(&spec.range, &tiles, tile_size, &peak, &task_abort)?;
        Artifact::write_image(workspace.artifact_path("block"), &canvas)
    })
    .await??;

    debug!(
        row = spec.row,
        col = spec.col,
        tiles = spec.range.width() * spec.range.height(),
        "Block composited"
    );
    Ok((spec, artifact))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn png_bytes(image: &RgbaImage) -> Vec<u8> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_partition_exact_fit() {
        let range = TileRange::new(0, 19, 0, 9, 10).unwrap();
        let rows = partition(&range, 10);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0][1].range.min_x, 10);
        assert_eq!(rows[0][1].range.max_x, 19);
    }

    #[test]
    fn test_partition_ragged_edges_cover_range() {
        let range = TileRange::new(100, 122, 50, 56, 12).unwrap();
        let rows = partition(&range, 10);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 3);
        let last = rows[0][2].range;
        assert_eq!((last.min_x, last.max_x), (120, 122));
        assert_eq!((last.min_y, last.max_y), (50, 56));

        let covered: u32 = rows
            .iter()
            .flatten()
            .map(|b| b.range.width() * b.range.height())
            .sum();
        assert_eq!(covered, range.width() * range.height());
    }

    #[test]
    fn test_decode_resamples_to_tile_size() {
        let small = RgbaImage::from_pixel(128, 128, Rgba([10, 20, 30, 255]));
        let decoded = decode_tile(TileCoord::new(0, 0, 1), &png_bytes(&small), 256).unwrap();

        assert_eq!((decoded.width(), decoded.height()), (256, 256));
        assert_eq!(*decoded.get_pixel(128, 128), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_decode_garbage_reports_tile() {
        let err = decode_tile(TileCoord::new(3, 4, 5), b"not an image", 256).unwrap_err();
        assert!(matches!(err, ComposeError::Decode { x: 3, y: 4, zoom: 5, .. }));
    }

    #[test]
    fn test_composite_places_tiles() {
        let range = TileRange::new(10, 11, 20, 20, 8).unwrap();
        let red = png_bytes(&RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])));
        let blue = png_bytes(&RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255])));
        let tiles = vec![
            (TileCoord::new(10, 20, 8), red),
            (TileCoord::new(11, 20, 8), blue),
        ];
        let peak = PeakTracker::new();

        let canvas = composite(&range, &tiles, 4, &peak, &AtomicBool::new(false)).unwrap();

        assert_eq!((canvas.width(), canvas.height()), (8, 4));
        assert_eq!(*canvas.get_pixel(3, 3), Rgba([255, 0, 0, 255]));
        assert_eq!(*canvas.get_pixel(4, 0), Rgba([0, 0, 255, 255]));
        assert_eq!(peak.peak(), 8 * 4 * 4);
    }

    #[test]
    fn test_composite_stops_when_aborted() {
        let range = TileRange::new(0, 0, 0, 0, 1).unwrap();
        let tile = png_bytes(&RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])));
        let tiles = vec![(TileCoord::new(0, 0, 1), tile)];

        let result = composite(&range, &tiles, 4, &PeakTracker::new(), &AtomicBool::new(true));
        assert!(matches!(result, Err(ComposeError::Cancelled)));
    }
}
