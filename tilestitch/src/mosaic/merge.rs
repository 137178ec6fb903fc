//! Streaming pairwise artifact merges.
//!
//! A horizontal merge places `b` to the right of `a` and holds one output
//! scanline of the combined width. A vertical merge places `b` below `a`
//! and copies scanlines through a single row buffer. Inputs are deleted
//! once merged so the workspace holds roughly one copy of the mosaic.

use tracing::trace;

use super::artifact::{Artifact, ArtifactWriter};
use super::types::{ComposeError, PeakTracker, BYTES_PER_PIXEL};
use super::workspace::Workspace;

/// Direction in which two artifacts are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Side by side, left to right
    Horizontal,
    /// Stacked, top to bottom
    Vertical,
}

/// Merges `a` and `b` along `axis` into a new artifact in `workspace`.
///
/// # Errors
///
/// Returns `DimensionMismatch` when heights differ for a horizontal merge
/// or widths differ for a vertical one.
pub fn merge_pair(
    a: Artifact,
    b: Artifact,
    axis: Axis,
    workspace: &Workspace,
    peak: &PeakTracker,
) -> Result<Artifact, ComposeError> {
    let merged = match axis {
        Axis::Horizontal => merge_horizontal(&a, &b, workspace, peak)?,
        Axis::Vertical => merge_vertical(&a, &b, workspace, peak)?,
    };
    trace!(
        ?axis,
        width = merged.width(),
        height = merged.height(),
        "Merged artifacts"
    );
    a.remove()?;
    b.remove()?;
    Ok(merged)
}

fn merge_horizontal(
    a: &Artifact,
    b: &Artifact,
    workspace: &Workspace,
    peak: &PeakTracker,
) -> Result<Artifact, ComposeError> {
    if a.height() != b.height() {
        return Err(ComposeError::DimensionMismatch(format!(
            "horizontal merge of {}×{} and {}×{}: heights differ",
            a.width(),
            a.height(),
            b.width(),
            b.height()
        )));
    }

    let width = a.width() + b.width();
    let mut row = vec![0u8; width as usize * BYTES_PER_PIXEL as usize];
    peak.record(row.len() as u64);

    let mut left = a.reader()?;
    let mut right = b.reader()?;
    let mut out = ArtifactWriter::create(workspace.artifact_path("h"), width, a.height())?;
    let split = a.row_bytes();

    for _ in 0..a.height() {
        let (l, r) = row.split_at_mut(split);
        left.read_row(l)?;
        right.read_row(r)?;
        out.write_row(&row)?;
    }

    out.finish()
}

fn merge_vertical(
    a: &Artifact,
    b: &Artifact,
    workspace: &Workspace,
    peak: &PeakTracker,
) -> Result<Artifact, ComposeError> {
    if a.width() != b.width() {
        return Err(ComposeError::DimensionMismatch(format!(
            "vertical merge of {}×{} and {}×{}: widths differ",
            a.width(),
            a.height(),
            b.width(),
            b.height()
        )));
    }

    let mut row = vec![0u8; a.row_bytes()];
    peak.record(row.len() as u64);

    let mut out =
        ArtifactWriter::create(workspace.artifact_path("v"), a.width(), a.height() + b.height())?;
    for source in [a, b] {
        let mut reader = source.reader()?;
        for _ in 0..source.height() {
            reader.read_row(&mut row)?;
            out.write_row(&row)?;
        }
    }

    out.finish()
}

/// Reduces an ordered list of artifacts to one by repeated pairwise merges.
///
/// Each level merges neighbours `(0,1), (2,3), ...`; an odd artifact at the
/// end carries forward unchanged to the next level, so order is preserved
/// and `n` inputs take `⌈log2 n⌉` levels and `n − 1` merges.
///
/// Returns the final artifact and the number of merges performed.
pub fn reduce(
    mut items: Vec<Artifact>,
    axis: Axis,
    workspace: &Workspace,
    peak: &PeakTracker,
) -> Result<(Artifact, usize), ComposeError> {
    let mut merges = 0;

    while items.len() > 1 {
        let mut next = Vec::with_capacity(items.len().div_ceil(2));
        let mut iter = items.into_iter();
        while let Some(a) = iter.next() {
            match iter.next() {
                Some(b) => {
                    next.push(merge_pair(a, b, axis, workspace, peak)?);
                    merges += 1;
                }
                None => next.push(a),
            }
        }
        items = next;
    }

    let last = items
        .pop()
        .ok_or_else(|| ComposeError::Artifact("nothing to merge".to_string()))?;
    Ok((last, merges))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn solid(workspace: &Workspace, w: u32, h: u32, v: u8) -> Artifact {
        let image = RgbaImage::from_pixel(w, h, Rgba([v, v, v, 255]));
        Artifact::write_image(workspace.artifact_path("t"), &image).unwrap()
    }

    #[test]
    fn test_horizontal_merge_places_b_right_of_a() {
        let ws = Workspace::create(None).unwrap();
        let peak = PeakTracker::new();
        let a = solid(&ws, 2, 3, 10);
        let b = solid(&ws, 4, 3, 20);
        let (a_path, b_path) = (a.path().to_path_buf(), b.path().to_path_buf());

        let merged = merge_pair(a, b, Axis::Horizontal, &ws, &peak).unwrap();
        let image = merged.load().unwrap();

        assert_eq!((image.width(), image.height()), (6, 3));
        assert_eq!(image.get_pixel(1, 2)[0], 10);
        assert_eq!(image.get_pixel(2, 0)[0], 20);
        assert_eq!(peak.peak(), 6 * 4);
        assert!(!a_path.exists() && !b_path.exists());
    }

    #[test]
    fn test_vertical_merge_places_b_below_a() {
        let ws = Workspace::create(None).unwrap();
        let peak = PeakTracker::new();
        let a = solid(&ws, 3, 1, 10);
        let b = solid(&ws, 3, 2, 20);

        let merged = merge_pair(a, b, Axis::Vertical, &ws, &peak).unwrap();
        let image = merged.load().unwrap();

        assert_eq!((image.width(), image.height()), (3, 3));
        assert_eq!(image.get_pixel(0, 0)[0], 10);
        assert_eq!(image.get_pixel(0, 1)[0], 20);
        assert_eq!(peak.peak(), 3 * 4);
    }

    #[test]
    fn test_mismatched_dimensions_fail() {
        let ws = Workspace::create(None).unwrap();
        let peak = PeakTracker::new();

        let result = merge_pair(solid(&ws, 2, 2, 0), solid(&ws, 2, 3, 0), Axis::Horizontal, &ws, &peak);
        assert!(matches!(result, Err(ComposeError::DimensionMismatch(_))));

        let result = merge_pair(solid(&ws, 2, 2, 0), solid(&ws, 3, 2, 0), Axis::Vertical, &ws, &peak);
        assert!(matches!(result, Err(ComposeError::DimensionMismatch(_))));
    }

    #[test]
    fn test_reduce_odd_count_preserves_order() {
        let ws = Workspace::create(None).unwrap();
        let peak = PeakTracker::new();
        let items: Vec<_> = (0..5u8).map(|i| solid(&ws, 1, 1, i * 10)).collect();

        let (merged, merges) = reduce(items, Axis::Horizontal, &ws, &peak).unwrap();
        let image = merged.load().unwrap();

        assert_eq!(merges, 4);
        assert_eq!((image.width(), image.height()), (5, 1));
        let values: Vec<u8> = (0..5).map(|x| image.get_pixel(x, 0)[0]).collect();
        assert_eq!(values, vec![0, 10, 20, 30, 40]);
    }

    #[test]
    fn test_reduce_single_item_is_unchanged() {
        let ws = Workspace::create(None).unwrap();
        let peak = PeakTracker::new();
        let only = solid(&ws, 2, 2, 5);
        let path = only.path().to_path_buf();

        let (merged, merges) = reduce(vec![only], Axis::Vertical, &ws, &peak).unwrap();
        assert_eq!(merges, 0);
        assert_eq!(merged.path(), path);
    }

    #[test]
    fn test_reduce_empty_fails() {
        let ws = Workspace::create(None).unwrap();
        let peak = PeakTracker::new();
        assert!(reduce(Vec::new(), Axis::Vertical, &ws, &peak).is_err());
    }
}
