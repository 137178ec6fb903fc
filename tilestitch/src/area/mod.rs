//! Areas of interest and their pre-flight checks.
//!
//! An [`Area`] names a geographic rectangle. Before any tile is fetched the
//! rectangle is turned into a [`TileRange`], optionally widened into a 3×3
//! grid of neighbour blocks, and checked against the tile-count ceiling.
//! Nothing in this module performs I/O.

use std::fmt;

use thiserror::Error;

use crate::coord::{
    bounding_box_to_tile_range, tiles_per_axis, BoundingBox, CoordError, GeoPoint, TileRange,
};

/// Errors raised while resolving or validating an area.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AreaError {
    /// Coordinate conversion failed (latitude outside the Mercator range, etc.)
    #[error(transparent)]
    Coord(#[from] CoordError),

    /// Degenerate or malformed area
    #[error("Invalid area: {0}")]
    InvalidArea(String),

    /// The resolved tile grid exceeds the configured ceiling
    #[error("Area too large: {count} tiles exceeds the limit of {ceiling}")]
    AreaTooLarge { count: u64, ceiling: u64 },
}

/// How an area is described in the input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AreaShape {
    /// Two opposite corners, in any order
    Corners(GeoPoint, GeoPoint),
    /// An explicit bounding box
    BoundingBox(BoundingBox),
}

/// A named geographic rectangle to be rendered as one mosaic.
#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    name: String,
    shape: AreaShape,
}

impl Area {
    pub fn new(name: impl Into<String>, shape: AreaShape) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }

    pub fn from_bbox(name: impl Into<String>, bbox: BoundingBox) -> Self {
        Self::new(name, AreaShape::BoundingBox(bbox))
    }

    pub fn from_corners(name: impl Into<String>, a: GeoPoint, b: GeoPoint) -> Self {
        Self::new(name, AreaShape::Corners(a, b))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &AreaShape {
        &self.shape
    }

    /// Normalises the area's shape into a bounding box.
    pub fn bounding_box(&self) -> Result<BoundingBox, AreaError> {
        match self.shape {
            AreaShape::BoundingBox(bbox) => Ok(bbox),
            AreaShape::Corners(a, b) => Ok(BoundingBox::from_corners(a, b)?),
        }
    }

    /// Resolves the area to the tiles covering it at `zoom`.
    pub fn tile_range(&self, zoom: u8) -> Result<TileRange, AreaError> {
        let bbox = self.bounding_box()?;
        Ok(bounding_box_to_tile_range(&bbox, zoom)?)
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Grid expansion applied around the center range.
///
/// Only the 3×3 neighbourhood is defined today. New schemes slot in here as
/// additional variants handled by [`GridExpansion::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridExpansion {
    /// Use the center range as-is
    #[default]
    None,
    /// Surround the center with eight same-sized neighbour blocks
    Neighbors3x3,
}

impl GridExpansion {
    pub fn from_flag(expand: bool) -> Self {
        if expand {
            Self::Neighbors3x3
        } else {
            Self::None
        }
    }

    pub fn apply(&self, range: TileRange) -> Result<TileRange, AreaError> {
        match self {
            Self::None => Ok(range),
            Self::Neighbors3x3 => expand_to_grid(range),
        }
    }

    /// Suffix used in output file names.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Neighbors3x3 => "_3x3",
        }
    }
}

/// Widens `range` into a 3×3 grid of equal blocks centered on it.
///
/// With a center of `W × H` tiles the result spans
/// `[min_x − W, max_x + W] × [min_y − H, max_y + H]` at the same zoom.
///
/// # Errors
///
/// Returns `InvalidArea` when the neighbours would fall outside the tile
/// pyramid; the grid is never wrapped or clipped.
pub fn expand_to_grid(range: TileRange) -> Result<TileRange, AreaError> {
    let w = range.width() as i64;
    let h = range.height() as i64;
    let limit = tiles_per_axis(range.zoom) as i64;

    let min_x = range.min_x as i64 - w;
    let max_x = range.max_x as i64 + w;
    let min_y = range.min_y as i64 - h;
    let max_y = range.max_y as i64 + h;

    if min_x < 0 || min_y < 0 || max_x >= limit || max_y >= limit {
        return Err(AreaError::InvalidArea(format!(
            "3x3 expansion of {} leaves the zoom {} tile grid",
            range, range.zoom
        )));
    }

    Ok(TileRange::new(
        min_x as u32,
        max_x as u32,
        min_y as u32,
        max_y as u32,
        range.zoom,
    )?)
}

/// Number of tiles in a range.
#[inline]
pub fn compute_tile_count(range: &TileRange) -> u64 {
    range.width() as u64 * range.height() as u64
}

/// Fails with `AreaTooLarge` when `count` exceeds `ceiling`.
#[inline]
pub fn enforce_limit(count: u64, ceiling: u64) -> Result<(), AreaError> {
    if count > ceiling {
        return Err(AreaError::AreaTooLarge { count, ceiling });
    }
    Ok(())
}
