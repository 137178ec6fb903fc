//! Coordinate type definitions

use std::fmt;

use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Zoom levels accepted by the tile pyramid
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 22;

/// A geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Latitude in degrees, positive north
    pub lat: f64,
    /// Longitude in degrees, positive east
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// Axis-aligned rectangle in longitude/latitude degrees.
///
/// Always satisfies `min_lon <= max_lon` and `min_lat <= max_lat`; the
/// constructors reject anything else with [`CoordError::InvalidArea`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
}

impl BoundingBox {
    /// Creates a bounding box from its edges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArea` if an edge is not finite, a longitude lies
    /// outside [-180, 180], a latitude outside [-90, 90], or a minimum
    /// exceeds its maximum.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self, CoordError> {
        let edges = [min_lon, min_lat, max_lon, max_lat];
        if edges.iter().any(|v| !v.is_finite()) {
            return Err(CoordError::InvalidArea(
                "bounding box edges must be finite numbers".to_string(),
            ));
        }
        if !(MIN_LON..=MAX_LON).contains(&min_lon) || !(MIN_LON..=MAX_LON).contains(&max_lon) {
            return Err(CoordError::InvalidArea(format!(
                "longitudes {} and {} must lie within [-180, 180]",
                min_lon, max_lon
            )));
        }
        if !(-90.0..=90.0).contains(&min_lat) || !(-90.0..=90.0).contains(&max_lat) {
            return Err(CoordError::InvalidArea(format!(
                "latitudes {} and {} must lie within [-90, 90]",
                min_lat, max_lat
            )));
        }
        if min_lon > max_lon || min_lat > max_lat {
            return Err(CoordError::InvalidArea(format!(
                "minimum exceeds maximum in [{}, {}, {}, {}]",
                min_lon, min_lat, max_lon, max_lat
            )));
        }

        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// Creates the smallest bounding box containing two opposite corners.
    ///
    /// The corners may be given in any order.
    pub fn from_corners(a: GeoPoint, b: GeoPoint) -> Result<Self, CoordError> {
        Self::new(
            a.lon.min(b.lon),
            a.lat.min(b.lat),
            a.lon.max(b.lon),
            a.lat.max(b.lat),
        )
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.6}, {:.6}, {:.6}, {:.6}]",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// Tile coordinates in the Web Mercator / Slippy Map pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// X coordinate (east-west), 0 at the antimeridian
    pub x: u32,
    /// Y coordinate (north-south), 0 at north
    pub y: u32,
    /// Zoom level
    pub zoom: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// An inclusive rectangle of tiles at a single zoom level.
///
/// Invariant: `min_x <= max_x` and `min_y <= max_y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRange {
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
    pub zoom: u8,
}

impl TileRange {
    /// Creates a tile range, rejecting inverted bounds.
    pub fn new(min_x: u32, max_x: u32, min_y: u32, max_y: u32, zoom: u8) -> Result<Self, CoordError> {
        if min_x > max_x || min_y > max_y {
            return Err(CoordError::InvalidArea(format!(
                "inverted tile range x {}..={} y {}..={}",
                min_x, max_x, min_y, max_y
            )));
        }
        Ok(Self {
            min_x,
            max_x,
            min_y,
            max_y,
            zoom,
        })
    }

    /// Number of tile columns.
    #[inline]
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    /// Number of tile rows.
    #[inline]
    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Returns true if `tile` lies inside this range.
    pub fn contains(&self, tile: &TileCoord) -> bool {
        tile.zoom == self.zoom
            && (self.min_x..=self.max_x).contains(&tile.x)
            && (self.min_y..=self.max_y).contains(&tile.y)
    }

    /// Iterates every tile in row-major order (y outer, x inner).
    pub fn tiles(&self) -> TileRangeIter {
        TileRangeIter {
            range: *self,
            next_x: self.min_x,
            next_y: self.min_y,
            done: false,
        }
    }

    /// Geographic area actually covered by the tiles in this range.
    ///
    /// The result is usually slightly larger than the bounding box the range
    /// was derived from, since tiles snap outward to whole tile edges.
    pub fn geo_bounds(&self) -> BoundingBox {
        let (north, west) =
            super::tile_to_lat_lon(&TileCoord::new(self.min_x, self.min_y, self.zoom));
        let (south, east) =
            super::tile_to_lat_lon(&TileCoord::new(self.max_x + 1, self.max_y + 1, self.zoom));
        BoundingBox {
            min_lon: west,
            min_lat: south,
            max_lon: east,
            max_lat: north,
        }
    }
}

impl fmt::Display for TileRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "z{} x {}..={} y {}..={} ({}×{})",
            self.zoom,
            self.min_x,
            self.max_x,
            self.min_y,
            self.max_y,
            self.width(),
            self.height()
        )
    }
}

/// Row-major iterator over the tiles of a [`TileRange`].
#[derive(Debug, Clone)]
pub struct TileRangeIter {
    range: TileRange,
    next_x: u32,
    next_y: u32,
    done: bool,
}

impl Iterator for TileRangeIter {
    type Item = TileCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let tile = TileCoord::new(self.next_x, self.next_y, self.range.zoom);

        if self.next_x == self.range.max_x {
            if self.next_y == self.range.max_y {
                self.done = true;
            } else {
                self.next_x = self.range.min_x;
                self.next_y += 1;
            }
        } else {
            self.next_x += 1;
        }

        Some(tile)
    }
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude outside the Web Mercator valid range
    #[error("Invalid latitude: {0} (must be within ±85.05112878)")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180]
    #[error("Invalid longitude: {0} (must be within ±180)")]
    InvalidLongitude(f64),

    /// Zoom level beyond the supported pyramid
    #[error("Invalid zoom level: {0} (must be at most 22)")]
    InvalidZoom(u8),

    /// Degenerate or malformed area
    #[error("Invalid area: {0}")]
    InvalidArea(String),
}
