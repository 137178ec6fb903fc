//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator tile coordinates used by slippy-map tile services.

mod types;

pub use types::{
    BoundingBox, CoordError, GeoPoint, TileCoord, TileRange, TileRangeIter, MAX_LAT, MAX_LON,
    MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

/// Number of tiles along one axis at the given zoom level.
#[inline]
pub fn tiles_per_axis(zoom: u8) -> u64 {
    1u64 << zoom
}

#[inline]
fn check_zoom(zoom: u8) -> Result<(), CoordError> {
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }
    Ok(())
}

/// Converts a longitude to a tile column.
///
/// `floor((lon + 180) / 360 × 2^zoom)`, clamped so that `lon = 180` maps to
/// the last column rather than one past it.
///
/// # Arguments
///
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 22)
#[inline]
pub fn longitude_to_tile_x(lon: f64, zoom: u8) -> Result<u32, CoordError> {
    check_zoom(zoom)?;
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }

    let n = tiles_per_axis(zoom) as f64;
    let x = ((lon + 180.0) / 360.0 * n).floor() as u64;

    Ok(x.min(tiles_per_axis(zoom) - 1) as u32)
}

/// Converts a latitude to a tile row using the Web Mercator projection.
///
/// `floor((1 − ln(tan φ + sec φ) / π) / 2 × 2^zoom)`. Only defined inside the
/// Mercator limit; anything beyond ±85.05112878° fails with
/// [`CoordError::InvalidLatitude`] instead of producing a wrapped index.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `zoom` - Zoom level (0 to 22)
#[inline]
pub fn latitude_to_tile_y(lat: f64, zoom: u8) -> Result<u32, CoordError> {
    check_zoom(zoom)?;
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }

    let n = tiles_per_axis(zoom) as f64;
    let lat_rad = lat * PI / 180.0;
    // asinh(tan φ) == ln(tan φ + sec φ)
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor();

    Ok((y.max(0.0) as u64).min(tiles_per_axis(zoom) - 1) as u32)
}

/// Converts geographic coordinates to tile coordinates.
///
/// # Returns
///
/// A `Result` containing the tile coordinates or an error if inputs are invalid.
#[inline]
pub fn to_tile_coords(point: GeoPoint, zoom: u8) -> Result<TileCoord, CoordError> {
    Ok(TileCoord {
        x: longitude_to_tile_x(point.lon, zoom)?,
        y: latitude_to_tile_y(point.lat, zoom)?,
        zoom,
    })
}

/// Converts a bounding box into the inclusive range of tiles covering it.
///
/// The Y axis runs north to south, so `min_y` comes from the box's
/// northern edge (`max_lat`) and `max_y` from its southern edge.
pub fn bounding_box_to_tile_range(bbox: &BoundingBox, zoom: u8) -> Result<TileRange, CoordError> {
    let min_x = longitude_to_tile_x(bbox.min_lon(), zoom)?;
    let max_x = longitude_to_tile_x(bbox.max_lon(), zoom)?;
    let min_y = latitude_to_tile_y(bbox.max_lat(), zoom)?;
    let max_y = latitude_to_tile_y(bbox.min_lat(), zoom)?;

    TileRange::new(min_x, max_x, min_y, max_y, zoom)
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = tiles_per_axis(tile.zoom) as f64;

    let lon = tile.x as f64 / n * 360.0 - 180.0;

    // Inverse Web Mercator
    let y = tile.y as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}
