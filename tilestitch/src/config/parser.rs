//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::area::Area;
use crate::coord::{BoundingBox, GeoPoint, MAX_ZOOM};
use crate::provider::ProviderConfig;

const AREA_SECTION_PREFIX: &str = "area:";

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [provider] section
    if let Some(section) = ini.section(Some("provider")) {
        if let Some(v) = value(section, "type") {
            let v = v.to_lowercase();
            if ProviderConfig::from_type_name(&v).is_none() {
                return Err(invalid(
                    "provider",
                    "type",
                    &v,
                    "must be one of: arcgis, osm, google, usgs, custom",
                ));
            }
            config.provider.provider_type = v;
        }
        config.provider.google_api_key = value(section, "google_api_key").map(str::to_string);
        config.provider.custom_id = value(section, "custom_id").map(str::to_string);
        config.provider.url_template = value(section, "url_template").map(str::to_string);
    }

    // [mosaic] section
    if let Some(section) = ini.section(Some("mosaic")) {
        let m = &mut config.mosaic;
        if let Some(zoom) = parse_number::<u8>(section, "mosaic", "zoom")? {
            if zoom > MAX_ZOOM {
                return Err(invalid(
                    "mosaic",
                    "zoom",
                    &zoom.to_string(),
                    "must be between 0 and 22",
                ));
            }
            m.zoom = zoom;
        }
        if let Some(v) = parse_positive::<u32>(section, "mosaic", "tile_size")? {
            m.tile_size = v;
        }
        if let Some(v) = value(section, "expand") {
            m.expand = parse_bool(v).ok_or_else(|| {
                invalid("mosaic", "expand", v, "must be true or false")
            })?;
        }
        if let Some(v) = parse_number::<u64>(section, "mosaic", "max_tiles")? {
            m.max_tiles = v;
        }
        if let Some(v) = parse_positive::<u32>(section, "mosaic", "block_size")? {
            m.block_size = v;
        }
        if let Some(v) = parse_positive::<usize>(section, "mosaic", "max_concurrent_fetches")? {
            m.max_concurrent_fetches = v;
        }
        if let Some(v) = parse_positive::<usize>(section, "mosaic", "max_parallel_blocks")? {
            m.max_parallel_blocks = v;
        }
        if let Some(v) = parse_number::<u64>(section, "mosaic", "in_memory_threshold_pixels")? {
            m.in_memory_threshold_pixels = v;
        }
        if let Some(v) = parse_positive::<u64>(section, "mosaic", "http_timeout_secs")? {
            m.http_timeout_secs = v;
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = value(section, "enabled") {
            config.cache.enabled = parse_bool(v)
                .ok_or_else(|| invalid("cache", "enabled", v, "must be true or false"))?;
        }
        if let Some(v) = value(section, "directory") {
            config.cache.directory = expand_tilde(v);
        }
    }

    // [output] section
    if let Some(section) = ini.section(Some("output")) {
        if let Some(v) = value(section, "directory") {
            config.output.directory = expand_tilde(v);
        }
    }

    // [area:NAME] sections, in file order
    for (name, section) in ini.iter() {
        let Some(area_name) = name.and_then(|n| n.strip_prefix(AREA_SECTION_PREFIX)) else {
            continue;
        };
        let section_name = format!("{}{}", AREA_SECTION_PREFIX, area_name);
        let area_name = area_name.trim();
        if area_name.is_empty() {
            return Err(invalid(&section_name, "", "", "area name must not be empty"));
        }
        if config.areas.iter().any(|a| a.name() == area_name) {
            return Err(invalid(&section_name, "", "", "duplicate area name"));
        }
        config
            .areas
            .push(parse_area(area_name, &section_name, section)?);
    }

    Ok(config)
}

fn parse_area(name: &str, section_name: &str, section: &Properties) -> Result<Area, ConfigFileError> {
    if let Some(v) = value(section, "bbox") {
        let numbers = parse_floats(v)
            .filter(|n| n.len() == 4)
            .ok_or_else(|| {
                invalid(
                    section_name,
                    "bbox",
                    v,
                    "expected four numbers: minLon, minLat, maxLon, maxLat",
                )
            })?;
        let bbox = BoundingBox::new(numbers[0], numbers[1], numbers[2], numbers[3])
            .map_err(|e| invalid(section_name, "bbox", v, &e.to_string()))?;
        return Ok(Area::from_bbox(name, bbox));
    }

    match (value(section, "corner1"), value(section, "corner2")) {
        (Some(c1), Some(c2)) => {
            let a = parse_point(c1).ok_or_else(|| {
                invalid(section_name, "corner1", c1, "expected lat, lon")
            })?;
            let b = parse_point(c2).ok_or_else(|| {
                invalid(section_name, "corner2", c2, "expected lat, lon")
            })?;
            BoundingBox::from_corners(a, b)
                .map_err(|e| invalid(section_name, "corner1", c1, &e.to_string()))?;
            Ok(Area::from_corners(name, a, b))
        }
        _ => Err(invalid(
            section_name,
            "bbox",
            "",
            "area needs either bbox or both corner1 and corner2",
        )),
    }
}

/// Returns a trimmed, non-empty value with any trailing `; comment` removed.
fn value<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    let raw = section.get(key)?;
    let without_comment = match raw.find(" ;").or_else(|| raw.find(" #")) {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    let trimmed = without_comment.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn parse_number<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, ConfigFileError> {
    match value(section, key) {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| invalid(section_name, key, v, "must be a non-negative integer")),
    }
}

fn parse_positive<T: FromStr + Default + PartialEq>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, ConfigFileError> {
    let parsed = value(section, key).map(|v| (v, v.parse::<T>()));
    match parsed {
        None => Ok(None),
        Some((_, Ok(n))) if n != T::default() => Ok(Some(n)),
        Some((v, _)) => Err(invalid(section_name, key, v, "must be a positive integer")),
    }
}

fn parse_floats(value: &str) -> Option<Vec<f64>> {
    value
        .split(',')
        .map(|part| part.trim().parse::<f64>().ok())
        .collect()
}

/// Parses `lat, lon`.
fn parse_point(value: &str) -> Option<GeoPoint> {
    match parse_floats(value)?.as_slice() {
        [lat, lon] => Some(GeoPoint::new(*lat, *lon)),
        _ => None,
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a boolean value from string.
pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::AreaShape;

    fn parse(content: &str) -> Result<ConfigFile, ConfigFileError> {
        ConfigFile::parse(content)
    }

    const FULL: &str = r#"
[provider]
type = OSM

[mosaic]
zoom = 17
tile_size = 512
expand = yes
max_tiles = 500
block_size = 8
max_concurrent_fetches = 4
max_parallel_blocks = 2
in_memory_threshold_pixels = 0
http_timeout_secs = 10

[cache]
enabled = false
directory = /var/cache/tiles

[output]
directory = ~/mosaics

[area:downtown_la]
bbox = -118.2537, 34.0422, -118.2437, 34.0522

[area:harbor]
corner1 = 33.75, -118.28
corner2 = 33.72, -118.25
"#;

    #[test]
    fn test_full_config() {
        let config = parse(FULL).unwrap();

        assert_eq!(config.provider.provider_type, "osm");
        assert_eq!(config.mosaic.zoom, 17);
        assert_eq!(config.mosaic.tile_size, 512);
        assert!(config.mosaic.expand);
        assert_eq!(config.mosaic.max_tiles, 500);
        assert_eq!(config.mosaic.block_size, 8);
        assert_eq!(config.mosaic.max_concurrent_fetches, 4);
        assert_eq!(config.mosaic.max_parallel_blocks, 2);
        assert_eq!(config.mosaic.in_memory_threshold_pixels, 0);
        assert_eq!(config.mosaic.http_timeout_secs, 10);
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.directory, PathBuf::from("/var/cache/tiles"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.output.directory, home.join("mosaics"));
        }
    }

    #[test]
    fn test_areas_in_file_order() {
        let config = parse(FULL).unwrap();

        let names: Vec<&str> = config.areas.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["downtown_la", "harbor"]);
        assert!(matches!(config.areas[0].shape(), AreaShape::BoundingBox(_)));
        assert!(matches!(config.areas[1].shape(), AreaShape::Corners(_, _)));
        assert_eq!(config.areas[0].tile_range(18).unwrap().min_x, 44962);
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_invalid_provider_type() {
        let err = parse("[provider]\ntype = bing\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::InvalidValue { ref section, ref key, .. }
                if section == "provider" && key == "type"
        ));
    }

    #[test]
    fn test_zoom_out_of_range() {
        assert!(parse("[mosaic]\nzoom = 23\n").is_err());
        assert!(parse("[mosaic]\nzoom = -1\n").is_err());
        assert!(parse("[mosaic]\nzoom = 22\n").is_ok());
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let err = parse("[mosaic]\nblock_size = 0\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: mosaic.block_size = '0' - must be a positive integer"
        );
    }

    #[test]
    fn test_bad_bool() {
        assert!(parse("[mosaic]\nexpand = maybe\n").is_err());
    }

    #[test]
    fn test_inverted_bbox_rejected() {
        let err = parse("[area:bad]\nbbox = -118.2, 34.1, -118.3, 34.0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::InvalidValue { ref section, ref key, .. }
                if section == "area:bad" && key == "bbox"
        ));
    }

    #[test]
    fn test_area_without_shape_rejected() {
        assert!(parse("[area:empty]\ncorner1 = 1, 2\n").is_err());
        assert!(parse("[area:short]\nbbox = 1, 2, 3\n").is_err());
    }

    #[test]
    fn test_trailing_comment_stripped() {
        let config = parse("[mosaic]\nzoom = 15   ; city level\n").unwrap();
        assert_eq!(config.mosaic.zoom, 15);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("2"), None);
    }

    #[test]
    fn test_expand_tilde_leaves_plain_paths() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_tilde("rel"), PathBuf::from("rel"));
    }
}
