//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use tracing::info;

use tilestitch::area::Area;
use tilestitch::cache::{Cache, DiskCacheProvider, MemoryCacheProvider, TileFetcher};
use tilestitch::config::ConfigFile;
use tilestitch::coord::MAX_ZOOM;
use tilestitch::orchestrator::MosaicOrchestrator;
use tilestitch::provider::{AsyncProvider, AsyncReqwestClient, ProviderFactory, TileProviderKind};

use crate::error::CliError;

/// Imagery provider selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ProviderType {
    /// ArcGIS World Imagery (no API key required, global coverage)
    Arcgis,
    /// OpenStreetMap standard tiles (no API key required)
    Osm,
    /// Google Map Tiles API (requires API key)
    Google,
    /// USGS orthoimagery (no API key required, US coverage only)
    Usgs,
    /// XYZ URL template from [provider] url_template
    Custom,
}

impl ProviderType {
    /// Name used for `type` in the `[provider]` section.
    pub fn as_config_str(&self) -> &'static str {
        match self {
            ProviderType::Arcgis => "arcgis",
            ProviderType::Osm => "osm",
            ProviderType::Google => "google",
            ProviderType::Usgs => "usgs",
            ProviderType::Custom => "custom",
        }
    }
}

/// Settings that override the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct OverrideArgs {
    /// Config file (default: ~/.tilestitch/config.ini)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Zoom level
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=MAX_ZOOM as i64))]
    pub zoom: Option<u8>,

    /// Surround each area with its eight neighbour blocks (3x3 grid)
    #[arg(long)]
    pub expand: bool,

    /// Refuse areas covering more tiles than this
    #[arg(long, value_name = "N")]
    pub max_tiles: Option<u64>,

    /// Imagery provider
    #[arg(long, value_enum)]
    pub provider: Option<ProviderType>,

    /// XYZ URL template for --provider custom, e.g. https://t/{z}/{x}/{y}.png
    #[arg(long, value_name = "TEMPLATE")]
    pub url_template: Option<String>,

    /// Output directory for the mosaics
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Keep downloaded tiles in memory only
    #[arg(long)]
    pub no_cache: bool,
}

/// Area selection for commands that read areas from the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct SelectionArgs {
    /// Only process the named area (repeatable)
    #[arg(long = "area", value_name = "NAME")]
    pub areas: Vec<String>,

    #[command(flatten)]
    pub overrides: OverrideArgs,
}

/// Loads the config file and applies command-line overrides.
///
/// An explicit `--config` must exist; the default location may be absent.
pub fn load_config(args: &OverrideArgs) -> Result<ConfigFile, CliError> {
    let mut config = match &args.config {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    apply_overrides(&mut config, args);
    Ok(config)
}

/// CLI values take precedence over the file.
pub fn apply_overrides(config: &mut ConfigFile, args: &OverrideArgs) {
    if let Some(zoom) = args.zoom {
        config.mosaic.zoom = zoom;
    }
    if args.expand {
        config.mosaic.expand = true;
    }
    if let Some(max_tiles) = args.max_tiles {
        config.mosaic.max_tiles = max_tiles;
    }
    if let Some(provider) = args.provider {
        config.provider.provider_type = provider.as_config_str().to_string();
    }
    if let Some(template) = &args.url_template {
        config.provider.url_template = Some(template.clone());
    }
    if let Some(output) = &args.output {
        config.output.directory = output.clone();
    }
    if args.no_cache {
        config.cache.enabled = false;
    }
}

/// Picks the areas named with `--area`, in the order given, or all areas.
pub fn select_areas(config: &ConfigFile, names: &[String]) -> Result<Vec<Area>, CliError> {
    if config.areas.is_empty() {
        return Err(CliError::NoAreas);
    }
    if names.is_empty() {
        return Ok(config.areas.clone());
    }

    names
        .iter()
        .map(|name| {
            config
                .areas
                .iter()
                .find(|area| area.name() == name)
                .cloned()
                .ok_or_else(|| CliError::UnknownArea(name.clone()))
        })
        .collect()
}

/// Builds the provider, cache and fetcher described by `config`.
pub async fn build_orchestrator(
    config: &ConfigFile,
) -> Result<MosaicOrchestrator<TileProviderKind>, CliError> {
    let provider_config = config.provider_config()?;
    let http_client = AsyncReqwestClient::with_timeout(config.mosaic.http_timeout_secs)?;
    let provider = ProviderFactory::new(http_client).create(&provider_config)?;
    info!(
        provider = provider.name(),
        min_zoom = provider.min_zoom(),
        max_zoom = provider.max_zoom(),
        "Provider ready"
    );

    let cache: Arc<dyn Cache> = if config.cache.enabled {
        let disk = DiskCacheProvider::open(config.cache.directory.clone()).await?;
        info!(directory = %config.cache.directory.display(), "Using disk tile cache");
        Arc::new(disk)
    } else {
        info!("Tile cache disabled, keeping tiles in memory for this run");
        Arc::new(MemoryCacheProvider::default())
    };

    let fetcher = TileFetcher::with_concurrency_limit(
        Arc::new(provider),
        cache,
        config.mosaic.max_concurrent_fetches,
    );
    Ok(MosaicOrchestrator::new(fetcher, config.run_config()))
}

/// Human-readable byte count.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
