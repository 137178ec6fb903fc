//! Parsed configuration and its conversion into library configs.

use std::path::PathBuf;

use crate::area::{Area, GridExpansion};
use crate::cache::DEFAULT_MAX_CONCURRENT_FETCHES;
use crate::mosaic::{
    MosaicConfig, DEFAULT_BLOCK_SIZE, DEFAULT_IN_MEMORY_THRESHOLD_PIXELS,
    DEFAULT_MAX_PARALLEL_BLOCKS, DEFAULT_TILE_SIZE,
};
use crate::orchestrator::{RunConfig, DEFAULT_MAX_TILES, DEFAULT_ZOOM};
use crate::provider::ProviderConfig;

use super::file::{default_cache_directory, ConfigFileError};

/// Environment variable overriding `[provider] google_api_key`.
pub const GOOGLE_API_KEY_ENV: &str = "TILESTITCH_GOOGLE_API_KEY";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// `[provider]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    /// One of arcgis, osm, google, usgs, custom
    pub provider_type: String,
    pub google_api_key: Option<String>,
    pub custom_id: Option<String>,
    pub url_template: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            provider_type: "arcgis".to_string(),
            google_api_key: None,
            custom_id: None,
            url_template: None,
        }
    }
}

/// `[mosaic]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicSettings {
    pub zoom: u8,
    pub tile_size: u32,
    pub expand: bool,
    pub max_tiles: u64,
    pub block_size: u32,
    pub max_concurrent_fetches: usize,
    pub max_parallel_blocks: usize,
    pub in_memory_threshold_pixels: u64,
    pub http_timeout_secs: u64,
}

impl Default for MosaicSettings {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            tile_size: DEFAULT_TILE_SIZE,
            expand: false,
            max_tiles: DEFAULT_MAX_TILES,
            block_size: DEFAULT_BLOCK_SIZE,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            max_parallel_blocks: DEFAULT_MAX_PARALLEL_BLOCKS,
            in_memory_threshold_pixels: DEFAULT_IN_MEMORY_THRESHOLD_PIXELS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub directory: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_cache_directory(),
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub directory: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
        }
    }
}

/// Complete configuration file contents.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub provider: ProviderSettings,
    pub mosaic: MosaicSettings,
    pub cache: CacheSettings,
    pub output: OutputSettings,
    /// `[area:NAME]` sections in file order
    pub areas: Vec<Area>,
}

impl ConfigFile {
    /// Builds the provider configuration.
    ///
    /// `TILESTITCH_GOOGLE_API_KEY`, when set, takes precedence over the
    /// key in the file.
    pub fn provider_config(&self) -> Result<ProviderConfig, ConfigFileError> {
        self.provider_config_with_key_override(std::env::var(GOOGLE_API_KEY_ENV).ok())
    }

    pub(crate) fn provider_config_with_key_override(
        &self,
        env_key: Option<String>,
    ) -> Result<ProviderConfig, ConfigFileError> {
        let invalid = |key: &str, value: &str, reason: &str| ConfigFileError::InvalidValue {
            section: "provider".to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let config = ProviderConfig::from_type_name(&self.provider.provider_type).ok_or_else(|| {
            invalid(
                "type",
                &self.provider.provider_type,
                "must be one of: arcgis, osm, google, usgs, custom",
            )
        })?;

        match config {
            ProviderConfig::Google { .. } => {
                let key = env_key
                    .filter(|k| !k.trim().is_empty())
                    .or_else(|| self.provider.google_api_key.clone())
                    .ok_or_else(|| {
                        invalid(
                            "google_api_key",
                            "",
                            &format!("required for Google (or set {})", GOOGLE_API_KEY_ENV),
                        )
                    })?;
                Ok(ProviderConfig::google(key.trim()))
            }
            ProviderConfig::Custom { .. } => {
                let template = self
                    .provider
                    .url_template
                    .clone()
                    .ok_or_else(|| invalid("url_template", "", "required for custom providers"))?;
                let id = self
                    .provider
                    .custom_id
                    .clone()
                    .unwrap_or_else(|| "custom".to_string());
                Ok(ProviderConfig::custom(id, template))
            }
            other => Ok(other),
        }
    }

    /// Compositor settings from `[mosaic]`.
    pub fn mosaic_config(&self) -> MosaicConfig {
        MosaicConfig {
            tile_size: self.mosaic.tile_size,
            block_size: self.mosaic.block_size,
            max_parallel_blocks: self.mosaic.max_parallel_blocks,
            in_memory_threshold_pixels: self.mosaic.in_memory_threshold_pixels,
        }
    }

    /// Batch settings from `[mosaic]` and `[output]`.
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            zoom: self.mosaic.zoom,
            expansion: GridExpansion::from_flag(self.mosaic.expand),
            max_tiles: self.mosaic.max_tiles,
            output_dir: self.output.directory.clone(),
            mosaic: self.mosaic_config(),
        }
    }
}
