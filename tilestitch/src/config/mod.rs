//! Configuration file handling.
//!
//! The batch is described by an INI file (by default
//! `~/.tilestitch/config.ini`):
//!
//! ```ini
//! [provider]
//! type = arcgis
//!
//! [mosaic]
//! zoom = 18
//! expand = true
//!
//! [area:downtown_la]
//! bbox = -118.2537, 34.0422, -118.2437, 34.0522
//! ```
//!
//! [`ConfigFile`] holds the parsed settings with defaults for every key
//! and converts them into the typed configs the library consumes.

mod file;
mod parser;
mod settings;

pub use file::{config_directory, config_file_path, default_cache_directory, ConfigFileError};
pub use settings::{
    CacheSettings, ConfigFile, MosaicSettings, OutputSettings, ProviderSettings,
    DEFAULT_HTTP_TIMEOUT_SECS, GOOGLE_API_KEY_ENV,
};
