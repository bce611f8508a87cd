use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

use crate::error::ConfigError;

/// Auto-shutdown delay used when `--time` is not given
pub const DEFAULT_EXPIRY_MINUTES: u64 = 15;

/// Ports picked when `--port` is not given
pub const PORT_RANGE: Range<u16> = 8000..9000;

/// Stylesheet embedded in every listing page unless the config file overrides it
pub const DEFAULT_STYLESHEET: &str = include_str!("../assets/style.css");

/// Server configuration, built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Absolute root directory to serve files from
    pub root_dir: PathBuf,
    /// Listening port
    pub port: u16,
    /// Open the default browser once the listener is bound
    pub open_browser: bool,
    /// Delay before the server shuts itself down; zero runs indefinitely
    pub expiry: Duration,
    /// Listing page options
    pub listing: ListingOptions,
}

impl ServerConfig {
    /// Configuration for serving `root_dir` with defaults everywhere else.
    pub fn new(root_dir: PathBuf, port: u16) -> Self {
        Self {
            root_dir,
            port,
            open_browser: false,
            expiry: Duration::ZERO,
            listing: ListingOptions::default(),
        }
    }
}

/// Options controlling what the listing page embeds
#[derive(Debug, Clone)]
pub struct ListingOptions {
    /// Embed a QR code of the current directory URL
    pub show_qrcode: bool,
    /// Embed the hover preview frame
    pub preview: bool,
    /// CSS inlined into every listing page
    pub stylesheet: String,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            show_qrcode: true,
            preview: true,
            stylesheet: DEFAULT_STYLESHEET.to_string(),
        }
    }
}

impl ListingOptions {
    /// Build listing options from the config file, reading a custom stylesheet if one is set.
    pub fn from_file_config(file: &FileConfig) -> Result<Self, ConfigError> {
        let stylesheet = match &file.stylesheet {
            Some(path) => read_to_string(path)?,
            None => DEFAULT_STYLESHEET.to_string(),
        };

        Ok(Self {
            show_qrcode: file.qrcode,
            preview: file.preview,
            stylesheet,
        })
    }
}

/// Optional TOML configuration file
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    /// Show a QR code of the current URL on listing pages
    #[serde(default = "default_true")]
    pub qrcode: bool,

    /// Enable the hover preview frame on listing pages
    #[serde(default = "default_true")]
    pub preview: bool,

    /// Stylesheet replacing the built-in one
    #[serde(default)]
    pub stylesheet: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            qrcode: true,
            preview: true,
            stylesheet: None,
        }
    }
}

impl FileConfig {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

fn read_to_string(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })
}

/// Pick the folder to serve: `--source`, then the positional argument, then the current directory.
pub fn resolve_root(source: Option<PathBuf>, positional: Option<PathBuf>) -> PathBuf {
    source
        .or(positional)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Use the requested port, or a random one in [`PORT_RANGE`].
pub fn resolve_port(requested: Option<u16>) -> u16 {
    requested.unwrap_or_else(|| rand::rng().random_range(PORT_RANGE))
}
