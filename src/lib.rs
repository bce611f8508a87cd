//! Local network folder sharing.
//!
//! This crate serves a directory over HTTP with generated listing pages, inline text
//! and preview responses, forced downloads and range-capable static file serving.
//! It can be used as a standalone binary or embedded in another application.

pub mod config;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod listing;
pub mod network;
pub mod qr;
pub mod routes;

use std::path::Path;
use std::sync::Arc;

pub use config::{ListingOptions, ServerConfig};
pub use error::{ConfigError, ServeError};
pub use routes::app;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Immutable server configuration
    pub config: Arc<ServerConfig>,
    /// Absolute base URL shown to users, e.g. `http://192.168.1.20:8412/`
    pub public_url: Arc<str>,
}

impl AppState {
    /// Create a new AppState from a finished configuration and the advertised URL.
    pub fn new(config: ServerConfig, public_url: impl Into<Arc<str>>) -> Self {
        Self {
            config: Arc::new(config),
            public_url: public_url.into(),
        }
    }

    /// Root directory to serve files from
    pub fn root_dir(&self) -> &Path {
        &self.config.root_dir
    }
}
