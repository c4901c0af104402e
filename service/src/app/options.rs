//! Application configuration options

use std::time::Duration;

use secrecy::SecretString;

use crate::store::layout::StorageLayout;
use crate::store::settings::Settings;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Service settings, usually read from the settings file
    pub settings: Settings,

    /// Storage layout paths
    pub layout: StorageLayout,

    /// Service token for backend internal endpoints
    pub api_token: SecretString,

    /// Server configuration
    pub server: ServerOptions,

    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            layout: StorageLayout::default(),
            api_token: SecretString::from(String::new()),
            server: ServerOptions::default(),
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
        }
    }
}
