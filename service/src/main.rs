//! Pagepilot Deploy - Entry Point
//!
//! Publishes pages to CDN-backed static hosting and tracks each
//! page's deployment lifecycle for the Pagepilot backend.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use pagepilot_deploy::app::options::{AppOptions, ServerOptions};
use pagepilot_deploy::app::run::run;
use pagepilot_deploy::filesys::file::File;
use pagepilot_deploy::logs::{init_logging, LogOptions};
use pagepilot_deploy::store::layout::StorageLayout;
use pagepilot_deploy::store::settings::Settings;
use pagepilot_deploy::utils::version_info;

use secrecy::SecretString;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        println!("{}", serde_json::to_string_pretty(&version).unwrap());
        return;
    }

    // Resolve the data directory: flag first, then environment, then default
    let layout = match cli_args.get("data-dir") {
        Some(dir) => StorageLayout::new(PathBuf::from(dir)),
        None => match env::var("PAGEPILOT_DATA_DIR") {
            Ok(dir) => StorageLayout::new(PathBuf::from(dir)),
            Err(_) => StorageLayout::default(),
        },
    };

    // Retrieve the settings file. An explicitly named config must exist;
    // the default location falls back to defaults when absent.
    let settings = match cli_args.get("config") {
        Some(path) => {
            let file = File::new(PathBuf::from(path));
            match file.read_json::<Settings>().await {
                Ok(settings) => settings,
                Err(e) => {
                    error!("Unable to read settings file {}: {}", path, e);
                    return;
                }
            }
        }
        None => {
            let settings_file = layout.settings_file();
            if settings_file.exists().await {
                match settings_file.read_json::<Settings>().await {
                    Ok(settings) => settings,
                    Err(e) => {
                        error!("Unable to read settings file: {}", e);
                        return;
                    }
                }
            } else {
                Settings::default()
            }
        }
    };

    // Refuse to start with an inconsistent configuration
    if let Err(e) = settings.validate() {
        error!("Invalid settings: {}", e);
        return;
    }

    // Validate configuration and exit
    if cli_args.contains_key("check-config") {
        println!("Configuration OK");
        return;
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        json_format: settings.log_json,
        log_dir: settings
            .log_to_file
            .then(|| layout.logs_dir().path().to_path_buf()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    // Run the server
    let options = AppOptions {
        api_token: SecretString::from(settings.backend.api_token.clone()),
        server: ServerOptions {
            host: settings.server.host.clone(),
            port: settings.server.port,
        },
        layout,
        settings,
        ..Default::default()
    };

    info!(
        "Running Pagepilot deploy service on {}:{}",
        options.server.host, options.server.port
    );
    let result = run(options, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Failed to run the service: {e}");
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).unwrap();
        let mut sigint = signal(SignalKind::interrupt()).unwrap();

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Ctrl+C received, shutting down...");
    }
}
