//! Domobridge - Entry Point
//!
//! Cloud-side bridge between the assistant's smart home API and DIY MQTT
//! devices synchronized through device shadows.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use tracing::{error, info, warn};

use domobridge::app::options::{AppOptions, ServerOptions, ShadowBackend, StorageOptions};
use domobridge::app::run::run;
use domobridge::app::settings::Settings;
use domobridge::filesys::file::File;
use domobridge::http::auth::AuthOptions;
use domobridge::http::gateway::GatewayOptions;
use domobridge::http::shadow::ShadowOptions;
use domobridge::logs::{init_logging, LogOptions};
use domobridge::mqtt::client::{MqttAddress, MqttCredentials};
use domobridge::shadow::synchronizer::ReportWindows;
use domobridge::utils::version_info;
use domobridge::workers::events;

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

    // Retrieve the settings file
    let settings_path = cli_args
        .get("settings")
        .cloned()
        .unwrap_or_else(|| "settings.json".to_string());
    let settings_file = File::new(&settings_path);
    let settings = if settings_file.exists().await {
        match settings_file.read_json::<Settings>().await {
            Ok(settings) => settings,
            Err(e) => {
                error!("Unable to read settings file {}: {}", settings_path, e);
                return;
            }
        }
    } else {
        Settings::default()
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    if settings.auth.client_id.is_empty() {
        warn!("OAuth client_id is not configured; account linking and refresh will fail");
    }

    // Run the bridge
    let options = options_from(&settings);
    info!("Running Domobridge v{}", version.version);
    let result = run(options, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Failed to run the bridge: {e}");
    }
}

fn options_from(settings: &Settings) -> AppOptions {
    AppOptions {
        enable_socket_server: settings.enable_socket_server,
        enable_event_worker: settings.enable_event_worker,
        server: ServerOptions {
            host: settings.server.host.clone(),
            port: settings.server.port,
        },
        event_worker: events::Options {
            broker_address: MqttAddress {
                host: settings.mqtt_broker.host.clone(),
                port: settings.mqtt_broker.port,
                use_tls: settings.mqtt_broker.tls,
                ca_cert_path: settings.mqtt_broker.ca_cert_path.clone(),
            },
            credentials: settings.mqtt_broker.username.clone().map(|username| {
                MqttCredentials {
                    username,
                    password: settings.mqtt_broker.password.clone().unwrap_or_default(),
                }
            }),
            ..Default::default()
        },
        auth: AuthOptions {
            token_url: settings.auth.token_url.clone(),
            profile_url: settings.auth.profile_url.clone(),
            client_id: settings.auth.client_id.clone(),
            client_secret: SecretString::from(settings.auth.client_secret.clone()),
        },
        gateway: GatewayOptions {
            events_url: settings.gateway.events_url.clone(),
        },
        shadow: if settings.shadow.in_memory {
            ShadowBackend::Memory
        } else {
            ShadowBackend::Http(ShadowOptions {
                base_url: settings.shadow.base_url.clone(),
            })
        },
        storage: StorageOptions {
            data_dir: settings.storage.data_dir.clone().map(PathBuf::from),
        },
        windows: ReportWindows {
            stale_window: Duration::from_secs(settings.windows.stale_window_secs),
            reachability_window: Duration::from_secs(settings.windows.reachability_window_secs),
        },
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
