// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Main entry point for the whoami service

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};

use whoami_service::api::AppState;
use whoami_service::config::Config;
use whoami_service::identity::IdentityResolver;
use whoami_service::server;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default)
    Serve {
        /// Listen host, overrides WHOAMI_HOST
        #[arg(long)]
        host: Option<String>,

        /// Listen port, overrides WHOAMI_PORT
        #[arg(long)]
        port: Option<u16>,
    },

    /// Resolve the current identity once, print it as JSON and exit
    Resolve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    });

    // Config comes first so logging can honour LOG_LEVEL / LOG_FORMAT
    match command {
        Command::Serve { host, port } => {
            let mut config = Config::from_env().context("Configuration error")?;
            if let Some(host) = host {
                config.bind_address = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            config.validate().context("Configuration error")?;

            init_tracing(&config)?;
            serve(config).await
        }
        Command::Resolve => {
            let config = Config::resolve_only_from_env().context("Configuration error")?;

            init_tracing(&config)?;
            resolve(config).await
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!(
        service = %config.service_name,
        bind_address = %config.bind_address,
        port = config.port,
        "Starting whoami service"
    );

    let app_state = AppState::from_config(config.clone());
    let handle = server::start(&config, app_state)
        .await
        .context("Failed to start HTTP server")?;
    let stopped = handle.shutdown_token();

    tokio::select! {
        _ = shutdown_signal() => {}
        _ = stopped.cancelled() => {
            warn!("Serve loop ended without a shutdown request");
        }
    }

    handle.stop().await.context("Server shutdown failed")?;
    Ok(())
}

async fn resolve(config: Config) -> anyhow::Result<()> {
    let identity = IdentityResolver::from_config(&config).resolve().await;
    println!("{}", serde_json::to_string_pretty(&identity)?);
    Ok(())
}

/// Initialize tracing subscriber based on configuration
///
/// Logs go to stderr so `resolve` output on stdout stays machine-readable.
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    // RUST_LOG wins over LOG_LEVEL when set
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let result = if config.log_format == "json" {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };

    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            info!("SIGTERM received, starting graceful shutdown");
        },
    }
}
