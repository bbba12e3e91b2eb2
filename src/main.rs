//! Fetch-on-miss static mirror.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ mirror::path (normalize)
//!                                          │
//!                                          ▼
//!                                   mirror::resolver ──hit──▶ http::response
//!                                          │ miss              (serve | 307)
//!                                          ▼                        ▲
//!                                   mirror::fetcher ────────────────┘
//!                                    (single-flight,
//!                                     temp + rename)
//!                                          │
//!                                          ▼
//!                                   upstream origin
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use mirror_proxy::config::{self, ConfigError, MirrorConfig};
use mirror_proxy::http::HttpServer;
use mirror_proxy::lifecycle::{signals, startup, Shutdown};
use mirror_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "mirror-proxy")]
#[command(about = "Serve a site from a local mirror, fetching missing files from the origin once", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override `mirror.root`.
    #[arg(short, long)]
    root: Option<String>,

    /// Override `upstream.origin`.
    #[arg(short, long)]
    origin: Option<String>,

    /// Override `observability.log_level`.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<MirrorConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => config::read_config(path)?,
            None => MirrorConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(root) = self.root {
            config.mirror.root = root;
        }
        if let Some(origin) = self.origin {
            config.upstream.origin = origin;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }

        config::validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init(&config.observability.log_level);
    tracing::info!("mirror-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        origin = %config.upstream.origin,
        root = %config.mirror.root,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Address already validated.
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let engine = startup::build_engine(&config).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::install(shutdown.clone());

    let server = HttpServer::new(config, engine);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
