//! Product service (v1)
//!
//! An HTTP service built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ─▶ dispatcher ─▶ handler
//!                     (tower-http    (binding,     │
//!                      layers)        context)     ├─▶ circuit breaker
//!                                                  │     └─▶ retry policy
//!                                                  │           └─▶ downstream client ─▶ Dependency
//!                                                  └─▶ product repository
//!
//!     Cross-cutting: config, observability (tracing + Prometheus), lifecycle
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use product_service::http::HttpServer;
use product_service::lifecycle::signals::spawn_signal_handler;
use product_service::lifecycle::startup::{log_config, resolve_config, StartupOptions};
use product_service::lifecycle::Shutdown;
use product_service::observability::logging::init_logging;
use product_service::observability::tracing::{init_tracer, shutdown_tracer};

#[derive(Debug, Parser)]
#[command(name = "product-service", version, about = "Product HTTP service")]
struct Cli {
    /// Path to a TOML configuration file. Searched for when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Config errors surface through main's Err before logging exists.
    let config = resolve_config(&StartupOptions {
        config_path: cli.config,
        bind_address: cli.bind,
    })?;
    let tracer = init_tracer(&config.observability)?;
    let exporting = tracer.is_some();
    init_logging(&config.observability, tracer);

    tracing::info!("product-service v{} starting", env!("CARGO_PKG_VERSION"));
    log_config(&config);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config, shutdown)?;
    server.run(listener).await?;

    if exporting {
        shutdown_tracer();
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
