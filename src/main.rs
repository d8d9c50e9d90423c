//! Mongo MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools for AI assistants
//! to inspect and query a live MongoDB database.

use clap::Parser;
use mongo_mcp_server::config::{Config, TransportMode};
use mongo_mcp_server::db::ConnectionManager;
use mongo_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!(
        transport = %config.transport,
        "Starting Mongo MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Create the shared connection manager (disconnected until connect runs)
    let session = Arc::new(ConnectionManager::new(config.database.clone()));

    // Connect at startup when a full URI is configured. Failure is not fatal:
    // the connect tool can establish a connection later.
    if let Some(uri) = &config.uri {
        info!("Connecting to MongoDB from configured URI");
        if !session.connect(uri).await {
            warn!("Startup connection failed; the server starts disconnected");
        }
    }

    let defaults = config.connect_defaults();

    // Run the appropriate transport
    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            let transport = StdioTransport::new(session, defaults);
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                session,
                defaults,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
