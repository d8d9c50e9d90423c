//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.

use crate::config::ConnectDefaults;
use crate::db::ConnectionManager;
use crate::error::{CommandError, CommandResult};
use crate::mcp::MongoService;
use crate::transport::Transport;
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

/// Stdio transport implementation.
///
/// This transport reads JSON-RPC messages from stdin and writes
/// responses to stdout, following the MCP protocol specification.
pub struct StdioTransport {
    session: Arc<ConnectionManager>,
    defaults: ConnectDefaults,
}

impl StdioTransport {
    /// Create a new stdio transport sharing the given connection manager.
    pub fn new(session: Arc<ConnectionManager>, defaults: ConnectDefaults) -> Self {
        Self { session, defaults }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> CommandResult<()> {
        info!("Starting MCP server with stdio transport");

        let service = MongoService::new(self.session.clone(), self.defaults.clone());

        let transport = stdio();
        let running_service = service.serve(transport).await.map_err(|e| {
            CommandError::connection(format!("Failed to start stdio transport: {}", e))
        })?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => {
                        info!("Stdio transport completed normally");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Stdio transport error");
                        return Err(CommandError::connection(format!(
                            "Stdio transport error: {}",
                            e
                        )));
                    }
                }
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            // Spawn a task to listen for second signal and force exit
            tokio::spawn(async {
                wait_for_signal().await;
                tracing::warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        // Close the database connection on shutdown
        info!("Closing MongoDB connection");
        self.session.disconnect().await;

        if shutdown_requested {
            // Force exit since stdio may still be blocking on stdin
            // tokio::select! cannot interrupt blocking stdin reads
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_stdio_transport_creation() {
        let session = Arc::new(ConnectionManager::new("test"));
        let transport = StdioTransport::new(session, Config::default().connect_defaults());
        assert_eq!(transport.name(), "stdio");
    }
}
