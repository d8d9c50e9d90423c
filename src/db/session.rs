//! Single-session connection lifecycle management.
//!
//! The server holds at most one live MongoDB client at a time, shared across
//! all tool calls for the session. Connect replaces any existing client
//! rather than adding a second one; disconnect is idempotent.

use mongodb::options::{ClientOptions, ServerApi, ServerApiVersion};
use mongodb::{bson::doc, Client, Database};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{CommandError, CommandResult};

/// Lifecycle: init (disconnected) -> connect -> connected -> disconnect.
///
/// Passed by `Arc` into the executor and MCP service rather than living in a
/// module-level global.
pub struct ConnectionManager {
    client: RwLock<Option<Client>>,
    /// Default database targeted by tools when the caller does not override it
    database_name: RwLock<String>,
}

impl ConnectionManager {
    /// Create a disconnected manager targeting the given default database.
    pub fn new(default_database: impl Into<String>) -> Self {
        Self {
            client: RwLock::new(None),
            database_name: RwLock::new(default_database.into()),
        }
    }

    /// Connect to MongoDB at the given URL.
    ///
    /// Any existing connection is closed first; errors from closing the stale
    /// handle are logged and otherwise ignored. Returns true on success and
    /// false on any failure, leaving the state disconnected. Never errors;
    /// callers must check the return value.
    pub async fn connect(&self, url: &str) -> bool {
        if let Some(stale) = self.client.write().await.take() {
            info!("Closing existing connection before reconnecting");
            stale.shutdown().await;
        }

        match Self::open(url).await {
            Ok(client) => {
                *self.client.write().await = Some(client);
                info!("Connected to MongoDB");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to connect to MongoDB");
                false
            }
        }
    }

    /// Open and verify a new client with strict Stable API negotiation.
    async fn open(url: &str) -> CommandResult<Client> {
        let mut options = ClientOptions::parse(url)
            .await
            .map_err(|e| CommandError::connection(format!("Invalid connection string: {}", e)))?;
        options.server_api = Some(
            ServerApi::builder()
                .version(ServerApiVersion::V1)
                .strict(true)
                .build(),
        );

        let client = Client::with_options(options)
            .map_err(|e| CommandError::connection(format!("Failed to create client: {}", e)))?;

        // The driver connects lazily; ping to verify the server is reachable
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| CommandError::connection(format!("Ping failed: {}", e)))?;

        Ok(client)
    }

    /// Disconnect if connected. Returns true if a client was shut down,
    /// false if already disconnected (idempotent, not an error).
    pub async fn disconnect(&self) -> bool {
        match self.client.write().await.take() {
            Some(client) => {
                client.shutdown().await;
                info!("Disconnected from MongoDB");
                true
            }
            None => false,
        }
    }

    /// Check whether a live connection exists.
    pub async fn is_connected(&self) -> bool {
        self.client.read().await.is_some()
    }

    /// Get a clone of the live client handle, if connected.
    pub async fn client(&self) -> Option<Client> {
        self.client.read().await.clone()
    }

    /// Get a handle to the default database, if connected.
    pub async fn database(&self) -> Option<Database> {
        let name = self.database_name.read().await.clone();
        self.client
            .read()
            .await
            .as_ref()
            .map(|client| client.database(&name))
    }

    /// Get the default database, failing with a connection error when
    /// disconnected. Convenience for tool handlers.
    pub async fn require_database(&self) -> CommandResult<Database> {
        self.database().await.ok_or_else(CommandError::not_connected)
    }

    /// Get the default database name.
    pub async fn database_name(&self) -> String {
        self.database_name.read().await.clone()
    }

    /// Set the default database name used by subsequent tool calls.
    pub async fn set_database_name(&self, name: impl Into<String>) {
        *self.database_name.write().await = name.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_starts_disconnected() {
        let manager = ConnectionManager::new("test");
        assert!(!manager.is_connected().await);
        assert!(manager.client().await.is_none());
        assert!(manager.database().await.is_none());
    }

    #[tokio::test]
    async fn test_disconnect_when_disconnected_returns_false() {
        let manager = ConnectionManager::new("test");
        assert!(!manager.disconnect().await);
        // Still false on repeat
        assert!(!manager.disconnect().await);
    }

    #[tokio::test]
    async fn test_require_database_fails_when_disconnected() {
        let manager = ConnectionManager::new("test");
        let err = manager.require_database().await.unwrap_err();
        assert!(matches!(err, CommandError::Connection { .. }));
    }

    #[tokio::test]
    async fn test_default_database_name() {
        let manager = ConnectionManager::new("inventory");
        assert_eq!(manager.database_name().await, "inventory");
        manager.set_database_name("analytics").await;
        assert_eq!(manager.database_name().await, "analytics");
    }

    #[tokio::test]
    async fn test_connect_with_invalid_url_returns_false() {
        let manager = ConnectionManager::new("test");
        assert!(!manager.connect("not a url").await);
        assert!(!manager.is_connected().await);
    }
}
