//! Error types for the Mongo MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error
//! handling. Each variant carries a stable kind plus a human-readable message;
//! no raw driver stack trace ever reaches the caller.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Command '{command}' is not allowed. Allowed commands: {allowed}")]
    CommandNotAllowed { command: String, allowed: String },

    #[error("Invalid command structure: {message}")]
    InvalidCommandStructure { message: String },

    #[error("Dangerous operation detected: operator '{operator}' is not permitted")]
    DangerousOperation { operator: String },

    #[error("Command execution failed: {message}")]
    Execution {
        message: String,
        /// Original driver message, when the failure wraps a lower-level error
        details: Option<String>,
    },

    #[error("File operation failed: {message}")]
    FileOperation { message: String },

    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Command timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl CommandError {
    /// Create a command-not-allowed error listing the allowed set.
    pub fn command_not_allowed(command: impl Into<String>, allowed: &[&str]) -> Self {
        Self::CommandNotAllowed {
            command: command.into(),
            allowed: allowed.join(", "),
        }
    }

    /// Create an invalid-command-structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidCommandStructure {
            message: message.into(),
        }
    }

    /// Create a dangerous-operation error naming the offending operator.
    pub fn dangerous_operation(operator: impl Into<String>) -> Self {
        Self::DangerousOperation {
            operator: operator.into(),
        }
    }

    /// Create an execution error with no underlying details.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            details: None,
        }
    }

    /// Create an execution error wrapping a lower-level failure.
    pub fn execution_with_details(
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self::Execution {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Create a file operation error.
    pub fn file_operation(message: impl Into<String>) -> Self {
        Self::FileOperation {
            message: message.into(),
        }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a connection error for operations attempted while disconnected.
    pub fn not_connected() -> Self {
        Self::Connection {
            message: "Not connected to MongoDB. Call the connect tool first.".to_string(),
        }
    }

    /// Create a timeout error carrying the configured timeout.
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Check if this error is a policy rejection (validation, not runtime).
    pub fn is_policy(&self) -> bool {
        matches!(
            self,
            Self::CommandNotAllowed { .. }
                | Self::InvalidCommandStructure { .. }
                | Self::DangerousOperation { .. }
        )
    }
}

/// Convert driver errors to CommandError.
///
/// Any mongodb error surfacing from command execution becomes an `Execution`
/// error with the driver message attached as details.
impl From<mongodb::error::Error> for CommandError {
    fn from(err: mongodb::error::Error) -> Self {
        CommandError::execution_with_details("MongoDB driver error", err.to_string())
    }
}

impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        CommandError::file_operation(err.to_string())
    }
}

/// Result type alias for command operations.
pub type CommandResult<T> = Result<T, CommandError>;

/// Convert CommandError to MCP ErrorData for semantic error categorization.
///
/// Policy rejections map to `invalid_params`; runtime failures map to
/// `internal_error`. Timeouts carry the configured timeout in the data object
/// so callers can retry with a larger value.
impl From<CommandError> for rmcp::ErrorData {
    fn from(err: CommandError) -> Self {
        match &err {
            CommandError::CommandNotAllowed { .. }
            | CommandError::InvalidCommandStructure { .. }
            | CommandError::DangerousOperation { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), None)
            }

            CommandError::Timeout { timeout_ms } => rmcp::ErrorData::internal_error(
                err.to_string(),
                Some(serde_json::json!({ "timeout_ms": timeout_ms })),
            ),

            CommandError::Execution { details, .. } => rmcp::ErrorData::internal_error(
                err.to_string(),
                details
                    .as_ref()
                    .map(|d| serde_json::json!({ "details": d })),
            ),

            CommandError::FileOperation { .. } | CommandError::Connection { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CommandError::command_not_allowed("dropDatabase", &["ping", "dbStats"]);
        let msg = err.to_string();
        assert!(msg.contains("dropDatabase"));
        assert!(msg.contains("ping, dbStats"));
    }

    #[test]
    fn test_timeout_display_includes_value() {
        let err = CommandError::timeout(5000);
        assert!(err.to_string().contains("5000"));
    }

    #[test]
    fn test_is_policy() {
        assert!(CommandError::invalid_structure("bad").is_policy());
        assert!(CommandError::dangerous_operation("$where").is_policy());
        assert!(!CommandError::timeout(30000).is_policy());
        assert!(!CommandError::not_connected().is_policy());
    }

    // Tests for From<CommandError> for rmcp::ErrorData

    #[test]
    fn test_policy_errors_map_to_invalid_params() {
        for err in [
            CommandError::command_not_allowed("shutdown", &["ping"]),
            CommandError::invalid_structure("smuggled command"),
            CommandError::dangerous_operation("$out"),
        ] {
            let mcp_err: rmcp::ErrorData = err.into();
            // invalid_params uses -32602
            assert_eq!(mcp_err.code.0, -32602);
        }
    }

    #[test]
    fn test_timeout_maps_to_internal_error_with_data() {
        let err = CommandError::timeout(1234);
        let mcp_err: rmcp::ErrorData = err.into();
        // internal_error uses -32603
        assert_eq!(mcp_err.code.0, -32603);
        let data = mcp_err.data.unwrap();
        assert_eq!(data["timeout_ms"], 1234);
    }

    #[test]
    fn test_execution_details_carried_in_data() {
        let err = CommandError::execution_with_details("failed", "ns not found");
        let mcp_err: rmcp::ErrorData = err.into();
        assert_eq!(mcp_err.code.0, -32603);
        assert_eq!(mcp_err.data.unwrap()["details"], "ns not found");
    }

    #[test]
    fn test_io_error_wraps_as_file_operation() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CommandError = io.into();
        assert!(matches!(err, CommandError::FileOperation { .. }));
    }
}
