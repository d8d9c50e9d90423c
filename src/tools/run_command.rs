//! Validated admin-command execution.
//!
//! The executor is the only path from a tool call to `run_command` on the
//! database. Control options are stripped from the caller's option bag before
//! validation so they never reach the server, the security policy gates the
//! payload, and oversized results are diverted to a temp file.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::db::session::ConnectionManager;
use crate::db::types::{document_to_json, map_to_document};
use crate::error::{CommandError, CommandResult};
use crate::models::{CommandOutcome, SpilledResult, DEFAULT_COMMAND_TIMEOUT_MS, RESULT_SIZE_THRESHOLD};
use crate::tools::result_file;
use crate::tools::validator;

/// Input for the run_command tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RunCommandInput {
    /// Name of the admin command to run (must be on the allowlist)
    pub command: String,
    /// Command options, merged into the payload at the top level. May also
    /// carry control keys: outputToFile, forceOutput, timeout (ms)
    #[serde(default)]
    pub options: Map<String, JsonValue>,
}

/// Output of the run_command tool: the result inline, or a record pointing at
/// the spilled file. Exactly one of the two parts is present. A single struct
/// rather than an enum so the tool's output schema has a root object type, as
/// MCP requires.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RunCommandOutput {
    /// Inline command result; absent when the result was spilled to a file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    /// Spill record; absent when the result is inline. Flattened, so the
    /// record's fields appear at the top level of the output
    #[serde(flatten)]
    pub spilled: Option<SpilledResult>,
}

impl From<CommandOutcome> for RunCommandOutput {
    fn from(outcome: CommandOutcome) -> Self {
        match outcome {
            CommandOutcome::Inline(result) => Self {
                result: Some(result),
                spilled: None,
            },
            CommandOutcome::Spilled(record) => Self {
                result: None,
                spilled: Some(record),
            },
        }
    }
}

/// Control options interpreted by the server, never forwarded to MongoDB.
#[derive(Debug, Clone, Copy)]
pub struct ControlOptions {
    /// Force the result to a file regardless of size
    pub output_to_file: bool,
    /// Force the result inline regardless of size; wins over output_to_file
    pub force_output: bool,
    /// Per-command timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ControlOptions {
    fn default() -> Self {
        Self {
            output_to_file: false,
            force_output: false,
            timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
        }
    }
}

/// Strip control keys out of the option bag, returning their values.
///
/// Runs before validation, so control keys are invisible to both the policy
/// checks and the database. Unrecognized value types fall back to defaults.
pub fn extract_control_options(options: &mut Map<String, JsonValue>) -> ControlOptions {
    let output_to_file = options
        .remove("outputToFile")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let force_output = options
        .remove("forceOutput")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let timeout_ms = options
        .remove("timeout")
        .and_then(|v| v.as_u64())
        .unwrap_or(DEFAULT_COMMAND_TIMEOUT_MS);

    ControlOptions {
        output_to_file,
        force_output,
        timeout_ms,
    }
}

/// Decide whether a serialized result goes to a file or inline.
pub fn should_spill(serialized_len: usize, control: &ControlOptions) -> bool {
    if control.force_output {
        return false;
    }
    serialized_len > RESULT_SIZE_THRESHOLD || control.output_to_file
}

/// Race a command future against the configured timeout.
///
/// On expiry the wait is abandoned and the caller gets a `Timeout` error; the
/// server-side operation is not cancelled.
pub async fn with_timeout<T, F>(timeout_ms: u64, fut: F) -> CommandResult<T>
where
    F: Future<Output = CommandResult<T>>,
{
    match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
        Ok(result) => result,
        Err(_) => Err(CommandError::timeout(timeout_ms)),
    }
}

/// Runs validated admin commands against the shared connection.
pub struct CommandExecutor {
    session: Arc<ConnectionManager>,
}

impl CommandExecutor {
    pub fn new(session: Arc<ConnectionManager>) -> Self {
        Self { session }
    }

    /// Execute an admin command end to end: strip control options, validate,
    /// run with a timeout, then route the result inline or to a temp file.
    pub async fn run(
        &self,
        command: &str,
        mut options: Map<String, JsonValue>,
    ) -> CommandResult<CommandOutcome> {
        let control = extract_control_options(&mut options);

        validator::validate(command, &options)?;
        let payload = validator::build_command_payload(command, &options)?;
        let payload_doc = map_to_document(&payload)?;

        let db = self.session.require_database().await?;
        debug!(command, timeout_ms = control.timeout_ms, "Executing command");

        let reply = with_timeout(control.timeout_ms, async {
            db.run_command(payload_doc).await.map_err(CommandError::from)
        })
        .await?;

        let result = document_to_json(reply);
        let serialized = serde_json::to_string(&result).map_err(|e| {
            CommandError::execution(format!("Failed to serialize command result: {}", e))
        })?;

        if should_spill(serialized.len(), &control) {
            info!(command, size = serialized.len(), "Result routed to temp file");
            let record = result_file::spill(&result).await?;
            Ok(CommandOutcome::Spilled(record))
        } else {
            Ok(CommandOutcome::Inline(result))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: JsonValue) -> Map<String, JsonValue> {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    // =========================================================================
    // Control option extraction
    // =========================================================================

    #[test]
    fn test_defaults_when_absent() {
        let mut opts = Map::new();
        let control = extract_control_options(&mut opts);
        assert!(!control.output_to_file);
        assert!(!control.force_output);
        assert_eq!(control.timeout_ms, DEFAULT_COMMAND_TIMEOUT_MS);
    }

    #[test]
    fn test_control_keys_are_stripped() {
        let mut opts = options(json!({
            "outputToFile": true,
            "forceOutput": true,
            "timeout": 5000,
            "scale": 1024
        }));
        let control = extract_control_options(&mut opts);
        assert!(control.output_to_file);
        assert!(control.force_output);
        assert_eq!(control.timeout_ms, 5000);
        // Only the real command option survives
        assert_eq!(opts.len(), 1);
        assert_eq!(opts["scale"], 1024);
    }

    #[test]
    fn test_wrong_typed_control_values_fall_back() {
        let mut opts = options(json!({
            "outputToFile": "yes",
            "timeout": "soon"
        }));
        let control = extract_control_options(&mut opts);
        assert!(!control.output_to_file);
        assert_eq!(control.timeout_ms, DEFAULT_COMMAND_TIMEOUT_MS);
        // Stripped even when mistyped
        assert!(opts.is_empty());
    }

    // =========================================================================
    // Spill decision
    // =========================================================================

    #[test]
    fn test_small_result_stays_inline() {
        assert!(!should_spill(10, &ControlOptions::default()));
    }

    #[test]
    fn test_oversized_result_spills() {
        assert!(should_spill(RESULT_SIZE_THRESHOLD + 1, &ControlOptions::default()));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert!(!should_spill(RESULT_SIZE_THRESHOLD, &ControlOptions::default()));
    }

    #[test]
    fn test_output_to_file_forces_spill_of_small_result() {
        let control = ControlOptions {
            output_to_file: true,
            ..ControlOptions::default()
        };
        assert!(should_spill(10, &control));
    }

    #[test]
    fn test_force_output_wins_over_size_and_file_request() {
        let control = ControlOptions {
            output_to_file: true,
            force_output: true,
            ..ControlOptions::default()
        };
        assert!(!should_spill(RESULT_SIZE_THRESHOLD * 2, &control));
    }

    // =========================================================================
    // Output shape
    // =========================================================================

    #[test]
    fn test_output_schema_has_root_object_type() {
        // The tool router rejects output schemas without a root object type
        let schema = schemars::schema_for!(RunCommandOutput);
        assert_eq!(schema.as_value()["type"], "object");
    }

    #[test]
    fn test_inline_output_serializes_result_only() {
        let output = RunCommandOutput::from(CommandOutcome::Inline(json!({ "ok": 1 })));
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["result"]["ok"], 1);
        assert!(value.get("filePath").is_none());
    }

    #[test]
    fn test_spilled_output_flattens_record_fields() {
        let record = crate::models::SpilledResult {
            file_path: "/tmp/mcp-result-x.json".to_string(),
            size: 9,
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            notice: "saved".to_string(),
        };
        let output = RunCommandOutput::from(CommandOutcome::Spilled(record));
        let value = serde_json::to_value(&output).unwrap();
        // Spill fields sit at the top level, no wrapper key
        assert_eq!(value["filePath"], "/tmp/mcp-result-x.json");
        assert_eq!(value["size"], 9);
        assert!(value.get("spilled").is_none());
        assert!(value.get("result").is_none());
    }

    // =========================================================================
    // Timeout race
    // =========================================================================

    #[tokio::test]
    async fn test_with_timeout_passes_through_success() {
        let result = with_timeout(1000, async { Ok::<_, CommandError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_with_timeout_expires_on_pending_future() {
        let result: CommandResult<()> =
            with_timeout(10, std::future::pending::<CommandResult<()>>()).await;
        match result.unwrap_err() {
            CommandError::Timeout { timeout_ms } => assert_eq!(timeout_ms, 10),
            other => panic!("expected Timeout, got {:?}", other),
        }
    }

    // =========================================================================
    // Executor policy path (no live database needed)
    // =========================================================================

    #[tokio::test]
    async fn test_disallowed_command_rejected_before_connection_check() {
        let executor = CommandExecutor::new(Arc::new(ConnectionManager::new("test")));
        let err = executor.run("dropDatabase", Map::new()).await.unwrap_err();
        assert!(matches!(err, CommandError::CommandNotAllowed { .. }));
    }

    #[tokio::test]
    async fn test_allowed_command_fails_on_missing_connection() {
        let executor = CommandExecutor::new(Arc::new(ConnectionManager::new("test")));
        let err = executor.run("ping", Map::new()).await.unwrap_err();
        assert!(matches!(err, CommandError::Connection { .. }));
    }

    #[tokio::test]
    async fn test_control_options_do_not_trip_validation() {
        // forceOutput is not a command name or dangerous operator, but prove
        // it is stripped before validation rather than merged into the payload
        let executor = CommandExecutor::new(Arc::new(ConnectionManager::new("test")));
        let opts = options(json!({ "outputToFile": true, "$where": "1" }));
        let err = executor.run("ping", opts).await.unwrap_err();
        // The dangerous operator is still caught; the control key is gone
        assert!(matches!(err, CommandError::DangerousOperation { .. }));
    }
}
