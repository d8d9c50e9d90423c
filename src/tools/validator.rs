//! Command validation policy for the run_command tool.
//!
//! Three layered checks gate every admin command before it reaches the
//! database: an allowlist of command names, a structural-injection check on
//! the synthetic payload, and a scan for dangerous operator tokens. The
//! operator scan is a deliberate string-containment heuristic over the
//! serialized payload, not a semantic parser: it may reject a safe input that
//! happens to contain a token as a JSON key, and it does not catch a token
//! appearing only inside a value string. That boundary is intentional.

use crate::error::{CommandError, CommandResult};
use serde_json::{Map, Value as JsonValue};

/// Admin commands callers are permitted to execute. Everything else is
/// rejected before reaching the database.
pub const ALLOWED_COMMANDS: &[&str] = &[
    "buildInfo",
    "collStats",
    "connectionStatus",
    "dbStats",
    "hello",
    "hostInfo",
    "listCommands",
    "ping",
    "serverStatus",
    "whatsmyuri",
];

/// High-risk operator tokens: server-side code execution and aggregation
/// stages that redirect output or reach across collections.
pub const DANGEROUS_OPERATORS: &[&str] = &[
    "$where",
    "$function",
    "$accumulator",
    "$out",
    "$merge",
    "$lookup",
    "$graphLookup",
    "$unionWith",
];

/// Build the top-level payload that will be sent to the database for the
/// given command and option bag.
///
/// `collStats` is special-cased: its value is the target collection name,
/// drawn from `options.collection` (falling back to `options.collStats`), and
/// both source keys are consumed. Every other command maps to the literal
/// `1`. All remaining options merge in at the top level.
///
/// The executor uses this same function to build the outgoing command, so
/// validation and execution can never drift apart.
pub fn build_command_payload(
    command: &str,
    options: &Map<String, JsonValue>,
) -> CommandResult<Map<String, JsonValue>> {
    let mut payload = Map::new();

    if command == "collStats" {
        let target = options
            .get("collection")
            .or_else(|| options.get("collStats"))
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                CommandError::invalid_structure(
                    "collStats requires a collection name in the 'collection' option",
                )
            })?;
        payload.insert(command.to_string(), JsonValue::String(target.to_string()));
        for (key, value) in options {
            if key != "collection" && key != "collStats" {
                payload.insert(key.clone(), value.clone());
            }
        }
    } else {
        payload.insert(command.to_string(), JsonValue::from(1));
        for (key, value) in options {
            if key != command {
                payload.insert(key.clone(), value.clone());
            }
        }
    }

    Ok(payload)
}

/// Validate a command name and option bag against the security policy.
///
/// Passes silently or fails with a typed error:
/// - `CommandNotAllowed` when the name is outside [`ALLOWED_COMMANDS`]
/// - `InvalidCommandStructure` when the options smuggle a second allowed
///   command name at the top level (e.g. `{dbStats: 1, collStats: "x"}`)
/// - `DangerousOperation` when any [`DANGEROUS_OPERATORS`] token appears as a
///   JSON key anywhere in the serialized payload, at any nesting depth
pub fn validate(command: &str, options: &Map<String, JsonValue>) -> CommandResult<()> {
    if !ALLOWED_COMMANDS.contains(&command) {
        return Err(CommandError::command_not_allowed(command, ALLOWED_COMMANDS));
    }

    let payload = build_command_payload(command, options)?;

    for key in payload.keys() {
        if key != command && ALLOWED_COMMANDS.contains(&key.as_str()) {
            return Err(CommandError::invalid_structure(format!(
                "option '{}' is itself a command name and cannot appear in the options of '{}'",
                key, command
            )));
        }
    }

    let serialized = serde_json::to_string(&payload)
        .map_err(|e| CommandError::invalid_structure(format!("unserializable options: {}", e)))?;
    for operator in DANGEROUS_OPERATORS {
        // Match key syntax only ("$op":), not occurrences inside value strings
        if serialized.contains(&format!("\"{}\":", operator)) {
            return Err(CommandError::dangerous_operation(*operator));
        }
    }

    Ok(())
}
