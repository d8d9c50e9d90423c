//! Command-related data models.
//!
//! Types describing command outcomes: inline results, spilled-result records,
//! and chunked reads of spilled files.

use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Serialized-result size above which a command result is spilled to disk.
pub const RESULT_SIZE_THRESHOLD: usize = 100_000;

/// Default byte length for a single chunked read of a spilled result.
pub const DEFAULT_CHUNK_LENGTH: u64 = 50_000;

/// Default command timeout in milliseconds.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 30_000;

/// Default document limit for the query tool.
pub const DEFAULT_QUERY_LIMIT: i64 = 100;

/// Reserved collection-name prefix that callers may not address.
pub const SYSTEM_COLLECTION_PREFIX: &str = "system.";

/// Record describing a result that was written to a temp file instead of
/// being returned inline. Immutable once created; the file itself is left to
/// caller/OS cleanup of the temp directory.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpilledResult {
    /// Absolute path of the temp file holding the serialized result
    pub file_path: String,
    /// File size in bytes after the write
    pub size: u64,
    /// RFC 3339 timestamp of when the result was written
    pub timestamp: String,
    /// Guidance for retrieving the result via read_command_result
    pub notice: String,
}

/// Result of a single bounded read from a spilled-result file.
///
/// Derived freshly on each call; no cursor state persists between reads, so
/// `has_more` always reflects the file's current size.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChunkResult {
    /// The bytes read, as UTF-8 text
    pub chunk: String,
    /// Byte offset this read started at
    pub offset: u64,
    /// Number of bytes actually read (may be less than requested near EOF)
    pub length: u64,
    /// Total size of the file in bytes
    pub total_size: u64,
    /// True if bytes remain beyond offset + length
    pub has_more: bool,
}

/// Outcome of executing a validated command: either the result inline or a
/// record pointing at the spilled file.
#[derive(Debug, Clone)]
pub enum CommandOutcome {
    Inline(JsonValue),
    Spilled(SpilledResult),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spilled_result_serializes_camel_case() {
        let record = SpilledResult {
            file_path: "/tmp/mcp-result-x.json".to_string(),
            size: 42,
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            notice: "saved".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("filePath").is_some());
        assert!(json.get("file_path").is_none());
    }

    #[test]
    fn test_chunk_result_serializes_camel_case() {
        let chunk = ChunkResult {
            chunk: "abc".to_string(),
            offset: 0,
            length: 3,
            total_size: 10,
            has_more: true,
        };
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["totalSize"], 10);
        assert_eq!(json["hasMore"], true);
    }
}
