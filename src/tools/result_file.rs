//! Temp-file spilling and chunked reads of oversized results.
//!
//! Oversized command results are written to uniquely-named files under the
//! system temp directory and read back in bounded byte ranges. The read path
//! is security-critical: the caller-supplied path is reduced to its bare
//! filename and re-rooted under the temp directory, so traversal sequences
//! and absolute paths can never escape it.

use chrono::{SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

use crate::error::{CommandError, CommandResult};
use crate::models::{ChunkResult, SpilledResult, DEFAULT_CHUNK_LENGTH};

/// Input for the read_command_result tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadChunkInput {
    /// Path (or bare filename) of a spilled result file. Only the filename is
    /// used; the file is looked up under the server's temp directory.
    pub file_path: String,
    /// Byte offset to start reading from. Default: 0
    #[serde(default)]
    pub offset: Option<u64>,
    /// Maximum number of bytes to read. Default: 50000
    #[serde(default)]
    pub length: Option<u64>,
}

/// Build the spill file path for a timestamp: colons and periods are replaced
/// with dashes to stay filesystem-safe while remaining sortable.
pub fn spill_path_for(timestamp: &str) -> PathBuf {
    let safe = timestamp.replace([':', '.'], "-");
    std::env::temp_dir().join(format!("mcp-result-{}.json", safe))
}

/// Write an oversized result to a uniquely-named temp file.
///
/// Returns a record with the file's location and final size. The file is
/// never deleted by the server; cleanup belongs to the caller or the OS.
pub async fn spill(data: &JsonValue) -> CommandResult<SpilledResult> {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let path = spill_path_for(&timestamp);

    let pretty = serde_json::to_string_pretty(data)
        .map_err(|e| CommandError::file_operation(format!("Failed to serialize result: {}", e)))?;

    fs::write(&path, &pretty).await.map_err(|e| {
        CommandError::file_operation(format!("Failed to write {}: {}", path.display(), e))
    })?;

    let size = fs::metadata(&path)
        .await
        .map_err(|e| {
            CommandError::file_operation(format!("Failed to stat {}: {}", path.display(), e))
        })?
        .len();

    debug!(path = %path.display(), size, "Spilled result to temp file");

    let file_path = path.to_string_lossy().into_owned();
    Ok(SpilledResult {
        notice: format!(
            "Result ({} bytes) was saved to {}. Use read_command_result to retrieve it in chunks.",
            size, file_path
        ),
        file_path,
        size,
        timestamp,
    })
}

/// Reduce a caller-supplied path to a bare filename rooted under the temp
/// directory. `../../etc/passwd` becomes `<tempdir>/passwd`; only files the
/// server itself could have written are reachable, by name only.
pub fn sanitize_result_path(path: &str) -> CommandResult<PathBuf> {
    let file_name = Path::new(path)
        .file_name()
        .ok_or_else(|| CommandError::file_operation("Path does not contain a file name"))?;
    Ok(std::env::temp_dir().join(file_name))
}

/// Read a bounded byte range of a spilled result file.
///
/// Stateless: each call re-opens and re-stats the file, so `has_more` is
/// consistent with the file's current size even if it changed between reads.
pub async fn read_chunk(path: &str, offset: u64, length: u64) -> CommandResult<ChunkResult> {
    let full_path = sanitize_result_path(path)?;

    let mut file = fs::File::open(&full_path).await.map_err(|e| {
        CommandError::file_operation(format!("Failed to open {}: {}", full_path.display(), e))
    })?;
    let total_size = file
        .metadata()
        .await
        .map_err(|e| {
            CommandError::file_operation(format!(
                "Failed to stat {}: {}",
                full_path.display(),
                e
            ))
        })?
        .len();

    file.seek(SeekFrom::Start(offset)).await.map_err(|e| {
        CommandError::file_operation(format!("Failed to seek to offset {}: {}", offset, e))
    })?;

    let mut buf = Vec::new();
    file.take(length).read_to_end(&mut buf).await.map_err(|e| {
        CommandError::file_operation(format!("Failed to read {}: {}", full_path.display(), e))
    })?;

    let bytes_read = buf.len() as u64;
    Ok(ChunkResult {
        chunk: String::from_utf8_lossy(&buf).into_owned(),
        offset,
        length: bytes_read,
        total_size,
        has_more: offset + bytes_read < total_size,
    })
}

/// Read a chunk with the default length when the caller omits parameters.
pub async fn read_chunk_with_defaults(input: &ReadChunkInput) -> CommandResult<ChunkResult> {
    read_chunk(
        &input.file_path,
        input.offset.unwrap_or(0),
        input.length.unwrap_or(DEFAULT_CHUNK_LENGTH),
    )
    .await
}
