//! Data models for the Mongo MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod command;

pub use command::{
    ChunkResult, CommandOutcome, SpilledResult, DEFAULT_CHUNK_LENGTH, DEFAULT_COMMAND_TIMEOUT_MS,
    DEFAULT_QUERY_LIMIT, RESULT_SIZE_THRESHOLD, SYSTEM_COLLECTION_PREFIX,
};
