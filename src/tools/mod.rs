//! MCP tool implementations.
//!
//! This module contains all tool handlers:
//! - `connection`: connect/disconnect lifecycle and URL construction
//! - `validator`: command allowlist and security policy checks
//! - `run_command`: validated admin-command execution with spill support
//! - `query`: find and aggregate over user collections
//! - `result_file`: temp-file spilling and chunked reads

pub mod connection;
pub mod query;
pub mod result_file;
pub mod run_command;
pub mod validator;

pub use connection::{
    build_connection_url, ConnectInput, ConnectOutput, ConnectionToolHandler, DisconnectOutput,
};
pub use query::{ensure_user_collection, AggregateInput, QueryInput, QueryOutput, QueryToolHandler};
pub use result_file::{read_chunk, sanitize_result_path, spill, ReadChunkInput};
pub use run_command::{
    extract_control_options, CommandExecutor, ControlOptions, RunCommandInput, RunCommandOutput,
};
