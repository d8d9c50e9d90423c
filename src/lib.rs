//! Mongo MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools for AI assistants
//! to inspect and query MongoDB databases: a validated admin-command surface,
//! find/aggregate queries, and chunked retrieval of oversized results.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::CommandError;
pub use mcp::MongoService;
