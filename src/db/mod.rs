//! Database access layer.
//!
//! This module provides MongoDB access functionality:
//! - Single-session connection lifecycle management
//! - Collection schema inference and index metadata
//! - BSON/JSON value conversion

pub mod schema;
pub mod session;
pub mod types;

pub use schema::{CollectionInspector, CollectionSchema, FieldInfo};
pub use session::ConnectionManager;
pub use types::{document_to_json, documents_to_json, json_to_document};
