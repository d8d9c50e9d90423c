//! BSON/JSON value conversion.
//!
//! Tool inputs and outputs are JSON; the driver speaks BSON. Conversions in
//! both directions live here so every tool shapes values the same way.
//! Outgoing documents use relaxed extended JSON, which renders ObjectIds and
//! dates as readable strings rather than binary.

use crate::error::{CommandError, CommandResult};
use mongodb::bson::{Bson, Document};
use serde_json::{Map, Value as JsonValue};

/// Convert a JSON object into a BSON document.
///
/// Fails with `InvalidCommandStructure` when the value is not an object or
/// contains something BSON cannot represent (e.g. a non-finite float).
pub fn json_to_document(value: &JsonValue) -> CommandResult<Document> {
    match Bson::try_from(value.clone()) {
        Ok(Bson::Document(doc)) => Ok(doc),
        Ok(_) => Err(CommandError::invalid_structure(
            "expected a JSON object, got a non-object value",
        )),
        Err(e) => Err(CommandError::invalid_structure(format!(
            "value is not representable as BSON: {}",
            e
        ))),
    }
}

/// Convert a JSON object map into a BSON document.
pub fn map_to_document(map: &Map<String, JsonValue>) -> CommandResult<Document> {
    json_to_document(&JsonValue::Object(map.clone()))
}

/// Convert a BSON document into relaxed extended JSON.
pub fn document_to_json(doc: Document) -> JsonValue {
    Bson::Document(doc).into_relaxed_extjson()
}

/// Convert a batch of BSON documents into a JSON array's elements.
pub fn documents_to_json(docs: Vec<Document>) -> Vec<JsonValue> {
    docs.into_iter().map(document_to_json).collect()
}
