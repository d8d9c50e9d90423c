//! Collection schema inference and index metadata.
//!
//! MongoDB has no declared schema, so the resource and prompt surfaces infer
//! one from a sample document: field names paired with the BSON type of the
//! sampled value. Index metadata comes straight from listIndexes.

use futures_util::TryStreamExt;
use mongodb::bson::{Bson, Document};
use mongodb::Database;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::db::types::document_to_json;
use crate::error::{CommandError, CommandResult};
use crate::models::SYSTEM_COLLECTION_PREFIX;

/// A field observed in a sampled document.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FieldInfo {
    pub name: String,
    /// BSON type of the sampled value ("string", "objectId", "document", ...)
    pub bson_type: String,
}

/// Inferred shape of a collection: sampled fields plus index metadata.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CollectionSchema {
    pub collection: String,
    /// Fields of one sampled document; empty when the collection is empty
    pub fields: Vec<FieldInfo>,
    /// Raw index definitions from listIndexes
    pub indexes: Vec<JsonValue>,
}

/// Read-only introspection over the connected database.
pub struct CollectionInspector<'a> {
    db: &'a Database,
}

impl<'a> CollectionInspector<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// List user collections, excluding the reserved system namespace.
    pub async fn list_collections(&self) -> CommandResult<Vec<String>> {
        let mut names = self
            .db
            .list_collection_names()
            .await
            .map_err(CommandError::from)?;
        names.retain(|name| !name.starts_with(SYSTEM_COLLECTION_PREFIX));
        names.sort();
        Ok(names)
    }

    /// Infer the schema of a collection from one sampled document and attach
    /// its index definitions.
    pub async fn inspect(&self, collection: &str) -> CommandResult<CollectionSchema> {
        let coll = self.db.collection::<Document>(collection);

        let fields = match coll.find_one(Document::new()).await? {
            Some(sample) => sample
                .iter()
                .map(|(name, value)| FieldInfo {
                    name: name.clone(),
                    bson_type: bson_type_name(value).to_string(),
                })
                .collect(),
            None => Vec::new(),
        };

        let indexes: Vec<Document> = coll.list_indexes().await?.try_collect().await.map(
            |models: Vec<mongodb::IndexModel>| {
                models
                    .into_iter()
                    .map(|model| {
                        let mut doc = Document::new();
                        doc.insert("key", model.keys);
                        if let Some(options) = model.options {
                            if let Some(name) = options.name {
                                doc.insert("name", name);
                            }
                            if let Some(unique) = options.unique {
                                doc.insert("unique", unique);
                            }
                        }
                        doc
                    })
                    .collect()
            },
        )?;

        Ok(CollectionSchema {
            collection: collection.to_string(),
            fields,
            indexes: indexes.into_iter().map(document_to_json).collect(),
        })
    }

    /// Fetch up to `limit` sample documents.
    pub async fn sample_documents(
        &self,
        collection: &str,
        limit: i64,
    ) -> CommandResult<Vec<Document>> {
        let coll = self.db.collection::<Document>(collection);
        let cursor = coll.find(Document::new()).limit(limit).await?;
        cursor.try_collect().await.map_err(CommandError::from)
    }

    /// Approximate document count from collection metadata.
    pub async fn estimated_count(&self, collection: &str) -> CommandResult<u64> {
        let coll = self.db.collection::<Document>(collection);
        coll.estimated_document_count()
            .await
            .map_err(CommandError::from)
    }
}

/// Human-readable BSON type name for schema inference.
fn bson_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Array(_) => "array",
        Bson::Document(_) => "document",
        Bson::Boolean(_) => "bool",
        Bson::Null => "null",
        Bson::RegularExpression(_) => "regex",
        Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) => "javascript",
        Bson::Int32(_) => "int",
        Bson::Int64(_) => "long",
        Bson::Timestamp(_) => "timestamp",
        Bson::Binary(_) => "binData",
        Bson::ObjectId(_) => "objectId",
        Bson::DateTime(_) => "date",
        Bson::Symbol(_) => "symbol",
        Bson::Decimal128(_) => "decimal",
        Bson::Undefined => "undefined",
        Bson::MaxKey => "maxKey",
        Bson::MinKey => "minKey",
        Bson::DbPointer(_) => "dbPointer",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId};

    #[test]
    fn test_bson_type_names() {
        assert_eq!(bson_type_name(&Bson::String("x".into())), "string");
        assert_eq!(bson_type_name(&Bson::Int32(1)), "int");
        assert_eq!(bson_type_name(&Bson::ObjectId(ObjectId::new())), "objectId");
        assert_eq!(bson_type_name(&Bson::Document(doc! {})), "document");
        assert_eq!(bson_type_name(&Bson::Null), "null");
    }

    #[test]
    fn test_field_info_from_document_shape() {
        let sample = doc! { "_id": ObjectId::new(), "name": "a", "qty": 3_i32 };
        let fields: Vec<FieldInfo> = sample
            .iter()
            .map(|(name, value)| FieldInfo {
                name: name.clone(),
                bson_type: bson_type_name(value).to_string(),
            })
            .collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].name, "_id");
        assert_eq!(fields[0].bson_type, "objectId");
        assert_eq!(fields[2].bson_type, "int");
    }
}
