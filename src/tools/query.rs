//! Read-only query tools: find and aggregate over user collections.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;

use futures_util::TryStreamExt;
use mongodb::bson::Document;

use crate::db::session::ConnectionManager;
use crate::db::types::{documents_to_json, json_to_document};
use crate::error::{CommandError, CommandResult};
use crate::models::{DEFAULT_QUERY_LIMIT, SYSTEM_COLLECTION_PREFIX};

/// Input for the query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// Collection to query
    pub collection: String,
    /// Find filter document. Default: match everything
    #[serde(default)]
    pub filter: Option<JsonValue>,
    /// Projection document selecting the fields to return
    #[serde(default)]
    pub projection: Option<JsonValue>,
    /// Maximum number of documents to return. Default: 100
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Input for the aggregate tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AggregateInput {
    /// Collection to aggregate over
    pub collection: String,
    /// Aggregation pipeline stages, in order
    pub pipeline: Vec<JsonValue>,
}

/// Documents returned by a query or aggregation, in relaxed extended JSON.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct QueryOutput {
    pub documents: Vec<JsonValue>,
    pub count: usize,
}

/// Reject empty names and names in the reserved system namespace.
pub fn ensure_user_collection(name: &str) -> CommandResult<()> {
    if name.is_empty() {
        return Err(CommandError::invalid_structure("collection name is required"));
    }
    if name.starts_with(SYSTEM_COLLECTION_PREFIX) {
        return Err(CommandError::invalid_structure(format!(
            "collection '{}' is in the reserved system namespace",
            name
        )));
    }
    Ok(())
}

/// Runs find and aggregate against the shared connection.
pub struct QueryToolHandler {
    session: Arc<ConnectionManager>,
}

impl QueryToolHandler {
    pub fn new(session: Arc<ConnectionManager>) -> Self {
        Self { session }
    }

    /// Run a find with optional filter, projection, and limit.
    pub async fn query(&self, input: QueryInput) -> CommandResult<QueryOutput> {
        ensure_user_collection(&input.collection)?;

        let filter = match &input.filter {
            Some(value) => json_to_document(value)?,
            None => Document::new(),
        };
        let projection = input
            .projection
            .as_ref()
            .map(json_to_document)
            .transpose()?;
        let limit = input.limit.unwrap_or(DEFAULT_QUERY_LIMIT);

        let db = self.session.require_database().await?;
        let coll = db.collection::<Document>(&input.collection);
        debug!(collection = %input.collection, limit, "Running find");

        let mut find = coll.find(filter).limit(limit);
        if let Some(projection) = projection {
            find = find.projection(projection);
        }
        let docs: Vec<Document> = find.await?.try_collect().await?;

        let documents = documents_to_json(docs);
        Ok(QueryOutput {
            count: documents.len(),
            documents,
        })
    }

    /// Run an aggregation pipeline.
    pub async fn aggregate(&self, input: AggregateInput) -> CommandResult<QueryOutput> {
        ensure_user_collection(&input.collection)?;

        let pipeline: Vec<Document> = input
            .pipeline
            .iter()
            .map(json_to_document)
            .collect::<CommandResult<_>>()?;

        let db = self.session.require_database().await?;
        let coll = db.collection::<Document>(&input.collection);
        debug!(collection = %input.collection, stages = pipeline.len(), "Running aggregation");

        let docs: Vec<Document> = coll.aggregate(pipeline).await?.try_collect().await?;

        let documents = documents_to_json(docs);
        Ok(QueryOutput {
            count: documents.len(),
            documents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_system_collections_rejected() {
        let err = ensure_user_collection("system.users").unwrap_err();
        assert!(matches!(err, CommandError::InvalidCommandStructure { .. }));
    }

    #[test]
    fn test_empty_collection_name_rejected() {
        assert!(ensure_user_collection("").is_err());
    }

    #[test]
    fn test_ordinary_collection_accepted() {
        ensure_user_collection("orders").unwrap();
        // "system" without the dot separator is an ordinary name
        ensure_user_collection("systems").unwrap();
    }

    #[tokio::test]
    async fn test_query_fails_when_disconnected() {
        let handler = QueryToolHandler::new(Arc::new(ConnectionManager::new("test")));
        let err = handler
            .query(QueryInput {
                collection: "orders".to_string(),
                filter: None,
                projection: None,
                limit: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Connection { .. }));
    }

    #[tokio::test]
    async fn test_query_rejects_non_object_filter_before_connecting() {
        let handler = QueryToolHandler::new(Arc::new(ConnectionManager::new("test")));
        let err = handler
            .query(QueryInput {
                collection: "orders".to_string(),
                filter: Some(json!([1, 2])),
                projection: None,
                limit: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidCommandStructure { .. }));
    }

    #[tokio::test]
    async fn test_aggregate_rejects_non_object_stage() {
        let handler = QueryToolHandler::new(Arc::new(ConnectionManager::new("test")));
        let err = handler
            .aggregate(AggregateInput {
                collection: "orders".to_string(),
                pipeline: vec![json!("$match")],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidCommandStructure { .. }));
    }
}
