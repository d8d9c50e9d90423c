//! MCP service implementation using rmcp.
//!
//! This module defines the MongoService struct exposing all MongoDB tools
//! via the MCP protocol using the rmcp framework's macros, plus hand-written
//! resource and prompt handlers for collection discovery.

use crate::config::ConnectDefaults;
use crate::db::{CollectionInspector, ConnectionManager};
use crate::db::types::document_to_json;
use crate::tools::connection::{
    ConnectInput, ConnectOutput, ConnectionToolHandler, DisconnectOutput,
};
use crate::tools::query::{AggregateInput, QueryInput, QueryOutput, QueryToolHandler};
use crate::tools::result_file::{read_chunk_with_defaults, ReadChunkInput};
use crate::tools::run_command::{CommandExecutor, RunCommandInput, RunCommandOutput};
use crate::models::ChunkResult;
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{
        AnnotateAble, ErrorCode, GetPromptRequestParam, GetPromptResult, Implementation,
        ListPromptsResult, ListResourcesResult, PaginatedRequestParam, Prompt, PromptArgument,
        PromptMessage, PromptMessageRole, ProtocolVersion, RawResource, ReadResourceRequestParam,
        ReadResourceResult, ResourceContents, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

/// URI prefix for collection resources.
const COLLECTION_URI_PREFIX: &str = "mongodb:///";

#[derive(Clone)]
pub struct MongoService {
    /// Shared connection manager for all database operations
    session: Arc<ConnectionManager>,
    /// Connection defaults from CLI/env configuration
    defaults: ConnectDefaults,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl MongoService {
    /// Create a new MongoService instance.
    pub fn new(session: Arc<ConnectionManager>, defaults: ConnectDefaults) -> Self {
        Self {
            session,
            defaults,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl MongoService {
    #[tool(
        description = "Connect to MongoDB.\nAll parameters are optional and fall back to the server's configured defaults.\nReplaces any existing connection. Returns connected: false on failure instead of erroring."
    )]
    async fn connect(
        &self,
        Parameters(input): Parameters<ConnectInput>,
    ) -> Result<Json<ConnectOutput>, McpError> {
        let handler = ConnectionToolHandler::new(self.session.clone(), self.defaults.clone());
        handler.connect(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(
        description = "Disconnect from MongoDB.\nIdempotent: succeeds with disconnected: false when already disconnected."
    )]
    async fn disconnect(&self) -> Json<DisconnectOutput> {
        let handler = ConnectionToolHandler::new(self.session.clone(), self.defaults.clone());
        Json(handler.disconnect().await)
    }

    #[tool(
        description = "Find documents in a collection.\nSupports filter, projection, and limit (default 100). Results are relaxed extended JSON.\nSystem collections cannot be queried."
    )]
    async fn query(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<Json<QueryOutput>, McpError> {
        let handler = QueryToolHandler::new(self.session.clone());
        handler.query(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(
        description = "Run an aggregation pipeline against a collection.\nPipeline stages are plain JSON documents. System collections cannot be aggregated."
    )]
    async fn aggregate(
        &self,
        Parameters(input): Parameters<AggregateInput>,
    ) -> Result<Json<QueryOutput>, McpError> {
        let handler = QueryToolHandler::new(self.session.clone());
        handler.aggregate(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(
        description = "Run an allowlisted MongoDB admin command (ping, serverStatus, dbStats, collStats, ...).\nOptions merge into the command at the top level. Control options: outputToFile (force result to a temp file), forceOutput (force inline), timeout (ms, default 30000).\nResults over 100000 characters are written to a temp file; read them back with read_command_result."
    )]
    async fn run_command(
        &self,
        Parameters(input): Parameters<RunCommandInput>,
    ) -> Result<Json<RunCommandOutput>, McpError> {
        let executor = CommandExecutor::new(self.session.clone());
        executor
            .run(&input.command, input.options)
            .await
            .map(|outcome| Json(RunCommandOutput::from(outcome)))
            .map_err(McpError::from)
    }

    #[tool(
        description = "Read a chunk of a result file produced by run_command.\nOnly the filename portion of filePath is used; files are resolved under the server's temp directory.\nDefaults: offset 0, length 50000 bytes. Repeat with increasing offset until hasMore is false."
    )]
    async fn read_command_result(
        &self,
        Parameters(input): Parameters<ReadChunkInput>,
    ) -> Result<Json<ChunkResult>, McpError> {
        read_chunk_with_defaults(&input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }
}

#[tool_handler]
impl ServerHandler for MongoService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .enable_prompts()
                .build(),
            server_info: Implementation {
                name: "mongo-mcp-server".to_owned(),
                title: Some("Mongo MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "MongoDB tools for inspecting and querying a live database.\n\
                \n\
                ## Workflow\n\
                1. Call `connect` (parameters optional; server defaults apply)\n\
                2. Use `query` / `aggregate` for collection data, `run_command` for server diagnostics\n\
                3. Call `disconnect` when finished\n\
                \n\
                ## Admin Commands\n\
                `run_command` accepts only a fixed allowlist of read-only diagnostic commands\n\
                (ping, hello, serverStatus, dbStats, collStats, buildInfo, hostInfo,\n\
                connectionStatus, listCommands, whatsmyuri). collStats requires a\n\
                `collection` option.\n\
                \n\
                ## Large Results\n\
                Results over 100000 characters are written to a temp file. The response\n\
                contains the file path; call `read_command_result` repeatedly with an\n\
                increasing `offset` until `hasMore` is false. Pass `forceOutput: true`\n\
                to keep a large result inline, or `outputToFile: true` to force a file.\n\
                \n\
                ## Restrictions\n\
                Collections under the `system.` namespace are not accessible, and\n\
                operators that execute code or redirect output ($where, $function,\n\
                $out, $merge, ...) are rejected."
                    .to_string(),
            ),
        }
    }

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        async move {
            let collections = match self.session.database().await {
                Some(db) => match CollectionInspector::new(&db).list_collections().await {
                    Ok(names) => names,
                    Err(e) => {
                        tracing::warn!("Failed to list collections for resources: {}", e);
                        vec![]
                    }
                },
                None => {
                    tracing::warn!("Resource listing requested while disconnected");
                    vec![]
                }
            };

            let resources = collections
                .into_iter()
                .map(|name| {
                    RawResource {
                        uri: format!("{}{}", COLLECTION_URI_PREFIX, name),
                        title: Some(format!("Collection: {}", name)),
                        description: Some("Inferred schema and indexes".to_string()),
                        mime_type: Some("application/json".to_string()),
                        size: None,
                        icons: None,
                        meta: None,
                        name,
                    }
                    .no_annotation()
                })
                .collect();

            Ok(ListResourcesResult {
                meta: None,
                resources,
                next_cursor: None,
            })
        }
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            let uri = &request.uri;
            let collection = uri.strip_prefix(COLLECTION_URI_PREFIX).ok_or_else(|| {
                McpError::new(
                    ErrorCode::INVALID_PARAMS,
                    format!("Unknown resource URI: {}", uri),
                    None,
                )
            })?;
            crate::tools::query::ensure_user_collection(collection).map_err(McpError::from)?;

            let db = self.session.database().await.ok_or_else(|| {
                McpError::new(
                    ErrorCode::INTERNAL_ERROR,
                    "Not connected to MongoDB. Call the connect tool first.",
                    None,
                )
            })?;
            let schema = CollectionInspector::new(&db)
                .inspect(collection)
                .await
                .map_err(McpError::from)?;

            let content_text = serde_json::to_string_pretty(&schema)
                .unwrap_or_else(|e| format!("Serialization error: {}", e));

            Ok(ReadResourceResult {
                contents: vec![ResourceContents::TextResourceContents {
                    uri: uri.clone(),
                    mime_type: Some("application/json".to_string()),
                    text: content_text,
                    meta: None,
                }],
            })
        }
    }

    fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListPromptsResult, McpError>> + Send + '_ {
        async move {
            Ok(ListPromptsResult {
                meta: None,
                next_cursor: None,
                prompts: vec![Prompt::new(
                    "analyze_collection",
                    Some("Analyze the structure and contents of a MongoDB collection"),
                    Some(vec![PromptArgument {
                        name: "collection".to_string(),
                        title: None,
                        description: Some("Name of the collection to analyze".to_string()),
                        required: Some(true),
                    }]),
                )],
            })
        }
    }

    fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<GetPromptResult, McpError>> + Send + '_ {
        async move {
            if request.name != "analyze_collection" {
                return Err(McpError::new(
                    ErrorCode::INVALID_PARAMS,
                    format!("Unknown prompt: {}", request.name),
                    None,
                ));
            }

            let collection = request
                .arguments
                .as_ref()
                .and_then(|args| args.get("collection"))
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    McpError::new(
                        ErrorCode::INVALID_PARAMS,
                        "Missing required argument: collection",
                        None,
                    )
                })?
                .to_string();
            crate::tools::query::ensure_user_collection(&collection).map_err(McpError::from)?;

            let db = self.session.database().await.ok_or_else(|| {
                McpError::new(
                    ErrorCode::INTERNAL_ERROR,
                    "Not connected to MongoDB. Call the connect tool first.",
                    None,
                )
            })?;

            let inspector = CollectionInspector::new(&db);
            let count = inspector
                .estimated_count(&collection)
                .await
                .map_err(McpError::from)?;
            let samples = inspector
                .sample_documents(&collection, 5)
                .await
                .map_err(McpError::from)?;
            let sample_json: Vec<_> = samples.into_iter().map(document_to_json).collect();
            let sample_text = serde_json::to_string_pretty(&sample_json)
                .unwrap_or_else(|e| format!("Serialization error: {}", e));

            let text = format!(
                "Analyze the MongoDB collection '{}'.\n\
                Estimated document count: {}.\n\
                \n\
                Sample documents:\n{}\n\
                \n\
                Describe the collection's apparent purpose, the shape and types of its\n\
                fields, and any data quality issues visible in the samples.",
                collection, count, sample_text
            );

            Ok(GetPromptResult {
                description: Some(format!("Analysis of collection '{}'", collection)),
                messages: vec![PromptMessage::new_text(PromptMessageRole::User, text)],
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        DEFAULT_MONGODB_DATABASE, DEFAULT_MONGODB_HOST, DEFAULT_MONGODB_PORT,
    };

    fn create_test_service() -> MongoService {
        let session = Arc::new(ConnectionManager::new(DEFAULT_MONGODB_DATABASE));
        let defaults = ConnectDefaults {
            host: DEFAULT_MONGODB_HOST.to_string(),
            port: DEFAULT_MONGODB_PORT,
            database: DEFAULT_MONGODB_DATABASE.to_string(),
            user: None,
            password: None,
        };
        MongoService::new(session, defaults)
    }

    #[test]
    fn test_service_creation() {
        // Constructing the service builds the tool router, which validates
        // every tool's output schema; a bad schema panics here
        let _service = create_test_service();
    }

    #[test]
    fn test_server_info() {
        let service = create_test_service();
        let info = service.get_info();
        assert!(!info.server_info.name.is_empty());
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_some());
        assert!(info.capabilities.prompts.is_some());
    }

    #[test]
    fn test_instructions_mention_large_result_protocol() {
        let service = create_test_service();
        let instructions = service.get_info().instructions.unwrap();
        assert!(instructions.contains("read_command_result"));
        assert!(instructions.contains("hasMore"));
    }
}
