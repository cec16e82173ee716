use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use grepvault_core::{SearchConfig, SearchOutcome, SearchQuery, search};
use grepvault_progress::NoopProgress;
use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    tool, tool_handler, tool_router,
    transport::stdio,
};
use schemars::JsonSchema;
use serde::Deserialize;
use tokio::task;
use tracing::{error, info};

use crate::cli::base_config;

#[derive(Clone)]
pub struct SearchServer {
    base: Arc<SearchConfig>,
    output_dir: Arc<PathBuf>,
    exports: Arc<AtomicU64>,
    tool_router: ToolRouter<SearchServer>,
}

impl SearchServer {
    fn internal_error(code: &str, message: impl Into<String>) -> McpError {
        let full = format!("{code}: {}", message.into());
        McpError::internal_error(full, None)
    }

    fn next_export_path(&self) -> PathBuf {
        let n = self.exports.fetch_add(1, Ordering::SeqCst);
        self.output_dir
            .join(format!("search_results-{}-{n}.csv", std::process::id()))
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct SearchAndExportArgs {
    pub query: String,
    #[serde(default)]
    pub use_regex: bool,
    #[serde(default)]
    pub whole_words: bool,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub repo_filter: Option<String>,
    #[serde(default)]
    pub path_filter: Option<String>,
}

#[tool_router]
impl SearchServer {
    pub fn new(base: SearchConfig, output_dir: PathBuf) -> Self {
        Self {
            base: Arc::new(base),
            output_dir: Arc::new(output_dir),
            exports: Arc::new(AtomicU64::new(0)),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Search public source code on grep.app, page through every result page, and export each highlighted line to a CSV file. Returns the CSV path, the total result count, and up to six results with distinct text following the query (useful for spotting leaked keys and tokens)."
    )]
    pub async fn search_and_export(
        &self,
        Parameters(args): Parameters<SearchAndExportArgs>,
    ) -> Result<CallToolResult, McpError> {
        if args.query.trim().is_empty() {
            return Err(Self::internal_error("invalid_query", "query must not be empty"));
        }

        let mut config = (*self.base).clone();
        config.output = self.next_export_path();
        let query = SearchQuery {
            query: args.query,
            use_regex: args.use_regex,
            whole_words: args.whole_words,
            case_sensitive: args.case_sensitive,
            repo_filter: args.repo_filter,
            path_filter: args.path_filter,
        };

        let outcome = task::spawn_blocking(move || search(&query, &config, &mut NoopProgress))
            .await
            .map_err(|e| Self::internal_error("search_task_failed", e.to_string()))?
            .map_err(|e| Self::internal_error("search_failed", e.to_string()))?;

        Ok(CallToolResult::success(render_outcome(&outcome)))
    }
}

fn render_outcome(outcome: &SearchOutcome) -> Vec<Content> {
    let mut contents = vec![Content::text(format!(
        "{}\nCSV: {}\n{}\n",
        outcome.total_label,
        outcome.csv_path.display(),
        outcome.status
    ))];
    for row in &outcome.preview {
        contents.push(Content::text(format!(
            "{}:{}:{} [{}]\n{}\n",
            row.repository,
            row.path,
            row.line_number,
            row.extracted_query,
            row.content.trim()
        )));
    }
    contents
}

#[tool_handler]
impl ServerHandler for SearchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Aggregates grep.app code search results. Call `search_and_export` with a query (optionally regex, whole-word, case-sensitive, repository and path filters); every result page is fetched, highlighted lines are exported to CSV, and a deduplicated preview is returned."
                    .to_string(),
            ),
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
        }
    }
}

pub async fn run_server(
    output_dir: Option<PathBuf>,
    endpoint: Option<String>,
    delay_ms: Option<u64>,
) -> Result<(), Box<dyn Error>> {
    let output_dir = output_dir.unwrap_or_else(std::env::temp_dir);
    std::fs::create_dir_all(&output_dir)?;
    let config = base_config(endpoint, delay_ms);
    config.validate()?;

    info!("grepvault MCP server starting");
    info!("endpoint: {}", config.endpoint);
    info!("exports: {}", output_dir.display());

    let server = SearchServer::new(config, output_dir);

    let service = server
        .serve(stdio())
        .await
        .inspect_err(|e| error!("grepvault MCP serve error: {e:?}"))?;

    service.waiting().await?;

    Ok(())
}
