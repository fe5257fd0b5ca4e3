//! Confluence tool category — CQL search, page operations, spaces.

use atlassian_client::ConfluenceClient;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::registry::ToolHandler;

pub struct ConfluenceTools {
    client: ConfluenceClient,
}

impl ConfluenceTools {
    pub fn new(client: ConfluenceClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default)]
    space_key: Option<String>,
    #[serde(default = "default_search_limit")]
    limit: u32,
}

fn default_search_limit() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
struct GetPageParams {
    page_id: String,
    #[serde(default)]
    expand: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatePageParams {
    space_key: String,
    title: String,
    content: String,
    #[serde(default)]
    parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdatePageParams {
    page_id: String,
    title: String,
    content: String,
    version: u64,
}

#[derive(Debug, Deserialize)]
struct GetSpacesParams {
    #[serde(default = "default_spaces_limit")]
    limit: u32,
    #[serde(default)]
    start: u32,
}

fn default_spaces_limit() -> u32 {
    25
}

/// Descriptors for every Confluence tool, independent of a live client.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "confluence_search".to_string(),
            description: Some(
                "Search for content in Confluence using CQL (Confluence Query Language)"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "CQL query to search for content" },
                    "space_key": { "type": "string", "description": "Optional space key to limit search to a specific space" },
                    "limit": { "type": "integer", "description": "Maximum number of results to return (default: 10)", "default": 10 }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: "confluence_get_page".to_string(),
            description: Some("Get a specific Confluence page by ID".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "page_id": { "type": "string", "description": "The ID of the page to retrieve" },
                    "expand": { "type": "string", "description": "Comma-separated list of properties to expand (e.g. \"body.storage,version\")" }
                },
                "required": ["page_id"]
            }),
        },
        ToolDefinition {
            name: "confluence_create_page".to_string(),
            description: Some("Create a new page in Confluence".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "space_key": { "type": "string", "description": "The key of the space to create the page in" },
                    "title": { "type": "string", "description": "The title of the new page" },
                    "content": { "type": "string", "description": "The page content in Confluence storage format" },
                    "parent_id": { "type": "string", "description": "Optional ID of the parent page" }
                },
                "required": ["space_key", "title", "content"]
            }),
        },
        ToolDefinition {
            name: "confluence_update_page".to_string(),
            description: Some("Update an existing Confluence page".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "page_id": { "type": "string", "description": "The ID of the page to update" },
                    "title": { "type": "string", "description": "The new title of the page" },
                    "content": { "type": "string", "description": "The new content in Confluence storage format" },
                    "version": { "type": "integer", "description": "The current version number of the page" }
                },
                "required": ["page_id", "title", "content", "version"]
            }),
        },
        ToolDefinition {
            name: "confluence_get_spaces".to_string(),
            description: Some("Get a list of spaces in Confluence".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "limit": { "type": "integer", "description": "Maximum number of spaces to return (default: 25)", "default": 25 },
                    "start": { "type": "integer", "description": "Starting index for pagination (default: 0)", "default": 0 }
                }
            }),
        },
    ]
}

#[async_trait::async_trait]
impl ToolHandler for ConfluenceTools {
    fn category(&self) -> &'static str {
        "confluence"
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        definitions()
    }

    fn write_tools(&self) -> &'static [&'static str] {
        &["confluence_create_page", "confluence_update_page"]
    }

    async fn execute(&self, name: &str, args: Value) -> McpResult<ToolCallResult> {
        let result = match name {
            "confluence_search" => {
                let params: SearchParams = parse_args(args)?;
                self.client
                    .search(&params.query, params.space_key.as_deref(), params.limit)
                    .await?
            }
            "confluence_get_page" => {
                let params: GetPageParams = parse_args(args)?;
                self.client
                    .get_page(&params.page_id, params.expand.as_deref())
                    .await?
            }
            "confluence_create_page" => {
                let params: CreatePageParams = parse_args(args)?;
                self.client
                    .create_page(
                        &params.space_key,
                        &params.title,
                        &params.content,
                        params.parent_id.as_deref(),
                    )
                    .await?
            }
            "confluence_update_page" => {
                let params: UpdatePageParams = parse_args(args)?;
                self.client
                    .update_page(
                        &params.page_id,
                        &params.title,
                        &params.content,
                        params.version,
                    )
                    .await?
            }
            "confluence_get_spaces" => {
                let params: GetSpacesParams = parse_args(args)?;
                self.client.get_spaces(params.limit, params.start).await?
            }
            _ => return Err(McpError::ToolNotFound(name.to_string())),
        };

        Ok(ToolCallResult::json(&result))
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> McpResult<T> {
    serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))
}
