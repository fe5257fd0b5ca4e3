//! Jira tool category — issue search, retrieval, creation, and comments.

use atlassian_client::JiraClient;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::registry::ToolHandler;

pub struct JiraTools {
    client: JiraClient,
}

impl JiraTools {
    pub fn new(client: JiraClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct SearchIssuesParams {
    jql: String,
    #[serde(default)]
    fields: Option<Vec<String>>,
    #[serde(default = "default_max_results")]
    max_results: u32,
}

fn default_max_results() -> u32 {
    50
}

#[derive(Debug, Deserialize)]
struct GetIssueParams {
    issue_key: String,
    #[serde(default)]
    fields: Option<Vec<String>>,
    #[serde(default)]
    expand: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct CreateIssueParams {
    project_key: String,
    issue_type: String,
    summary: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateIssueParams {
    issue_key: String,
    fields: Value,
}

#[derive(Debug, Deserialize)]
struct AddCommentParams {
    issue_key: String,
    body: String,
}

/// Descriptors for every Jira tool, independent of a live client.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "jira_search_issues".to_string(),
            description: Some("Search for Jira issues using JQL (Jira Query Language)".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "jql": { "type": "string", "description": "JQL query to search for issues" },
                    "fields": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Issue fields to include in the response"
                    },
                    "max_results": { "type": "integer", "description": "Maximum number of results to return (default: 50)", "default": 50 }
                },
                "required": ["jql"]
            }),
        },
        ToolDefinition {
            name: "jira_get_issue".to_string(),
            description: Some("Get a specific Jira issue by key".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "issue_key": { "type": "string", "description": "The issue key, e.g. PROJ-123" },
                    "fields": { "type": "array", "items": { "type": "string" } },
                    "expand": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["issue_key"]
            }),
        },
        ToolDefinition {
            name: "jira_create_issue".to_string(),
            description: Some("Create a new Jira issue".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project_key": { "type": "string", "description": "Key of the project to create the issue in" },
                    "issue_type": { "type": "string", "description": "Issue type name, e.g. Bug or Task" },
                    "summary": { "type": "string", "description": "Issue summary" },
                    "description": { "type": "string", "description": "Issue description" },
                    "priority": { "type": "string", "description": "Priority name" }
                },
                "required": ["project_key", "issue_type", "summary"]
            }),
        },
        ToolDefinition {
            name: "jira_update_issue".to_string(),
            description: Some("Update fields of an existing Jira issue".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "issue_key": { "type": "string", "description": "The issue key to update" },
                    "fields": { "type": "object", "description": "Field values to set, keyed by field id" }
                },
                "required": ["issue_key", "fields"]
            }),
        },
        ToolDefinition {
            name: "jira_add_comment".to_string(),
            description: Some("Add a comment to a Jira issue".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "issue_key": { "type": "string", "description": "The issue key to comment on" },
                    "body": { "type": "string", "description": "Comment text" }
                },
                "required": ["issue_key", "body"]
            }),
        },
        ToolDefinition {
            name: "jira_get_projects".to_string(),
            description: Some("List the Jira projects visible to the configured account".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}

#[async_trait::async_trait]
impl ToolHandler for JiraTools {
    fn category(&self) -> &'static str {
        "jira"
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        definitions()
    }

    fn write_tools(&self) -> &'static [&'static str] {
        &["jira_create_issue", "jira_update_issue", "jira_add_comment"]
    }

    async fn execute(&self, name: &str, args: Value) -> McpResult<ToolCallResult> {
        let result = match name {
            "jira_search_issues" => {
                let params: SearchIssuesParams = parse_args(args)?;
                self.client
                    .search_issues(&params.jql, params.fields.as_deref(), params.max_results)
                    .await?
            }
            "jira_get_issue" => {
                let params: GetIssueParams = parse_args(args)?;
                self.client
                    .get_issue(
                        &params.issue_key,
                        params.fields.as_deref(),
                        params.expand.as_deref(),
                    )
                    .await?
            }
            "jira_create_issue" => {
                let params: CreateIssueParams = parse_args(args)?;
                self.client
                    .create_issue(
                        &params.project_key,
                        &params.issue_type,
                        &params.summary,
                        params.description.as_deref(),
                        params.priority.as_deref(),
                    )
                    .await?
            }
            "jira_update_issue" => {
                let params: UpdateIssueParams = parse_args(args)?;
                self.client
                    .update_issue(&params.issue_key, params.fields)
                    .await?
            }
            "jira_add_comment" => {
                let params: AddCommentParams = parse_args(args)?;
                self.client
                    .add_comment(&params.issue_key, &params.body)
                    .await?
            }
            "jira_get_projects" => self.client.get_projects().await?,
            _ => return Err(McpError::ToolNotFound(name.to_string())),
        };

        Ok(ToolCallResult::json(&result))
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> McpResult<T> {
    serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))
}
