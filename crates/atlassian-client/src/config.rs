//! Immutable service configuration, built once at startup.
//!
//! Components receive this by reference instead of reading ambient
//! environment state at call time.

use crate::error::{ClientError, ClientResult};

/// Authentication material for one Atlassian service.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Personal Access Token (Server / Data Center), sent as a Bearer header.
    PersonalToken(String),
    /// Username + API token (Cloud), sent as HTTP basic auth.
    Basic { username: String, api_token: String },
}

#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub base_url: String,
    pub credentials: Credentials,
    /// Comma-separated project keys; restricts JQL searches when set.
    pub projects_filter: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConfluenceConfig {
    pub base_url: String,
    pub credentials: Credentials,
    /// Comma-separated space keys; restricts CQL searches when set.
    pub spaces_filter: Option<String>,
}

/// Process-wide configuration shared by the dispatcher and every client.
#[derive(Debug, Clone, Default)]
pub struct AtlassianConfig {
    pub jira: Option<JiraConfig>,
    pub confluence: Option<ConfluenceConfig>,
    /// Suppresses all write-category tools before any network call.
    pub read_only: bool,
    /// Allow-list of tool names; `None` or empty enables everything.
    pub enabled_tools: Option<Vec<String>>,
}

impl AtlassianConfig {
    /// Resolve configuration from environment variables. CLI flags are
    /// expected to have been exported into the environment by the caller.
    pub fn from_env() -> Self {
        let jira = std::env::var("JIRA_URL").ok().and_then(|base_url| {
            let credentials = credentials_from_env("JIRA")?;
            Some(JiraConfig {
                base_url,
                credentials,
                projects_filter: non_empty_env("JIRA_PROJECTS_FILTER"),
            })
        });

        let confluence = std::env::var("CONFLUENCE_URL").ok().and_then(|base_url| {
            let credentials = credentials_from_env("CONFLUENCE")?;
            Some(ConfluenceConfig {
                base_url,
                credentials,
                spaces_filter: non_empty_env("CONFLUENCE_SPACES_FILTER"),
            })
        });

        let read_only = std::env::var("READ_ONLY_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let enabled_tools = non_empty_env("ENABLED_TOOLS").map(|list| parse_tool_list(&list));

        Self {
            jira,
            confluence,
            read_only,
            enabled_tools,
        }
    }

    /// At least one service must be configured to serve anything.
    pub fn require_service(&self) -> ClientResult<()> {
        if self.jira.is_none() && self.confluence.is_none() {
            return Err(ClientError::MissingConfig(
                "no service configured: set JIRA_URL and/or CONFLUENCE_URL \
                 with matching credentials"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Split a comma-separated tool list, trimming whitespace and dropping empties.
pub fn parse_tool_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Personal token takes precedence over basic auth, matching the header
/// precedence Atlassian documents for Server vs Cloud deployments.
fn credentials_from_env(prefix: &str) -> Option<Credentials> {
    if let Some(token) = non_empty_env(&format!("{prefix}_PERSONAL_TOKEN")) {
        return Some(Credentials::PersonalToken(token));
    }

    let username = non_empty_env(&format!("{prefix}_USERNAME"))?;
    let api_token = non_empty_env(&format!("{prefix}_API_TOKEN"))?;
    Some(Credentials::Basic {
        username,
        api_token,
    })
}
