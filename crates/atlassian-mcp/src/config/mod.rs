//! Server settings resolution — CLI flags first, environment second.
//!
//! Resolution happens exactly once at startup; the resulting `Settings`
//! value is immutable and passed by reference from then on, so no
//! component reads ambient environment state at dispatch time.

use atlassian_client::{config::parse_tool_list, AtlassianConfig, Credentials};

/// The physical channel the protocol session runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TransportKind {
    Stdio,
    Sse,
    #[value(name = "streamable-http")]
    StreamableHttp,
}

impl TransportKind {
    fn default_path(self) -> &'static str {
        match self {
            TransportKind::Stdio => "",
            TransportKind::Sse => "/sse",
            TransportKind::StreamableHttp => "/mcp",
        }
    }
}

/// CLI options for the serve command. Every field falls back to an
/// environment variable, then to a default.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ServeArgs {
    /// Transport type (stdio, sse, or streamable-http).
    #[arg(long, value_enum)]
    pub transport: Option<TransportKind>,

    /// Host to bind to for the SSE or streamable HTTP transport.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on for the SSE or streamable HTTP transport.
    #[arg(long)]
    pub port: Option<u16>,

    /// Path for the SSE or streamable HTTP endpoint.
    #[arg(long)]
    pub path: Option<String>,

    /// Run in read-only mode (disables all write operations).
    #[arg(long)]
    pub read_only: bool,

    /// Comma-separated list of tool names to enable.
    #[arg(long)]
    pub enabled_tools: Option<String>,

    /// Jira base URL.
    #[arg(long)]
    pub jira_url: Option<String>,

    /// Jira username/email (Cloud basic auth).
    #[arg(long)]
    pub jira_username: Option<String>,

    /// Jira API token (Cloud basic auth).
    #[arg(long)]
    pub jira_token: Option<String>,

    /// Jira Personal Access Token (Server/Data Center).
    #[arg(long)]
    pub jira_personal_token: Option<String>,

    /// Comma-separated list of Jira project keys to restrict searches to.
    #[arg(long)]
    pub jira_projects_filter: Option<String>,

    /// Confluence base URL.
    #[arg(long)]
    pub confluence_url: Option<String>,

    /// Confluence username/email (Cloud basic auth).
    #[arg(long)]
    pub confluence_username: Option<String>,

    /// Confluence API token (Cloud basic auth).
    #[arg(long)]
    pub confluence_token: Option<String>,

    /// Confluence Personal Access Token (Server/Data Center).
    #[arg(long)]
    pub confluence_personal_token: Option<String>,

    /// Comma-separated list of Confluence space keys to restrict searches to.
    #[arg(long)]
    pub confluence_spaces_filter: Option<String>,
}

/// Fully resolved server settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub transport: TransportKind,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub atlassian: AtlassianConfig,
}

impl Settings {
    pub fn resolve(args: &ServeArgs) -> Self {
        let transport = args.transport.unwrap_or_else(|| {
            match std::env::var("TRANSPORT").ok().as_deref() {
                Some("sse") => TransportKind::Sse,
                Some("streamable-http") => TransportKind::StreamableHttp,
                _ => TransportKind::Stdio,
            }
        });

        let host = args
            .host
            .clone()
            .or_else(|| std::env::var("HOST").ok())
            .unwrap_or_else(|| "0.0.0.0".to_string());

        let port = args
            .port
            .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
            .unwrap_or(8000);

        let path = args
            .path
            .clone()
            .or_else(|| std::env::var("STREAMABLE_HTTP_PATH").ok())
            .unwrap_or_else(|| transport.default_path().to_string());

        let mut atlassian = AtlassianConfig::from_env();

        if let Some(base_url) = args.jira_url.clone() {
            let credentials = credentials_from_args(
                args.jira_personal_token.as_deref(),
                args.jira_username.as_deref(),
                args.jira_token.as_deref(),
            )
            .or_else(|| atlassian.jira.as_ref().map(|j| j.credentials.clone()));
            if let Some(credentials) = credentials {
                atlassian.jira = Some(atlassian_client::JiraConfig {
                    base_url,
                    credentials,
                    projects_filter: args
                        .jira_projects_filter
                        .clone()
                        .or_else(|| atlassian.jira.as_ref().and_then(|j| j.projects_filter.clone())),
                });
            }
        }

        if let Some(base_url) = args.confluence_url.clone() {
            let credentials = credentials_from_args(
                args.confluence_personal_token.as_deref(),
                args.confluence_username.as_deref(),
                args.confluence_token.as_deref(),
            )
            .or_else(|| atlassian.confluence.as_ref().map(|c| c.credentials.clone()));
            if let Some(credentials) = credentials {
                atlassian.confluence = Some(atlassian_client::ConfluenceConfig {
                    base_url,
                    credentials,
                    spaces_filter: args.confluence_spaces_filter.clone().or_else(|| {
                        atlassian.confluence.as_ref().and_then(|c| c.spaces_filter.clone())
                    }),
                });
            }
        }

        if args.read_only {
            atlassian.read_only = true;
        }

        if let Some(list) = &args.enabled_tools {
            atlassian.enabled_tools = Some(parse_tool_list(list));
        }

        Self {
            transport,
            host,
            port,
            path,
            atlassian,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn credentials_from_args(
    personal_token: Option<&str>,
    username: Option<&str>,
    api_token: Option<&str>,
) -> Option<Credentials> {
    if let Some(token) = personal_token {
        return Some(Credentials::PersonalToken(token.to_string()));
    }
    match (username, api_token) {
        (Some(username), Some(api_token)) => Some(Credentials::Basic {
            username: username.to_string(),
            api_token: api_token.to_string(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = ServeArgs {
            transport: Some(TransportKind::StreamableHttp),
            port: Some(9000),
            read_only: true,
            enabled_tools: Some("jira_get_issue".to_string()),
            jira_url: Some("https://jira.example.com".to_string()),
            jira_personal_token: Some("pat".to_string()),
            ..Default::default()
        };

        let settings = Settings::resolve(&args);
        assert_eq!(settings.transport, TransportKind::StreamableHttp);
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.path, "/mcp");
        assert!(settings.atlassian.read_only);
        assert_eq!(
            settings.atlassian.enabled_tools.as_deref(),
            Some(&["jira_get_issue".to_string()][..])
        );
        assert!(settings.atlassian.jira.is_some());
    }

    #[test]
    fn sse_transport_defaults_its_path() {
        let args = ServeArgs {
            transport: Some(TransportKind::Sse),
            ..Default::default()
        };
        assert_eq!(Settings::resolve(&args).path, "/sse");
    }
}
