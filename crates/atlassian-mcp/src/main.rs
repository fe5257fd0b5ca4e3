//! Atlassian MCP Server — entry point.

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use atlassian_client::{ConfluenceClient, JiraClient};
use atlassian_mcp::config::{ServeArgs, Settings, TransportKind};
use atlassian_mcp::protocol::ProtocolHandler;
use atlassian_mcp::tools::{self, ConfluenceTools, JiraTools, ToolHandler, ToolRouter};
use atlassian_mcp::transport::{SseTransport, StdioTransport, StreamableHttpTransport};

#[derive(Parser)]
#[command(
    name = "atlassian-mcp",
    about = "MCP server exposing Jira and Confluence tools",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server (default).
    Serve(ServeArgs),

    /// Run the interactive OAuth 2.0 setup wizard for Atlassian Cloud.
    OauthSetup,

    /// Print server capabilities and the tool catalog as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   atlassian-mcp completions bash > ~/.local/share/bash-completion/completions/atlassian-mcp
    ///   atlassian-mcp completions zsh > ~/.zfunc/_atlassian-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve(ServeArgs::default())) {
        Commands::Serve(args) => {
            let settings = Settings::resolve(&args);
            serve(settings).await?;
        }

        Commands::OauthSetup => {
            atlassian_mcp::oauth::run_setup().await?;
        }

        Commands::Info => {
            let capabilities = atlassian_mcp::types::InitializeResult::default_result();
            let tools: Vec<_> = tools::jira::definitions()
                .into_iter()
                .chain(tools::confluence::definitions())
                .collect();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "atlassian-mcp", &mut std::io::stdout());
        }
    }

    Ok(())
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    settings.atlassian.require_service()?;

    let mut handlers: Vec<Arc<dyn ToolHandler>> = Vec::new();

    if let Some(jira) = &settings.atlassian.jira {
        let client = JiraClient::new(jira)?;
        tracing::info!("Jira tools enabled for {}", jira.base_url);
        handlers.push(Arc::new(JiraTools::new(client)));
    }

    if let Some(confluence) = &settings.atlassian.confluence {
        let client = ConfluenceClient::new(confluence)?;
        tracing::info!("Confluence tools enabled for {}", confluence.base_url);
        handlers.push(Arc::new(ConfluenceTools::new(client)));
    }

    if settings.atlassian.read_only {
        tracing::info!("Read-only mode: write tools are disabled");
    }

    let router = ToolRouter::new(
        handlers,
        settings.atlassian.enabled_tools.clone(),
        settings.atlassian.read_only,
    );
    let handler = Arc::new(ProtocolHandler::new(router));

    match settings.transport {
        TransportKind::Stdio => {
            StdioTransport::new(handler).run().await?;
        }
        TransportKind::Sse => {
            SseTransport::new(handler, settings.path.clone())
                .run(&settings.bind_addr())
                .await?;
        }
        TransportKind::StreamableHttp => {
            StreamableHttpTransport::new(handler, settings.path.clone())
                .run(&settings.bind_addr())
                .await?;
        }
    }

    Ok(())
}
