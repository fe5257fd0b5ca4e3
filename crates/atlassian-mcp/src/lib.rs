//! Atlassian MCP server — Jira and Confluence tools for MCP clients.

pub mod config;
pub mod oauth;
pub mod protocol;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::Settings;
pub use protocol::ProtocolHandler;
pub use tools::ToolRouter;
pub use transport::StdioTransport;
