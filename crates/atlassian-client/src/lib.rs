//! Atlassian REST client glue — Jira and Confluence calls behind typed clients.

pub mod config;
pub mod confluence;
pub mod error;
pub mod jira;

pub use config::{AtlassianConfig, ConfluenceConfig, Credentials, JiraConfig};
pub use confluence::ConfluenceClient;
pub use error::{ClientError, ClientResult};
pub use jira::JiraClient;
