//! Tool catalog and dispatch.

pub mod confluence;
pub mod jira;
pub mod registry;

pub use confluence::ConfluenceTools;
pub use jira::JiraTools;
pub use registry::{ToolHandler, ToolRouter};
