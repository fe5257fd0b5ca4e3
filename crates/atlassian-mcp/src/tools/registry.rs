//! Tool registration and dispatch.
//!
//! Handlers register once per category (name prefix); the router owns the
//! assembled catalog, the allow-list filter, and the read-only gate. The
//! router is read-only after construction and shared across connections.

use std::sync::Arc;

use serde_json::Value;

use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

/// One category of tools backed by a collaborator client. New categories
/// register with the router; the dispatch path never changes.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    /// Name prefix for every tool in this category, e.g. `jira`.
    fn category(&self) -> &'static str;

    /// Descriptors for this category, in stable order.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Names of the tools that mutate upstream state.
    fn write_tools(&self) -> &'static [&'static str];

    async fn execute(&self, name: &str, args: Value) -> McpResult<ToolCallResult>;
}

pub struct ToolRouter {
    handlers: Vec<Arc<dyn ToolHandler>>,
    allow_list: Option<Vec<String>>,
    read_only: bool,
}

impl ToolRouter {
    pub fn new(
        handlers: Vec<Arc<dyn ToolHandler>>,
        allow_list: Option<Vec<String>>,
        read_only: bool,
    ) -> Self {
        Self {
            handlers,
            allow_list,
            read_only,
        }
    }

    /// Full catalog, assembled from every handler in registration order.
    pub fn catalog(&self) -> Vec<ToolDefinition> {
        self.handlers
            .iter()
            .flat_map(|h| h.definitions())
            .collect()
    }

    /// Catalog filtered by the allow-list. An absent or empty allow-list
    /// returns the catalog unchanged; otherwise only listed names survive,
    /// preserving catalog order.
    pub fn enabled_tools(&self) -> Vec<ToolDefinition> {
        let catalog = self.catalog();
        match &self.allow_list {
            Some(allowed) if !allowed.is_empty() => catalog
                .into_iter()
                .filter(|tool| allowed.iter().any(|name| name == &tool.name))
                .collect(),
            _ => catalog,
        }
    }

    /// Resolve a tool name and execute it. Unknown names and read-only
    /// violations fail before any handler (and thus any network call) is
    /// touched; collaborator failures surface as upstream errors.
    pub async fn dispatch(&self, name: &str, args: Option<Value>) -> McpResult<ToolCallResult> {
        if !self.enabled_tools().iter().any(|tool| tool.name == name) {
            return Err(McpError::ToolNotFound(name.to_string()));
        }

        let handler = self
            .handlers
            .iter()
            .find(|h| {
                name.strip_prefix(h.category())
                    .is_some_and(|rest| rest.starts_with('_'))
            })
            .ok_or_else(|| McpError::ToolNotFound(name.to_string()))?;

        if self.read_only && handler.write_tools().contains(&name) {
            return Err(McpError::ReadOnly(name.to_string()));
        }

        let args = args.unwrap_or(Value::Object(serde_json::Map::new()));
        tracing::debug!("Executing tool: {name}");
        handler.execute(name, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FakeTools {
        category: &'static str,
        names: Vec<&'static str>,
    }

    #[async_trait::async_trait]
    impl ToolHandler for FakeTools {
        fn category(&self) -> &'static str {
            self.category
        }

        fn definitions(&self) -> Vec<ToolDefinition> {
            self.names
                .iter()
                .map(|name| ToolDefinition {
                    name: name.to_string(),
                    description: None,
                    input_schema: json!({ "type": "object" }),
                })
                .collect()
        }

        fn write_tools(&self) -> &'static [&'static str] {
            &[]
        }

        async fn execute(&self, name: &str, _args: Value) -> McpResult<ToolCallResult> {
            Ok(ToolCallResult::text(name.to_string()))
        }
    }

    fn router(allow_list: Option<Vec<String>>) -> ToolRouter {
        ToolRouter::new(
            vec![
                Arc::new(FakeTools {
                    category: "svcA",
                    names: vec!["svcA_search", "svcA_get"],
                }),
                Arc::new(FakeTools {
                    category: "svcB",
                    names: vec!["svcB_search"],
                }),
            ],
            allow_list,
            false,
        )
    }

    fn names(tools: &[ToolDefinition]) -> Vec<&str> {
        tools.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn absent_allow_list_returns_catalog_unchanged() {
        let router = router(None);
        assert_eq!(
            names(&router.enabled_tools()),
            vec!["svcA_search", "svcA_get", "svcB_search"]
        );
    }

    #[test]
    fn empty_allow_list_returns_catalog_unchanged() {
        let router = router(Some(vec![]));
        assert_eq!(names(&router.enabled_tools()).len(), 3);
    }

    #[test]
    fn allow_list_filters_preserving_order() {
        let router = router(Some(vec![
            "svcB_search".to_string(),
            "svcA_search".to_string(),
        ]));
        // Catalog order wins, not allow-list order.
        assert_eq!(
            names(&router.enabled_tools()),
            vec!["svcA_search", "svcB_search"]
        );
    }

    #[test]
    fn allow_list_with_unknown_names_is_a_strict_subset() {
        let router = router(Some(vec!["svcA_get".to_string(), "nope".to_string()]));
        assert_eq!(names(&router.enabled_tools()), vec!["svcA_get"]);
    }
}
