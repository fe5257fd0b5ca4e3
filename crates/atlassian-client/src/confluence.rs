//! Confluence REST client — CQL search, page retrieval and editing, spaces.

use std::time::Duration;

use serde_json::{json, Value};

use crate::config::{ConfluenceConfig, Credentials};
use crate::error::ClientResult;
use crate::jira::{apply_credentials, check_response};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ConfluenceClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    spaces_filter: Option<String>,
}

impl ConfluenceClient {
    pub fn new(config: &ConfluenceConfig) -> ClientResult<Self> {
        url::Url::parse(&config.base_url)?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        tracing::info!("Confluence client initialized for {}", config.base_url);

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: config.credentials.clone(),
            spaces_filter: config.spaces_filter.clone(),
        })
    }

    /// Search content with CQL. An explicit space key narrows the query to
    /// that space; otherwise a configured spaces filter applies.
    pub async fn search(
        &self,
        cql: &str,
        space_key: Option<&str>,
        limit: u32,
    ) -> ClientResult<Value> {
        let effective_cql = compose_space_filter(cql, space_key, self.spaces_filter.as_deref());

        let params = vec![
            ("cql".to_string(), effective_cql),
            ("limit".to_string(), limit.to_string()),
        ];
        self.get("/rest/api/content/search", &params).await
    }

    pub async fn get_page(&self, page_id: &str, expand: Option<&str>) -> ClientResult<Value> {
        let mut params = Vec::new();
        if let Some(expand) = expand.filter(|e| !e.trim().is_empty()) {
            params.push(("expand".to_string(), expand.to_string()));
        }
        self.get(&format!("/rest/api/content/{page_id}"), &params)
            .await
    }

    pub async fn create_page(
        &self,
        space_key: &str,
        title: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> ClientResult<Value> {
        let mut body = json!({
            "type": "page",
            "title": title,
            "space": { "key": space_key },
            "body": {
                "storage": {
                    "value": content,
                    "representation": "storage",
                }
            },
        });
        if let Some(parent_id) = parent_id {
            body["ancestors"] = json!([{ "id": parent_id }]);
        }

        let created = self.post("/rest/api/content", &body).await?;
        tracing::info!("Created page: {}", created["id"].as_str().unwrap_or("?"));
        Ok(created)
    }

    /// Update a page. `version` must be the page's current version number;
    /// the API requires the incremented value in the payload.
    pub async fn update_page(
        &self,
        page_id: &str,
        title: &str,
        content: &str,
        version: u64,
    ) -> ClientResult<Value> {
        let body = json!({
            "type": "page",
            "title": title,
            "version": { "number": version + 1 },
            "body": {
                "storage": {
                    "value": content,
                    "representation": "storage",
                }
            },
        });

        let updated = self
            .put(&format!("/rest/api/content/{page_id}"), &body)
            .await?;
        tracing::info!("Updated page: {page_id}");
        Ok(updated)
    }

    pub async fn get_spaces(&self, limit: u32, start: u32) -> ClientResult<Value> {
        let params = vec![
            ("limit".to_string(), limit.to_string()),
            ("start".to_string(), start.to_string()),
        ];
        self.get("/rest/api/space", &params).await
    }

    async fn get(&self, path: &str, params: &[(String, String)]) -> ClientResult<Value> {
        let request = self
            .http
            .get(format!("{}{path}", self.base_url))
            .query(params);
        check_response(apply_credentials(request, &self.credentials).send().await?).await
    }

    async fn post(&self, path: &str, body: &Value) -> ClientResult<Value> {
        let request = self.http.post(format!("{}{path}", self.base_url)).json(body);
        check_response(apply_credentials(request, &self.credentials).send().await?).await
    }

    async fn put(&self, path: &str, body: &Value) -> ClientResult<Value> {
        let request = self.http.put(format!("{}{path}", self.base_url)).json(body);
        check_response(apply_credentials(request, &self.credentials).send().await?).await
    }
}

/// Compose the effective CQL query from the caller's query, an explicit
/// space key, and the configured spaces filter. The explicit key wins.
fn compose_space_filter(cql: &str, space_key: Option<&str>, spaces_filter: Option<&str>) -> String {
    if let Some(space_key) = space_key.filter(|k| !k.trim().is_empty()) {
        return format!("space = {space_key} AND {cql}");
    }
    if let Some(filter) = spaces_filter {
        let spaces: Vec<&str> = filter.split(',').map(str::trim).collect();
        return format!("space in ({}) AND {cql}", spaces.join(","));
    }
    cql.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_base_url() {
        let config = ConfluenceConfig {
            base_url: "://missing-scheme".to_string(),
            credentials: Credentials::PersonalToken("t".to_string()),
            spaces_filter: None,
        };
        assert!(matches!(
            ConfluenceClient::new(&config),
            Err(crate::error::ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn explicit_space_key_wins_over_filter() {
        assert_eq!(
            compose_space_filter("type = page", Some("DEV"), Some("DOCS,OPS")),
            "space = DEV AND type = page"
        );
    }

    #[test]
    fn spaces_filter_applies_without_explicit_key() {
        assert_eq!(
            compose_space_filter("type = page", None, Some("DOCS, OPS")),
            "space in (DOCS,OPS) AND type = page"
        );
    }

    #[test]
    fn query_unchanged_without_filters() {
        assert_eq!(compose_space_filter("text ~ \"x\"", None, None), "text ~ \"x\"");
    }
}
