//! Jira REST client — issue search, retrieval, creation, and comments.

use std::time::Duration;

use serde_json::{json, Value};

use crate::config::{Credentials, JiraConfig};
use crate::error::{ClientError, ClientResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    projects_filter: Option<String>,
}

impl JiraClient {
    pub fn new(config: &JiraConfig) -> ClientResult<Self> {
        url::Url::parse(&config.base_url)?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        tracing::info!("Jira client initialized for {}", config.base_url);

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: config.credentials.clone(),
            projects_filter: config.projects_filter.clone(),
        })
    }

    /// Search issues with JQL. A configured projects filter narrows the
    /// query to those projects regardless of what the caller asked for.
    pub async fn search_issues(
        &self,
        jql: &str,
        fields: Option<&[String]>,
        max_results: u32,
    ) -> ClientResult<Value> {
        let effective_jql = compose_project_filter(jql, self.projects_filter.as_deref());

        let mut params = vec![
            ("jql".to_string(), effective_jql),
            ("maxResults".to_string(), max_results.to_string()),
        ];
        if let Some(fields) = fields.filter(|f| !f.is_empty()) {
            params.push(("fields".to_string(), fields.join(",")));
        }

        self.get("/rest/api/2/search", &params).await
    }

    pub async fn get_issue(
        &self,
        issue_key: &str,
        fields: Option<&[String]>,
        expand: Option<&[String]>,
    ) -> ClientResult<Value> {
        let mut params = Vec::new();
        if let Some(fields) = fields.filter(|f| !f.is_empty()) {
            params.push(("fields".to_string(), fields.join(",")));
        }
        if let Some(expand) = expand.filter(|e| !e.is_empty()) {
            params.push(("expand".to_string(), expand.join(",")));
        }

        self.get(&format!("/rest/api/2/issue/{issue_key}"), &params)
            .await
    }

    pub async fn create_issue(
        &self,
        project_key: &str,
        issue_type: &str,
        summary: &str,
        description: Option<&str>,
        priority: Option<&str>,
    ) -> ClientResult<Value> {
        let mut fields = json!({
            "project": { "key": project_key },
            "issuetype": { "name": issue_type },
            "summary": summary,
        });
        if let Some(description) = description {
            fields["description"] = json!(description);
        }
        if let Some(priority) = priority {
            fields["priority"] = json!({ "name": priority });
        }

        let created = self
            .post("/rest/api/2/issue", &json!({ "fields": fields }))
            .await?;
        tracing::info!("Created issue: {}", created["key"].as_str().unwrap_or("?"));
        Ok(created)
    }

    pub async fn update_issue(&self, issue_key: &str, fields: Value) -> ClientResult<Value> {
        let result = self
            .put(
                &format!("/rest/api/2/issue/{issue_key}"),
                &json!({ "fields": fields }),
            )
            .await?;
        tracing::info!("Updated issue: {issue_key}");
        Ok(result)
    }

    pub async fn add_comment(&self, issue_key: &str, body: &str) -> ClientResult<Value> {
        let result = self
            .post(
                &format!("/rest/api/2/issue/{issue_key}/comment"),
                &json!({ "body": body }),
            )
            .await?;
        tracing::info!("Added comment to issue: {issue_key}");
        Ok(result)
    }

    pub async fn get_projects(&self) -> ClientResult<Value> {
        self.get("/rest/api/2/project", &[]).await
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

pub(crate) fn apply_credentials(
    request: reqwest::RequestBuilder,
    credentials: &Credentials,
) -> reqwest::RequestBuilder {
    match credentials {
        Credentials::PersonalToken(token) => request.bearer_auth(token),
        Credentials::Basic {
            username,
            api_token,
        } => request.basic_auth(username, Some(api_token)),
    }
}

pub(crate) async fn check_response(response: reqwest::Response) -> ClientResult<Value> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }

    // Some write endpoints (issue update) return 204 with an empty body.
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(&text).map_err(|e| ClientError::Api {
        status: status.as_u16(),
        message: format!("invalid JSON body: {e}"),
    })
}

/// Wrap a JQL query with a configured project restriction.
fn compose_project_filter(jql: &str, projects_filter: Option<&str>) -> String {
    match projects_filter {
        Some(filter) => {
            let projects: Vec<&str> = filter.split(',').map(str::trim).collect();
            format!("project in ({}) AND ({jql})", projects.join(","))
        }
        None => jql.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_base_url() {
        let config = JiraConfig {
            base_url: "not a url".to_string(),
            credentials: Credentials::PersonalToken("t".to_string()),
            projects_filter: None,
        };
        assert!(matches!(
            JiraClient::new(&config),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn jql_unchanged_without_filter() {
        assert_eq!(
            compose_project_filter("assignee = currentUser()", None),
            "assignee = currentUser()"
        );
    }

    #[test]
    fn jql_wrapped_with_project_filter() {
        assert_eq!(
            compose_project_filter("status = Open", Some("PROJ, OPS")),
            "project in (PROJ,OPS) AND (status = Open)"
        );
    }
}
