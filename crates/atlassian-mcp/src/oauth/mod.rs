//! OAuth 2.0 setup wizard for Atlassian Cloud.
//!
//! A one-shot, strictly ordered flow: collect configuration, bind a
//! loopback listener, print the authorization URL, wait for exactly one
//! callback, exchange the code for tokens, resolve the cloud id, and
//! report the resulting configuration. Nothing is persisted; any failure
//! aborts the whole wizard and the operator restarts it.

pub mod listener;
pub mod provider;

use std::io::{BufRead, Write};
use std::time::Duration;

pub use listener::{CallbackListener, CallbackOutcome};
pub use provider::{exchange_code, discover_cloud_id, AccessibleResource, TokenResponse};

/// How long the loopback listener waits for the browser redirect.
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/callback";
pub const DEFAULT_SCOPE: &str = "read:jira-work write:jira-work \
read:confluence-content.all write:confluence-content offline_access";

/// All errors the setup flow can produce, one per failing step.
#[derive(thiserror::Error, Debug)]
pub enum OAuthError {
    #[error("Port {port} is already in use. Close the application using it and retry.")]
    Bind { port: u16 },

    #[error("Authorization failed: {error}: {description}")]
    Provider { error: String, description: String },

    #[error("Timed out waiting for the OAuth callback")]
    Timeout,

    #[error("Token exchange failed: {0}")]
    Exchange(String),

    #[error("Accessible-resources lookup failed: {0}")]
    ResourceDiscovery(String),

    #[error("Invalid redirect URI: {0}")]
    InvalidRedirectUri(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration collected in step 1. Created fresh per wizard run,
/// discarded after the report.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
    pub cloud_id: Option<String>,
}

/// Provider endpoints. Defaults target Atlassian Cloud; tests point them
/// at stub servers.
#[derive(Debug, Clone)]
pub struct OAuthEndpoints {
    pub authorize: String,
    pub token: String,
    pub accessible_resources: String,
}

impl Default for OAuthEndpoints {
    fn default() -> Self {
        Self {
            authorize: "https://auth.atlassian.com/authorize".to_string(),
            token: "https://auth.atlassian.com/oauth/token".to_string(),
            accessible_resources: "https://api.atlassian.com/oauth/token/accessible-resources"
                .to_string(),
        }
    }
}

/// Run the interactive wizard end to end against the real provider.
pub async fn run_setup() -> Result<(), OAuthError> {
    let stdin = std::io::stdin();
    let config = collect_config(&mut stdin.lock())?;
    run_setup_with(config, &OAuthEndpoints::default(), CALLBACK_TIMEOUT).await
}

/// Steps 2-7, separated from the interactive collect so the flow can be
/// driven with prepared configuration.
pub async fn run_setup_with(
    mut config: OAuthConfig,
    endpoints: &OAuthEndpoints,
    timeout: Duration,
) -> Result<(), OAuthError> {
    let port = redirect_port(&config.redirect_uri)?;
    let listener = CallbackListener::bind(port).await?;
    tracing::info!("Callback server started on http://localhost:{port}");

    let state = uuid::Uuid::new_v4().simple().to_string();
    let auth_url = build_authorization_url(endpoints, &config, &state);

    println!("\nOpen this URL in your browser to authorize the application:\n");
    println!("{auth_url}\n");

    let code = match listener.wait_for_callback(&state, timeout).await? {
        CallbackOutcome::Code(code) => code,
        CallbackOutcome::ProviderError { error, description } => {
            return Err(OAuthError::Provider { error, description });
        }
    };

    let tokens = exchange_code(endpoints, &config, &code).await?;

    if config.cloud_id.is_none() {
        config.cloud_id = Some(discover_cloud_id(endpoints, &tokens.access_token).await?);
    }

    report(&config, &tokens);
    Ok(())
}

/// Step 1: interactive prompts. Reads from any `BufRead` so the collect
/// step itself stays testable.
pub fn collect_config(input: &mut impl BufRead) -> std::io::Result<OAuthConfig> {
    let client_id = prompt(input, "Enter your OAuth Client ID: ")?;
    let client_secret = prompt(input, "Enter your OAuth Client Secret: ")?;

    let redirect_uri = prompt(
        input,
        &format!("Enter your Redirect URI (default: {DEFAULT_REDIRECT_URI}): "),
    )?;
    let redirect_uri = if redirect_uri.is_empty() {
        DEFAULT_REDIRECT_URI.to_string()
    } else {
        redirect_uri
    };

    let scope = prompt(
        input,
        &format!("Enter OAuth scopes (default: {DEFAULT_SCOPE}): "),
    )?;
    let scope = if scope.is_empty() {
        DEFAULT_SCOPE.to_string()
    } else {
        scope
    };

    let cloud_id = prompt(input, "Enter your Cloud ID (optional, will auto-detect): ")?;
    let cloud_id = if cloud_id.is_empty() {
        None
    } else {
        Some(cloud_id)
    };

    Ok(OAuthConfig {
        client_id,
        client_secret,
        redirect_uri,
        scope,
        cloud_id,
    })
}

fn prompt(input: &mut impl BufRead, message: &str) -> std::io::Result<String> {
    print!("{message}");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

/// Step 3: the authorization URL the operator opens in a browser.
pub fn build_authorization_url(
    endpoints: &OAuthEndpoints,
    config: &OAuthConfig,
    state: &str,
) -> String {
    let mut url = match url::Url::parse(&endpoints.authorize) {
        Ok(url) => url,
        Err(_) => return endpoints.authorize.clone(),
    };
    url.query_pairs_mut()
        .append_pair("audience", "api.atlassian.com")
        .append_pair("client_id", &config.client_id)
        .append_pair("scope", &config.scope)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("state", state)
        .append_pair("response_type", "code")
        .append_pair("prompt", "consent");
    url.to_string()
}

/// The loopback port comes from the redirect URI; no port hunting.
fn redirect_port(redirect_uri: &str) -> Result<u16, OAuthError> {
    let url = url::Url::parse(redirect_uri)
        .map_err(|e| OAuthError::InvalidRedirectUri(e.to_string()))?;
    Ok(url.port().unwrap_or(8080))
}

/// Step 7: print every resulting value; persisting them is the
/// operator's choice.
fn report(config: &OAuthConfig, tokens: &TokenResponse) {
    println!("\nOAuth setup completed successfully.");
    println!("\nAdd these environment variables to your configuration:\n");
    println!("ATLASSIAN_OAUTH_CLIENT_ID={}", config.client_id);
    println!("ATLASSIAN_OAUTH_CLIENT_SECRET={}", config.client_secret);
    println!("ATLASSIAN_OAUTH_REDIRECT_URI={}", config.redirect_uri);
    println!("ATLASSIAN_OAUTH_SCOPE={}", config.scope);
    if let Some(cloud_id) = &config.cloud_id {
        println!("ATLASSIAN_OAUTH_CLOUD_ID={cloud_id}");
    }
    println!("ATLASSIAN_OAUTH_ACCESS_TOKEN={}", tokens.access_token);
    if let Some(refresh_token) = &tokens.refresh_token {
        println!("ATLASSIAN_OAUTH_REFRESH_TOKEN={refresh_token}");
    }
    println!("\nKeep these credentials secure and do not commit them to version control.");

    if let Some(cloud_id) = &config.cloud_id {
        println!("\nYour Atlassian URLs for configuration:");
        println!("JIRA_URL=https://api.atlassian.com/ex/jira/{cloud_id}");
        println!("CONFLUENCE_URL=https://api.atlassian.com/ex/confluence/{cloud_id}/wiki");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OAuthConfig {
        OAuthConfig {
            client_id: "cid".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:8080/callback".to_string(),
            scope: "read:jira-work".to_string(),
            cloud_id: None,
        }
    }

    #[test]
    fn authorization_url_carries_required_params() {
        let url = build_authorization_url(&OAuthEndpoints::default(), &config(), "nonce123");
        assert!(url.starts_with("https://auth.atlassian.com/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("state=nonce123"));
        assert!(url.contains("client_id=cid"));
    }

    #[test]
    fn redirect_port_parses_and_defaults() {
        assert_eq!(redirect_port("http://localhost:9123/callback").unwrap(), 9123);
        assert_eq!(redirect_port("http://localhost/callback").unwrap(), 8080);
        assert!(redirect_port("not a uri").is_err());
    }

    #[test]
    fn collect_config_applies_defaults() {
        let mut input = std::io::Cursor::new("my-id\nmy-secret\n\n\n\n");
        let config = collect_config(&mut input).unwrap();
        assert_eq!(config.client_id, "my-id");
        assert_eq!(config.client_secret, "my-secret");
        assert_eq!(config.redirect_uri, DEFAULT_REDIRECT_URI);
        assert_eq!(config.scope, DEFAULT_SCOPE);
        assert!(config.cloud_id.is_none());
    }
}
