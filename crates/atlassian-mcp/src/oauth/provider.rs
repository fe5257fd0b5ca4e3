//! Provider endpoint calls — token exchange and resource discovery.

use serde::Deserialize;

use super::{OAuthConfig, OAuthEndpoints, OAuthError};

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// One site the token grants access to.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessibleResource {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Step 5: exchange the one-time authorization code for tokens. Provider
/// error descriptions are surfaced verbatim.
pub async fn exchange_code(
    endpoints: &OAuthEndpoints,
    config: &OAuthConfig,
    code: &str,
) -> Result<TokenResponse, OAuthError> {
    let response = reqwest::Client::new()
        .post(&endpoints.token)
        .json(&serde_json::json!({
            "grant_type": "authorization_code",
            "client_id": config.client_id,
            "client_secret": config.client_secret,
            "code": code,
            "redirect_uri": config.redirect_uri,
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ProviderErrorBody>(&body)
            .ok()
            .and_then(|e| e.error_description.or(e.error))
            .unwrap_or(body);
        return Err(OAuthError::Exchange(format!("({status}) {detail}")));
    }

    Ok(response.json::<TokenResponse>().await?)
}

/// Step 6: resolve the cloud id from the accessible-resources endpoint.
/// Zero resources is fatal; with several, the first is selected and the
/// full list is printed so the operator can override it later.
pub async fn discover_cloud_id(
    endpoints: &OAuthEndpoints,
    access_token: &str,
) -> Result<String, OAuthError> {
    let response = reqwest::Client::new()
        .get(&endpoints.accessible_resources)
        .bearer_auth(access_token)
        .header("Accept", "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(OAuthError::ResourceDiscovery(format!("({status}) {body}")));
    }

    let resources = response.json::<Vec<AccessibleResource>>().await?;
    select_resource(&resources).map(|r| r.id.clone())
}

fn select_resource(resources: &[AccessibleResource]) -> Result<&AccessibleResource, OAuthError> {
    match resources {
        [] => Err(OAuthError::ResourceDiscovery(
            "No accessible Atlassian resources found".to_string(),
        )),
        [only] => {
            tracing::info!("Auto-detected Cloud ID: {} ({})", only.id, only.name);
            Ok(only)
        }
        [first, ..] => {
            println!("\nMultiple Atlassian resources found:");
            for (index, resource) in resources.iter().enumerate() {
                println!("{}. {} ({})", index + 1, resource.name, resource.id);
            }
            println!("Using first resource: {} ({})", first.name, first.id);
            Ok(first)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: &str, name: &str) -> AccessibleResource {
        AccessibleResource {
            id: id.to_string(),
            name: name.to_string(),
            url: None,
        }
    }

    #[test]
    fn zero_resources_is_fatal() {
        assert!(matches!(
            select_resource(&[]),
            Err(OAuthError::ResourceDiscovery(_))
        ));
    }

    #[test]
    fn single_resource_is_selected() {
        let resources = [resource("abc", "Site A")];
        assert_eq!(select_resource(&resources).unwrap().id, "abc");
    }

    #[test]
    fn multiple_resources_select_the_first() {
        let resources = [resource("abc", "Site A"), resource("def", "Site B")];
        assert_eq!(select_resource(&resources).unwrap().id, "abc");
    }
}
