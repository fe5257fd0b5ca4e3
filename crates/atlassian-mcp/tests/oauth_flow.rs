//! Integration tests for the OAuth setup flow.
//!
//! The callback listener is driven with raw TCP clients standing in for
//! the browser redirect; provider endpoints are stubbed with local axum
//! servers so token exchange and resource discovery run against real HTTP.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use atlassian_mcp::oauth::{
    build_authorization_url, discover_cloud_id, exchange_code, CallbackListener, CallbackOutcome,
    OAuthConfig, OAuthEndpoints, OAuthError,
};

// ─────────────────────── helpers ───────────────────────

fn test_config(redirect_uri: &str) -> OAuthConfig {
    OAuthConfig {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        redirect_uri: redirect_uri.to_string(),
        scope: "read:jira-work".to_string(),
        cloud_id: None,
    }
}

/// Simulate the browser redirect: one HTTP GET, response read to EOF.
async fn browser_get(port: u16, target: &str) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let request = format!("GET {target} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

/// Serve a stub provider router on an ephemeral port, returning its base URL.
async fn spawn_stub_provider(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

// ─────────────────────── callback listener ───────────────────────

#[tokio::test]
async fn callback_with_code_and_matching_state_succeeds() {
    let listener = CallbackListener::bind(0).await.unwrap();
    let port = listener.local_port().unwrap();

    let client = tokio::spawn(async move {
        browser_get(port, "/callback?code=authcode123&state=NONCE").await
    });

    let outcome = listener
        .wait_for_callback("NONCE", Duration::from_secs(5))
        .await
        .unwrap();

    match outcome {
        CallbackOutcome::Code(code) => assert_eq!(code, "authcode123"),
        other => panic!("expected code, got {other:?}"),
    }

    let response = client.await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.contains("Authorization Successful"));

    // The listener was consumed by the resolved wait, so a late second
    // callback finds nothing listening and cannot alter the outcome.
    assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
}

#[tokio::test]
async fn callback_split_across_tcp_segments_still_parses() {
    let listener = CallbackListener::bind(0).await.unwrap();
    let port = listener.local_port().unwrap();

    // The redirect arrives in two segments with the query string cut in
    // the middle; the listener must keep reading until the line ends.
    let client = tokio::spawn(async move {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream.write_all(b"GET /callback?code=split").await.unwrap();
        stream.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        stream
            .write_all(b"-code&state=S HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    });

    let outcome = listener
        .wait_for_callback("S", Duration::from_secs(5))
        .await
        .unwrap();

    match outcome {
        CallbackOutcome::Code(code) => assert_eq!(code, "split-code"),
        other => panic!("expected code, got {other:?}"),
    }

    let response = client.await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"));
}

#[tokio::test]
async fn provider_error_callback_is_terminal() {
    let listener = CallbackListener::bind(0).await.unwrap();
    let port = listener.local_port().unwrap();

    let client = tokio::spawn(async move {
        browser_get(
            port,
            "/callback?error=access_denied&error_description=User%20declined",
        )
        .await
    });

    let outcome = listener
        .wait_for_callback("NONCE", Duration::from_secs(5))
        .await
        .unwrap();

    match outcome {
        CallbackOutcome::ProviderError { error, description } => {
            assert_eq!(error, "access_denied");
            assert_eq!(description, "User declined");
        }
        other => panic!("expected provider error, got {other:?}"),
    }

    let response = client.await.unwrap();
    assert!(response.starts_with("HTTP/1.1 400 Bad Request"));
}

#[tokio::test]
async fn state_mismatch_is_rejected_but_not_terminal() {
    let listener = CallbackListener::bind(0).await.unwrap();
    let port = listener.local_port().unwrap();

    let client = tokio::spawn(async move {
        let forged = browser_get(port, "/callback?code=evil&state=WRONG").await;
        assert!(forged.starts_with("HTTP/1.1 400 Bad Request"));

        browser_get(port, "/callback?code=good&state=RIGHT").await
    });

    let outcome = listener
        .wait_for_callback("RIGHT", Duration::from_secs(5))
        .await
        .unwrap();

    match outcome {
        CallbackOutcome::Code(code) => assert_eq!(code, "good"),
        other => panic!("expected code, got {other:?}"),
    }

    client.await.unwrap();
}

#[tokio::test]
async fn stray_requests_get_404_and_the_wait_continues() {
    let listener = CallbackListener::bind(0).await.unwrap();
    let port = listener.local_port().unwrap();

    let client = tokio::spawn(async move {
        let probe = browser_get(port, "/favicon.ico").await;
        assert!(probe.starts_with("HTTP/1.1 404 Not Found"));

        browser_get(port, "/callback?code=after-probe&state=S").await
    });

    let outcome = listener
        .wait_for_callback("S", Duration::from_secs(5))
        .await
        .unwrap();

    match outcome {
        CallbackOutcome::Code(code) => assert_eq!(code, "after-probe"),
        other => panic!("expected code, got {other:?}"),
    }

    client.await.unwrap();
}

#[tokio::test]
async fn timeout_releases_the_port_for_a_retry() {
    let listener = CallbackListener::bind(0).await.unwrap();
    let port = listener.local_port().unwrap();

    let err = listener
        .wait_for_callback("NONCE", Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, OAuthError::Timeout));

    // The socket was closed on the timeout path, so the wizard can be
    // restarted on the same port immediately.
    let rebound = CallbackListener::bind(port).await.unwrap();
    assert_eq!(rebound.local_port().unwrap(), port);
}

#[tokio::test]
async fn bind_conflict_names_the_port() {
    let holder = CallbackListener::bind(0).await.unwrap();
    let port = holder.local_port().unwrap();

    let err = CallbackListener::bind(port).await.unwrap_err();
    match err {
        OAuthError::Bind { port: reported } => assert_eq!(reported, port),
        other => panic!("expected bind error, got {other:?}"),
    }
}

// ─────────────────────── provider endpoints ───────────────────────

#[tokio::test]
async fn exchange_code_posts_the_grant_and_parses_tokens() {
    let router = axum::Router::new().route(
        "/token",
        axum::routing::post(|axum::Json(body): axum::Json<serde_json::Value>| async move {
            assert_eq!(body["grant_type"], "authorization_code");
            assert_eq!(body["code"], "authcode123");
            assert_eq!(body["client_id"], "test-client");
            axum::Json(serde_json::json!({
                "access_token": "at-1",
                "refresh_token": "rt-1",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "read:jira-work"
            }))
        }),
    );
    let base = spawn_stub_provider(router).await;

    let endpoints = OAuthEndpoints {
        authorize: format!("{base}/authorize"),
        token: format!("{base}/token"),
        accessible_resources: format!("{base}/resources"),
    };
    let config = test_config("http://localhost:8080/callback");

    let tokens = exchange_code(&endpoints, &config, "authcode123")
        .await
        .unwrap();
    assert_eq!(tokens.access_token, "at-1");
    assert_eq!(tokens.refresh_token.as_deref(), Some("rt-1"));
    assert_eq!(tokens.expires_in, Some(3600));
}

#[tokio::test]
async fn exchange_failure_surfaces_the_provider_description() {
    let router = axum::Router::new().route(
        "/token",
        axum::routing::post(|| async {
            (
                axum::http::StatusCode::FORBIDDEN,
                axum::Json(serde_json::json!({
                    "error": "invalid_grant",
                    "error_description": "Authorization code expired"
                })),
            )
        }),
    );
    let base = spawn_stub_provider(router).await;

    let endpoints = OAuthEndpoints {
        authorize: format!("{base}/authorize"),
        token: format!("{base}/token"),
        accessible_resources: format!("{base}/resources"),
    };
    let config = test_config("http://localhost:8080/callback");

    let err = exchange_code(&endpoints, &config, "stale").await.unwrap_err();
    match err {
        OAuthError::Exchange(detail) => assert!(detail.contains("Authorization code expired")),
        other => panic!("expected exchange error, got {other:?}"),
    }
}

#[tokio::test]
async fn cloud_id_discovery_picks_the_first_resource() {
    let router = axum::Router::new().route(
        "/resources",
        axum::routing::get(|| async {
            axum::Json(serde_json::json!([
                { "id": "cloud-1", "name": "Site One", "url": "https://one.atlassian.net" },
                { "id": "cloud-2", "name": "Site Two" }
            ]))
        }),
    );
    let base = spawn_stub_provider(router).await;

    let endpoints = OAuthEndpoints {
        authorize: format!("{base}/authorize"),
        token: format!("{base}/token"),
        accessible_resources: format!("{base}/resources"),
    };

    let cloud_id = discover_cloud_id(&endpoints, "at-1").await.unwrap();
    assert_eq!(cloud_id, "cloud-1");
}

#[tokio::test]
async fn discovery_with_no_resources_fails() {
    let router = axum::Router::new().route(
        "/resources",
        axum::routing::get(|| async { axum::Json(serde_json::json!([])) }),
    );
    let base = spawn_stub_provider(router).await;

    let endpoints = OAuthEndpoints {
        authorize: format!("{base}/authorize"),
        token: format!("{base}/token"),
        accessible_resources: format!("{base}/resources"),
    };

    let err = discover_cloud_id(&endpoints, "at-1").await.unwrap_err();
    assert!(matches!(err, OAuthError::ResourceDiscovery(_)));
}

// ─────────────────────── authorization URL ───────────────────────

#[test]
fn authorization_url_encodes_scopes_and_state() {
    let config = OAuthConfig {
        scope: "read:jira-work write:jira-work".to_string(),
        ..test_config("http://localhost:9000/callback")
    };

    let url = build_authorization_url(&OAuthEndpoints::default(), &config, "nonce-1");
    assert!(url.contains("scope=read%3Ajira-work+write%3Ajira-work"));
    assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A9000%2Fcallback"));
    assert!(url.contains("state=nonce-1"));
    assert!(url.contains("audience=api.atlassian.com"));
}
