//! One-shot loopback listener for the OAuth redirect callback.
//!
//! The listener accepts connections until the first terminal event: a
//! callback carrying a code, a callback carrying a provider error, or the
//! deadline. `wait_for_callback` consumes the listener, so the socket is
//! closed on every exit path and later callbacks find nothing to talk to.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::OAuthError;

/// Terminal result of the callback wait.
#[derive(Debug)]
pub enum CallbackOutcome {
    Code(String),
    ProviderError { error: String, description: String },
}

#[derive(Debug)]
pub struct CallbackListener {
    listener: TcpListener,
}

impl CallbackListener {
    /// Bind the loopback listener. A port already in use is fatal; the
    /// flow never hunts for a free port.
    pub async fn bind(port: u16) -> Result<Self, OAuthError> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AddrInUse => OAuthError::Bind { port },
                _ => OAuthError::Io(e),
            })?;
        Ok(Self { listener })
    }

    pub fn local_port(&self) -> Result<u16, OAuthError> {
        Ok(self.listener.local_addr()?.port())
    }

    /// Block until the first terminal event or the deadline. Non-callback
    /// requests (favicon probes and the like) get a 404 and the wait
    /// continues; a state-nonce mismatch gets a 400 and the wait continues.
    pub async fn wait_for_callback(
        self,
        expected_state: &str,
        timeout: Duration,
    ) -> Result<CallbackOutcome, OAuthError> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let accepted = tokio::time::timeout_at(deadline, self.listener.accept()).await;
            let (mut stream, _) = match accepted {
                Ok(Ok(conn)) => conn,
                Ok(Err(e)) => return Err(OAuthError::Io(e)),
                Err(_) => return Err(OAuthError::Timeout),
            };

            let Some(target) = read_request_target(&mut stream).await else {
                continue;
            };

            let Some(query) = callback_query(&target) else {
                respond(&mut stream, "404 Not Found", NOT_FOUND_PAGE).await;
                continue;
            };

            if let Some(error) = query_param(&query, "error") {
                let description = query_param(&query, "error_description")
                    .unwrap_or_else(|| "Unknown error".to_string());
                respond(
                    &mut stream,
                    "400 Bad Request",
                    &failure_page(&error, &description),
                )
                .await;
                return Ok(CallbackOutcome::ProviderError { error, description });
            }

            match query_param(&query, "code") {
                Some(code) if query_param(&query, "state").as_deref() == Some(expected_state) => {
                    respond(&mut stream, "200 OK", SUCCESS_PAGE).await;
                    return Ok(CallbackOutcome::Code(code));
                }
                Some(_) => {
                    tracing::warn!("Callback state nonce mismatch, ignoring request");
                    respond(
                        &mut stream,
                        "400 Bad Request",
                        &failure_page("invalid_state", "State token did not match this session"),
                    )
                    .await;
                }
                None => {
                    respond(&mut stream, "404 Not Found", NOT_FOUND_PAGE).await;
                }
            }
        }
    }
}

/// Read the request line and return its target, e.g. `/callback?code=x`.
/// Reads until the line terminator arrives, so a request split across
/// TCP segments does not truncate the query string.
async fn read_request_target(stream: &mut TcpStream) -> Option<String> {
    let mut buffer = vec![0_u8; 8 * 1024];
    let mut filled = 0;

    while !buffer[..filled].contains(&b'\n') {
        if filled == buffer.len() {
            break;
        }
        let bytes_read = stream.read(&mut buffer[filled..]).await.ok()?;
        if bytes_read == 0 {
            break;
        }
        filled += bytes_read;
    }

    if filled == 0 {
        return None;
    }

    let request = String::from_utf8_lossy(&buffer[..filled]).into_owned();
    let first_line = request.lines().next()?;
    let mut parts = first_line.split_whitespace();
    let _method = parts.next()?;
    parts.next().map(str::to_string)
}

/// Return the query string when the target hits the callback path.
fn callback_query(target: &str) -> Option<String> {
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    };
    (path == "/callback").then(|| query.to_string())
}

fn query_param(query: &str, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        tracing::debug!("Failed to write callback response: {e}");
    }
    let _ = stream.shutdown().await;
}

const SUCCESS_PAGE: &str = "<html><body>\
<h1>Authorization Successful</h1>\
<p>You can close this window and return to the terminal.</p>\
</body></html>";

const NOT_FOUND_PAGE: &str = "<html><body><h1>Not Found</h1></body></html>";

fn failure_page(error: &str, description: &str) -> String {
    format!(
        "<html><body>\
         <h1>Authorization Failed</h1>\
         <p>Error: {error}</p>\
         <p>Description: {description}</p>\
         </body></html>"
    )
}
