//! Error types for the REST clients.

/// All errors that can occur while talking to Jira or Confluence.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the upstream API, body preserved for diagnostics.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

pub type ClientResult<T> = Result<T, ClientError>;
