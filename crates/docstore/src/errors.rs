use serde::Deserialize;
use thiserror::Error;

/// Failure to obtain an authenticated handle to the database.
#[derive(Error, Debug)]
pub enum AuthenticationError {
    #[error("Credential file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed credential file: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Credential type is {0:?}, expected \"service_account\"")]
    NotServiceAccount(String),

    #[error("No project id in credential file or configuration")]
    MissingProjectId,

    #[error("Invalid private key: {0}")]
    InvalidKey(jsonwebtoken::errors::Error),

    #[error("Failed to sign token assertion: {0}")]
    Signing(jsonwebtoken::errors::Error),

    #[error("Token request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Token endpoint rejected credential ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Failure of a single create-record call.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Not authorized: {0}")]
    Unauthorized(#[from] AuthenticationError),

    #[error("Write rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid collection name {0:?}")]
    InvalidCollection(String),

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

/// Google API error envelope: `{"error": {"code": .., "message": .., "status": ..}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct GoogleErrorEnvelope {
    pub error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoogleErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// OAuth2 token endpoint error body.
#[derive(Debug, Deserialize)]
pub(crate) struct OAuthErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Extracts a readable message from an error response body.
///
/// Understands both the Google API envelope and the plain OAuth2 error shape,
/// falling back to the raw body.
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<GoogleErrorEnvelope>(body) {
        return match envelope.error.status {
            Some(status) => format!("{status}: {}", envelope.error.message),
            None => envelope.error.message,
        };
    }
    if let Ok(oauth) = serde_json::from_str::<OAuthErrorBody>(body) {
        return match oauth.error_description {
            Some(description) => format!("{}: {description}", oauth.error),
            None => oauth.error,
        };
    }
    body.trim().to_string()
}
