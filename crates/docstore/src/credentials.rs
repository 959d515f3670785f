//! Service account key files.

use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use crate::errors::AuthenticationError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// A Google service account key as downloaded from the cloud console.
///
/// Only the fields needed to sign a token assertion are kept; the rest of the
/// file is ignored.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

// The private key must never end up in logs.
impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Reads and validates a key file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AuthenticationError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let key = Self::from_json(&contents)?;
        debug!(
            path = %path.display(),
            client_email = %key.client_email,
            "loaded service account key"
        );
        Ok(key)
    }

    /// Parses and validates key JSON.
    pub fn from_json(json: &str) -> Result<Self, AuthenticationError> {
        let key: Self = serde_json::from_str(json)?;
        if key.key_type != "service_account" {
            return Err(AuthenticationError::NotServiceAccount(key.key_type));
        }
        Ok(key)
    }
}
