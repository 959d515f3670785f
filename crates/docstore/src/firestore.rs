//! Firestore REST client.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::auth::{TokenProvider, TokenSource};
use crate::credentials::ServiceAccountKey;
use crate::errors::{AuthenticationError, WriteError, error_message};
use crate::store::{DocumentId, DocumentStore, Fields, auto_id};

pub const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com";
pub const DEFAULT_DATABASE: &str = "(default)";

/// Bearer token the Firestore emulator accepts as an admin credential.
const EMULATOR_TOKEN: &str = "owner";

/// Where and how to reach the database.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// Overrides the project id from the credential file. Required with the emulator.
    pub project_id: Option<String>,
    pub database_id: String,
    /// `host:port` of a local emulator; disables credential loading.
    pub emulator_host: Option<String>,
    /// Overrides the API endpoint.
    pub base_url: Option<String>,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            database_id: DEFAULT_DATABASE.to_string(),
            emulator_host: None,
            base_url: None,
        }
    }
}

impl FirestoreConfig {
    /// Reads `FIRESTORE_PROJECT_ID`, `FIRESTORE_DATABASE` and
    /// `FIRESTORE_EMULATOR_HOST`.
    pub fn from_env() -> Self {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            project_id: non_empty("FIRESTORE_PROJECT_ID"),
            database_id: non_empty("FIRESTORE_DATABASE")
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            emulator_host: non_empty("FIRESTORE_EMULATOR_HOST"),
            base_url: None,
        }
    }

    fn endpoint(&self) -> String {
        match (&self.base_url, &self.emulator_host) {
            (Some(url), _) => url.trim_end_matches('/').to_string(),
            (None, Some(host)) => format!("http://{host}"),
            (None, None) => FIRESTORE_BASE_URL.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum FieldValue<'a> {
    StringValue(&'a str),
}

#[derive(Serialize)]
struct DocumentBody<'a> {
    fields: BTreeMap<&'a str, FieldValue<'a>>,
}

impl<'a> DocumentBody<'a> {
    fn from_fields(fields: &'a Fields) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(k, v)| (k.as_str(), FieldValue::StringValue(v.as_str())))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DocumentResponse {
    name: Option<String>,
}

/// Authenticated handle to one Firestore database.
pub struct FirestoreClient {
    http: Client,
    tokens: TokenSource,
    endpoint: String,
    project_id: String,
    database_id: String,
}

impl FirestoreClient {
    pub fn new(
        http: Client,
        tokens: TokenSource,
        project_id: impl Into<String>,
        config: &FirestoreConfig,
    ) -> Self {
        Self {
            http,
            tokens,
            endpoint: config.endpoint(),
            project_id: project_id.into(),
            database_id: config.database_id.clone(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Each path part is pushed as its own segment, so `/`, `?` and `#` in a
    /// collection name are percent-encoded instead of changing the target.
    fn collection_url(&self, collection: &str) -> Result<Url, WriteError> {
        if collection.is_empty() {
            return Err(WriteError::InvalidCollection(collection.to_string()));
        }

        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| WriteError::InvalidUrl(format!("{}: {e}", self.endpoint)))?;
        url.path_segments_mut()
            .map_err(|_| WriteError::InvalidUrl(self.endpoint.clone()))?
            .pop_if_empty()
            .extend([
                "v1",
                "projects",
                self.project_id.as_str(),
                "databases",
                self.database_id.as_str(),
                "documents",
                collection,
            ]);
        Ok(url)
    }
}

/// Loads the credential file, acquires a first access token and returns a
/// ready client.
///
/// With an emulator host configured the credential file is not read.
pub async fn connect(
    credentials_path: impl AsRef<Path>,
    config: &FirestoreConfig,
) -> Result<FirestoreClient, AuthenticationError> {
    let http = Client::new();

    if let Some(host) = &config.emulator_host {
        let project_id = config
            .project_id
            .clone()
            .ok_or(AuthenticationError::MissingProjectId)?;
        info!(%host, %project_id, "using Firestore emulator");
        let tokens = TokenSource::Static(EMULATOR_TOKEN.to_string());
        return Ok(FirestoreClient::new(http, tokens, project_id, config));
    }

    let key = ServiceAccountKey::from_file(credentials_path)?;
    let project_id = config
        .project_id
        .clone()
        .or_else(|| key.project_id.clone())
        .ok_or(AuthenticationError::MissingProjectId)?;

    let provider = TokenProvider::new(key)?;
    provider.access_token(&http).await?;

    info!(%project_id, database = %config.database_id, "connected to Firestore");
    let tokens = TokenSource::ServiceAccount(provider);
    Ok(FirestoreClient::new(http, tokens, project_id, config))
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn create_record(
        &self,
        collection: &str,
        fields: &Fields,
    ) -> Result<DocumentId, WriteError> {
        let id = auto_id(&mut rand::thread_rng());
        let url = self.collection_url(collection)?;
        let token = self.tokens.token(&self.http).await?;

        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .query(&[("documentId", id.as_str())])
            .json(&DocumentBody::from_fields(fields))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            let message = error_message(&body);
            warn!(collection, status, %message, "create document rejected");
            return Err(WriteError::Rejected { status, message });
        }

        let doc: DocumentResponse = resp.json().await?;
        let name = doc
            .name
            .ok_or_else(|| WriteError::MalformedResponse("document has no name".to_string()))?;
        let created = name
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| WriteError::MalformedResponse(format!("bad document name {name}")))?;

        debug!(collection, id = created, "created document");
        Ok(DocumentId(created.to_string()))
    }
}
