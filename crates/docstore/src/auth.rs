//! OAuth2 access tokens for the database API.
//!
//! A service account authenticates by signing a short-lived JWT assertion with
//! its private key and exchanging it at the key's token endpoint for a bearer
//! token. Tokens are cached until shortly before they expire.

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::credentials::ServiceAccountKey;
use crate::errors::{AuthenticationError, error_message};

/// Scope granting read/write access to Firestore.
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME: Duration = Duration::hours(1);
const EXPIRY_MARGIN: Duration = Duration::seconds(60);
/// Upper bound on the lifetime trusted from a token response.
const MAX_TOKEN_LIFETIME_SECS: i64 = 86_400;

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// A bearer token and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

impl AccessToken {
    /// Expiry for a token issued at `now` with the endpoint's `expires_in`,
    /// clamped to `0..=MAX_TOKEN_LIFETIME_SECS`.
    fn expiry(now: OffsetDateTime, expires_in: i64) -> OffsetDateTime {
        now + Duration::seconds(expires_in.clamp(0, MAX_TOKEN_LIFETIME_SECS))
    }

    fn is_fresh(&self, now: OffsetDateTime) -> bool {
        self.expires_at - EXPIRY_MARGIN > now
    }
}

/// Exchanges signed service account assertions for access tokens.
pub struct TokenProvider {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: String,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenProvider {
    /// Creates a provider for the datastore scope.
    pub fn new(key: ServiceAccountKey) -> Result<Self, AuthenticationError> {
        Self::with_scope(key, DATASTORE_SCOPE)
    }

    pub fn with_scope(
        key: ServiceAccountKey,
        scope: impl Into<String>,
    ) -> Result<Self, AuthenticationError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(AuthenticationError::InvalidKey)?;
        Ok(Self {
            key,
            encoding_key,
            scope: scope.into(),
            cached: Mutex::new(None),
        })
    }

    /// Builds the signed JWT assertion sent to the token endpoint.
    fn assertion(&self, now: OffsetDateTime) -> Result<String, AuthenticationError> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat: now.unix_timestamp(),
            exp: (now + ASSERTION_LIFETIME).unix_timestamp(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        encode(&header, &claims, &self.encoding_key).map_err(AuthenticationError::Signing)
    }

    /// Returns a valid access token, fetching a new one if the cache is empty
    /// or about to expire.
    pub async fn access_token(&self, http: &Client) -> Result<String, AuthenticationError> {
        let mut cached = self.cached.lock().await;
        let now = OffsetDateTime::now_utc();

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.token.clone());
        }

        let token = self.fetch(http, now).await?;
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch(
        &self,
        http: &Client,
        now: OffsetDateTime,
    ) -> Result<AccessToken, AuthenticationError> {
        let assertion = self.assertion(now)?;
        debug!(token_uri = %self.key.token_uri, "requesting access token");

        let resp = http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            let message = error_message(&body);
            warn!(status, %message, "token endpoint rejected credential");
            return Err(AuthenticationError::Rejected { status, message });
        }

        let token: TokenResponse = resp.json().await?;
        info!(
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "access token acquired"
        );

        Ok(AccessToken {
            token: token.access_token,
            expires_at: AccessToken::expiry(now, token.expires_in),
        })
    }
}

/// Where bearer tokens for database requests come from.
pub enum TokenSource {
    ServiceAccount(TokenProvider),
    /// A fixed token, e.g. `owner` for the local emulator.
    Static(String),
}

impl TokenSource {
    pub async fn token(&self, http: &Client) -> Result<String, AuthenticationError> {
        match self {
            TokenSource::ServiceAccount(provider) => provider.access_token(http).await,
            TokenSource::Static(token) => Ok(token.clone()),
        }
    }
}
