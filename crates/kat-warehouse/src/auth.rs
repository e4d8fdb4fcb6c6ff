//! Service account → OAuth2 access token exchange.
//!
//! Implements Google's JWT-bearer grant: an RS256-signed assertion naming the
//! service account is posted to the key's `token_uri`, which answers with a
//! short-lived bearer token. Tokens are cached until one minute before they
//! expire.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use kat_secrets::ServiceAccountKey;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::ProviderError;
use crate::http::{check_response, read_json};

/// Read-only BigQuery scope.
pub const BIGQUERY_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery.readonly";

const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

const fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// Mints and caches access tokens for one service account.
pub struct ServiceAccountAuth {
    http: reqwest::Client,
    key: ServiceAccountKey,
    token_uri: String,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for ServiceAccountAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountAuth")
            .field("client_email", &self.key.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountAuth {
    /// `token_uri_override` replaces the key's `token_uri` (emulators, proxies).
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        key: ServiceAccountKey,
        token_uri_override: Option<&str>,
    ) -> Self {
        let token_uri = token_uri_override.map_or_else(|| key.token_uri.clone(), str::to_string);
        Self {
            http,
            key,
            token_uri,
            scope: BIGQUERY_READONLY_SCOPE.to_string(),
            cached: Mutex::new(None),
        }
    }

    /// GCP project the key belongs to.
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.key.project_id
    }

    /// Return a valid access token, exchanging a new assertion when needed.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Auth` if the private key cannot sign, or the
    /// HTTP error from the token endpoint.
    pub async fn access_token(&self) -> Result<String, ProviderError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let assertion = self.sign_assertion(now)?;
        let body = format!(
            "grant_type={}&assertion={}",
            urlencoding::encode(GRANT_TYPE),
            urlencoding::encode(&assertion)
        );
        let resp = self
            .http
            .post(&self.token_uri)
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        let resp = check_response(resp).await.map_err(|e| match e {
            ProviderError::Api { status, message } if status == 400 || status == 401 => {
                ProviderError::Auth(format!(
                    "token endpoint rejected assertion ({status}): {message}"
                ))
            }
            other => other,
        })?;
        let token: TokenResponse = read_json(resp, "token response").await?;

        tracing::debug!(
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "obtained warehouse access token"
        );
        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: now + chrono::Duration::seconds(token.expires_in),
        });
        Ok(value)
    }

    /// Build the signed JWT-bearer assertion.
    pub(crate) fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String, ProviderError> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: self.key.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        if !self.key.private_key_id.is_empty() {
            header.kid = Some(self.key.private_key_id.clone());
        }
        let encoding_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?;
        Ok(jsonwebtoken::encode(&header, &claims, &encoding_key)?)
    }
}
