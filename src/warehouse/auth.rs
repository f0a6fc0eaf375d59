//! Service-account authentication: a signed JWT assertion exchanged for an OAuth access token.

use crate::warehouse::error::WarehouseError;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

pub const BIGQUERY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a service-account JSON key that authentication needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub async fn from_file(path: &Path) -> Result<Self, WarehouseError> {
        let content = fs::read(path)
            .await
            .map_err(|e| WarehouseError::CredentialRead(path.to_path_buf(), e))?;
        serde_json::from_slice(&content)
            .map_err(|e| WarehouseError::CredentialParse(path.to_path_buf(), e))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl AssertionClaims {
    pub(crate) fn new(key: &ServiceAccountKey, now: DateTime<Utc>) -> Self {
        let iat = now.timestamp();
        Self {
            iss: key.client_email.clone(),
            scope: BIGQUERY_SCOPE.to_string(),
            aud: key.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        }
    }
}

/// Signs the RS256 assertion sent to the token endpoint.
pub(crate) fn sign_assertion(
    key: &ServiceAccountKey,
    now: DateTime<Utc>,
) -> Result<String, WarehouseError> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();
    let encoding_key =
        EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(WarehouseError::TokenSigning)?;
    jsonwebtoken::encode(&header, &AssertionClaims::new(key, now), &encoding_key)
        .map_err(WarehouseError::TokenSigning)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Exchanges the service-account key for a bearer token.
pub async fn fetch_access_token(
    client: &Client,
    key: &ServiceAccountKey,
) -> Result<String, WarehouseError> {
    let assertion = sign_assertion(key, Utc::now())?;
    let url = key.token_uri.clone();
    debug!("Requesting access token for {}", key.client_email);

    let response = client
        .post(&url)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .map_err(|e| WarehouseError::NetworkRequest(url.clone(), e))?;
    let response = crate::warehouse::bigquery::check_status(url.clone(), response).await?;
    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| WarehouseError::ResponseDecode(url, e))?;

    info!(
        "Authenticated as {} (token valid for {}s)",
        key.client_email,
        token.expires_in.unwrap_or_default()
    );
    Ok(token.access_token)
}
