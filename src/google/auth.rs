//! Authorized sessions loaded from stored user tokens.
//!
//! Each session is an opaque bearer credential handed to the adapters that
//! need it. The storage/ledger session and the caption session come from
//! separate token files so each can carry its own scopes and account.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Clone)]
pub struct AuthorizedSession {
    label: String,
    access_token: String,
}

impl AuthorizedSession {
    pub fn new(label: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            access_token: access_token.into(),
        }
    }

    pub(crate) fn bearer(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for AuthorizedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedSession")
            .field("label", &self.label)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Authorized-user token file as written by the usual Google OAuth tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StoredToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match (&self.token, self.expiry) {
            (Some(token), Some(expiry)) if !token.is_empty() => {
                expiry - Duration::seconds(EXPIRY_SKEW_SECS) > now
            }
            // No recorded expiry: trust the token as-is.
            (Some(token), None) => !token.is_empty() && self.refresh_token.is_none(),
            _ => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Load a session from `path`, refreshing and rewriting the file when the
/// stored access token is missing or expired.
pub async fn load_session(client: &Client, path: &Path, label: &str) -> Result<AuthorizedSession> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::credential(label, format!("cannot read {}: {e}", path.display()))
    })?;
    let mut stored: StoredToken = serde_json::from_str(&raw).map_err(|e| {
        Error::credential(label, format!("{} is not a token file: {e}", path.display()))
    })?;

    if stored.is_fresh(Utc::now()) {
        debug!(%label, "using stored access token");
        let token = stored.token.unwrap_or_default();
        return Ok(AuthorizedSession::new(label, token));
    }

    refresh(client, &mut stored, label).await?;

    let serialized = serde_json::to_string_pretty(&stored)?;
    tokio::fs::write(path, serialized).await.map_err(|e| {
        Error::credential(label, format!("cannot update {}: {e}", path.display()))
    })?;
    info!(%label, "Refreshed access token");

    let token = stored.token.unwrap_or_default();
    Ok(AuthorizedSession::new(label, token))
}

async fn refresh(client: &Client, stored: &mut StoredToken, label: &str) -> Result<()> {
    let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
        stored.refresh_token.as_deref(),
        stored.client_id.as_deref(),
        stored.client_secret.as_deref(),
    ) else {
        return Err(Error::credential(
            label,
            "token expired and no refresh credentials are stored; re-authorize this account",
        ));
    };

    let token_uri = stored.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
    let response = client
        .post(token_uri)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ])
        .send()
        .await
        .map_err(|e| Error::credential(label, format!("token refresh failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::credential(
            label,
            format!("token refresh rejected ({status}): {}", body.trim()),
        ));
    }

    let refreshed: RefreshResponse = response
        .json()
        .await
        .map_err(|e| Error::credential(label, format!("bad token response: {e}")))?;

    stored.token = Some(refreshed.access_token);
    stored.expiry = refreshed
        .expires_in
        .map(|secs| Utc::now() + Duration::seconds(secs));
    Ok(())
}
