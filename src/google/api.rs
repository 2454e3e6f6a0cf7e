//! Shared HTTP plumbing for the Google REST adapters.

use crate::error::{Error, Result};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_SHEETS_URL: &str = "https://sheets.googleapis.com";
pub const DEFAULT_DRIVE_URL: &str = "https://www.googleapis.com";
pub const DEFAULT_YOUTUBE_URL: &str = "https://www.googleapis.com";

const USER_AGENT: &str = concat!("vidarchive/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Exhausted quota only. Per-minute throttles (`rateLimitExceeded`,
/// `userRateLimitExceeded`) fail the current row and the run moves on.
const QUOTA_REASONS: &[&str] = &["quotaExceeded", "dailyLimitExceeded"];

pub fn http_client() -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?)
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: Option<String>,
}

/// Pass successful responses through; turn everything else into a typed error.
///
/// This is the only place that looks at error text: quota exhaustion becomes
/// `Error::QuotaExceeded`, any other failure `Error::Api`.
pub async fn check(response: Response, service: &'static str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify(service, status.as_u16(), &body))
}

pub(crate) fn classify(service: &'static str, status: u16, body: &str) -> Error {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();

    let quota = match &parsed {
        Some(envelope) => envelope
            .error
            .errors
            .iter()
            .chain(&envelope.error.details)
            .filter_map(|detail| detail.reason.as_deref())
            .any(|reason| QUOTA_REASONS.contains(&reason)),
        None => false,
    } || body.contains("quotaExceeded");

    let message = match parsed {
        Some(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ => body.trim().chars().take(300).collect(),
    };

    if quota {
        Error::QuotaExceeded { service, message }
    } else {
        Error::Api {
            service,
            status,
            message,
        }
    }
}
