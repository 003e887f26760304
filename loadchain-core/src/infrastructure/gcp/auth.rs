// loadchain-core/src/infrastructure/gcp/auth.rs

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::infrastructure::error::InfrastructureError;

pub const TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Tokens are refreshed this long before the server-side expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
enum TokenSource {
    Static(String),
    Metadata(String),
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() < expires_at - Duration::seconds(EXPIRY_MARGIN_SECS),
            None => true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: Option<i64>,
}

/// Bearer tokens for the Google REST APIs.
#[derive(Debug)]
pub struct TokenProvider {
    client: reqwest::Client,
    source: TokenSource,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenProvider {
    /// `GOOGLE_OAUTH_ACCESS_TOKEN` when set, the instance metadata server otherwise.
    pub fn from_env(client: reqwest::Client) -> Self {
        match std::env::var(TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => Self::fixed(client, token.trim()),
            _ => Self::metadata(client, METADATA_TOKEN_URL),
        }
    }

    pub fn fixed(client: reqwest::Client, token: impl Into<String>) -> Self {
        Self {
            client,
            source: TokenSource::Static(token.into()),
            cached: Mutex::new(None),
        }
    }

    pub fn metadata(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            source: TokenSource::Metadata(url.into()),
            cached: Mutex::new(None),
        }
    }

    pub async fn token(&self) -> Result<String, InfrastructureError> {
        let url = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Metadata(url) => url,
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        debug!(%url, "Fetching access token from metadata server");
        let response = self
            .client
            .get(url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| InfrastructureError::Auth(format!("metadata server unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InfrastructureError::Auth(format!(
                "metadata server returned {}: {}",
                status, body
            )));
        }

        let payload: MetadataToken = response.json().await?;
        let token = AccessToken {
            value: payload.access_token,
            expires_at: payload
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        };
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }
}
