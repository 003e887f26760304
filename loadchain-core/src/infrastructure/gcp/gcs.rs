// loadchain-core/src/infrastructure/gcp/gcs.rs

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

use super::auth::TokenProvider;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::object_store::ObjectStore;

pub const STORAGE_BASE_URL: &str = "https://storage.googleapis.com";

/// Cloud Storage through the JSON API, single-request media uploads.
pub struct GcsObjectStore {
    client: reqwest::Client,
    tokens: Arc<TokenProvider>,
    base_url: String,
}

impl GcsObjectStore {
    pub fn new(client: reqwest::Client, tokens: Arc<TokenProvider>) -> Self {
        Self {
            client,
            tokens,
            base_url: STORAGE_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    #[instrument(skip(self), fields(store = "gcs"))]
    async fn put_file(
        &self,
        source: &Path,
        container: &str,
        key: &str,
    ) -> Result<String, InfrastructureError> {
        let content = tokio::fs::read(source).await?;
        let size = content.len();
        let token = self.tokens.token().await?;

        let url = format!("{}/upload/storage/v1/b/{}/o", self.base_url, container);
        let response = self
            .client
            .post(&url)
            .query(&[("uploadType", "media"), ("name", key)])
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(content)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InfrastructureError::Api {
                service: "storage",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let uri = format!("gs://{}/{}", container, key);
        info!(bytes = size, %uri, "Object uploaded");
        Ok(uri)
    }

    fn scheme(&self) -> &str {
        "gs"
    }
}
