// loadchain-core/src/infrastructure/adapters/local_store.rs

use async_trait::async_trait;
use std::fs;
use std::path::{Component, Path};
use tracing::{info, instrument};

use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write;
use crate::ports::object_store::ObjectStore;

/// Object store backed by a directory: `container` is a directory, `key` a file inside it.
#[derive(Debug, Default, Clone)]
pub struct LocalObjectStore;

impl LocalObjectStore {
    pub fn new() -> Self {
        Self
    }
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && Path::new(key)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    #[instrument(skip(self), fields(store = "local"))]
    async fn put_file(
        &self,
        source: &Path,
        container: &str,
        key: &str,
    ) -> Result<String, InfrastructureError> {
        if !is_plain_key(key) {
            return Err(InfrastructureError::UnsupportedUri {
                uri: format!("file://{}/{}", container.trim_end_matches('/'), key),
                expected: "a key without '..' or absolute components",
            });
        }

        let content = fs::read(source)?;
        let target = Path::new(container).join(key);
        atomic_write(&target, &content)?;

        info!(bytes = content.len(), target = %target.display(), "Object written");
        Ok(format!("file://{}", target.display()))
    }

    fn scheme(&self) -> &str {
        "file"
    }
}
