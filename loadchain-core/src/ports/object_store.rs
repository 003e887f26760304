// loadchain-core/src/ports/object_store.rs

use async_trait::async_trait;
use std::path::Path;

use crate::infrastructure::error::InfrastructureError;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Copies the full content of `source` to `container/key`, replacing any existing object.
    /// Returns the URI under which the object can be found again.
    async fn put_file(
        &self,
        source: &Path,
        container: &str,
        key: &str,
    ) -> Result<String, InfrastructureError>;

    fn scheme(&self) -> &str;
}
