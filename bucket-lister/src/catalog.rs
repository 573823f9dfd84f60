use async_trait::async_trait;
use shared::credentials::{BucketSummary, S3ClientFactory};
use shared::storage::{CredentialError, StorageError};

#[derive(thiserror::Error, Debug)]
pub enum ListError {
    #[error("{0}")]
    Credential(#[from] CredentialError),
    #[error("{0}")]
    Storage(#[from] StorageError),
}

/// The buckets visible to a role.
#[async_trait]
pub trait BucketCatalog: Send + Sync {
    async fn list(&self, role: &str, region: &str) -> Result<Vec<BucketSummary>, ListError>;
}

#[async_trait]
impl BucketCatalog for S3ClientFactory {
    async fn list(&self, role: &str, region: &str) -> Result<Vec<BucketSummary>, ListError> {
        let client = self.assume(role, region).await?;
        Ok(client.list_buckets().await?)
    }
}
