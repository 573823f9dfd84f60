use async_trait::async_trait;
use std::path::Path;
use std::pin::Pin;
use std::time::{Duration, SystemTime};
use tokio::io::AsyncRead;

/// The role could not be assumed, so no client exists for the action that needed it.
#[derive(thiserror::Error, Debug)]
#[error("could not assume role {role} in {region}: {reason}")]
pub struct CredentialError {
    pub role: String,
    pub region: String,
    pub reason: String,
}

/// Failures reported by the object storage capability.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("object s3://{bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    #[error("access denied to s3://{bucket}/{key}")]
    AccessDenied { bucket: String, key: String },

    #[error("timed out waiting for s3://{bucket}/{key} to disappear")]
    Timeout { bucket: String, key: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage service error: {0}")]
    Service(String),
}

pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Storage access bound to one assumed identity in one region.
///
/// Clients are handed out per action and dropped when it completes. The temporary
/// credentials behind them expire, so they must never be kept around for later actions.
#[async_trait]
pub trait ScopedClient: Send + Sync {
    fn role(&self) -> &str;

    fn region(&self) -> &str;

    /// When the temporary credentials stop being valid, if known.
    fn expires_at(&self) -> Option<SystemTime>;

    /// Opens a stream over the object's bytes.
    async fn get(&self, bucket: &str, key: &str) -> Result<ObjectReader, StorageError>;

    /// Streams the file at `source` into the object.
    async fn put(&self, bucket: &str, key: &str, source: &Path) -> Result<(), StorageError>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError>;

    /// Polls until the object is gone. Fails with `StorageError::Timeout` once `timeout`
    /// has elapsed.
    async fn wait_until_absent(
        &self,
        bucket: &str,
        key: &str,
        timeout: Duration,
    ) -> Result<(), StorageError>;
}

/// Exchanges the process identity for a role and binds a client to it.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Every call performs a fresh role assumption.
    async fn client_for(
        &self,
        role: &str,
        region: &str,
    ) -> Result<Box<dyn ScopedClient>, CredentialError>;
}
