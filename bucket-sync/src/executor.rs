use crate::config::{Config, ReplicationConfig, TargetKeyStrategy};
use crate::errors::{CopyError, DeleteError, Leg};
use crate::metrics_defs::{
    COPY_BYTES, COPY_DURATION, COPY_FAILED, COPY_SUCCEEDED, DELETE_FAILED, DELETE_SUCCEEDED,
};
use crate::staging::StagingArtifact;
use shared::storage::{ClientFactory, ScopedClient, StorageError};
use shared::{counter, histogram};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Debug, PartialEq)]
pub struct ExecutorSettings {
    pub staging_dir: PathBuf,
    pub target_key_strategy: TargetKeyStrategy,
    pub confirm_timeout: Duration,
}

impl From<&Config> for ExecutorSettings {
    fn from(config: &Config) -> Self {
        ExecutorSettings {
            staging_dir: config.staging_dir.clone(),
            target_key_strategy: config.target_key_strategy,
            confirm_timeout: config.confirm_timeout(),
        }
    }
}

/// Carries out copy and delete actions against the source and target buckets.
#[derive(Clone)]
pub struct Executor {
    factory: Arc<dyn ClientFactory>,
    settings: ExecutorSettings,
}

impl Executor {
    pub fn new(factory: Arc<dyn ClientFactory>, settings: ExecutorSettings) -> Self {
        Executor { factory, settings }
    }

    pub fn replica_key(&self, key: &str) -> String {
        self.settings.target_key_strategy.replica_key(key)
    }

    /// Downloads `bucket/key` as the source role and uploads it to the target bucket as the
    /// target role. Returns the number of bytes replicated.
    ///
    /// The staged copy is removed on every path out of this function. Failing to remove it is
    /// an error even when both transfers succeeded.
    pub async fn copy(
        &self,
        bucket: &str,
        key: &str,
        config: &ReplicationConfig,
    ) -> Result<u64, CopyError> {
        let started = Instant::now();
        let result = self.copy_inner(bucket, key, config).await;

        match &result {
            Ok(bytes) => {
                counter!(COPY_SUCCEEDED).increment(1);
                histogram!(COPY_DURATION).record(started.elapsed().as_secs_f64());
                histogram!(COPY_BYTES).record(*bytes as f64);
            }
            Err(_) => counter!(COPY_FAILED).increment(1),
        }
        result
    }

    async fn copy_inner(
        &self,
        bucket: &str,
        key: &str,
        config: &ReplicationConfig,
    ) -> Result<u64, CopyError> {
        let download_error = |source: StorageError| CopyError::Download {
            bucket: bucket.to_string(),
            key: key.to_string(),
            source,
        };

        let source_client = self
            .factory
            .client_for(&config.source_role_arn, &config.source_region)
            .await
            .map_err(|source| CopyError::Credential {
                leg: Leg::Download,
                source,
            })?;

        let mut artifact = StagingArtifact::create(&self.settings.staging_dir, key)
            .map_err(|e| download_error(e.into()))?;

        let downloaded = match download(source_client.as_ref(), bucket, key, &mut artifact).await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                discard(artifact);
                return Err(download_error(e));
            }
        };
        drop(source_client);

        tracing::info!(
            bucket,
            key,
            bytes = downloaded,
            path = %artifact.path().display(),
            "Downloaded object"
        );

        let replica_key = self.replica_key(key);
        let uploaded = self.upload(config, &replica_key, &artifact).await;

        let staged_path = artifact.path().to_path_buf();
        let cleanup = artifact.remove();

        match (uploaded, cleanup) {
            (Ok(()), Ok(())) => Ok(downloaded),
            (Ok(()), Err(source)) => Err(CopyError::Cleanup {
                path: staged_path,
                source,
            }),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup_error)) => {
                tracing::warn!(
                    path = %staged_path.display(),
                    error = %cleanup_error,
                    "Unable to delete staging file after failed upload"
                );
                Err(e)
            }
        }
    }

    async fn upload(
        &self,
        config: &ReplicationConfig,
        replica_key: &str,
        artifact: &StagingArtifact,
    ) -> Result<(), CopyError> {
        let target_client = self
            .factory
            .client_for(&config.target_role_arn, &config.target_region)
            .await
            .map_err(|source| CopyError::Credential {
                leg: Leg::Upload,
                source,
            })?;

        target_client
            .put(&config.target_bucket, replica_key, artifact.path())
            .await
            .map_err(|source| CopyError::Upload {
                bucket: config.target_bucket.clone(),
                key: replica_key.to_string(),
                source,
            })
    }

    /// Deletes the replica of `key` from the target bucket and waits until it is gone.
    pub async fn delete(&self, key: &str, config: &ReplicationConfig) -> Result<(), DeleteError> {
        let result = self.delete_inner(key, config).await;
        match &result {
            Ok(()) => counter!(DELETE_SUCCEEDED).increment(1),
            Err(_) => counter!(DELETE_FAILED).increment(1),
        }
        result
    }

    async fn delete_inner(&self, key: &str, config: &ReplicationConfig) -> Result<(), DeleteError> {
        let bucket = config.target_bucket.as_str();
        let replica_key = self.replica_key(key);

        let client = self
            .factory
            .client_for(&config.target_role_arn, &config.target_region)
            .await
            .map_err(DeleteError::Credential)?;

        match client.delete(bucket, &replica_key).await {
            Ok(()) => {}
            // Already gone, confirmation below still has to hold.
            Err(StorageError::NotFound { .. }) => {
                tracing::debug!(bucket, key = %replica_key, "Replica was already absent");
            }
            Err(source) => {
                return Err(DeleteError::Delete {
                    bucket: bucket.to_string(),
                    key: replica_key,
                    source,
                });
            }
        }

        client
            .wait_until_absent(bucket, &replica_key, self.settings.confirm_timeout)
            .await
            .map_err(|source| DeleteError::Confirm {
                bucket: bucket.to_string(),
                key: replica_key.clone(),
                source,
            })?;

        tracing::info!(bucket, key = %replica_key, "Object successfully deleted");
        Ok(())
    }
}

async fn download(
    client: &dyn ScopedClient,
    bucket: &str,
    key: &str,
    artifact: &mut StagingArtifact,
) -> Result<u64, StorageError> {
    let mut reader = client.get(bucket, key).await?;
    Ok(artifact.fill(&mut reader).await?)
}

fn discard(artifact: StagingArtifact) {
    let path = artifact.path().to_path_buf();
    if let Err(e) = artifact.remove() {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "Unable to delete staging file after failed download"
        );
    }
}
