//! Role assumption and S3 clients bound to the assumed identity.

use crate::storage::{ClientFactory, CredentialError, ObjectReader, ScopedClient, StorageError};
use async_trait::async_trait;
use aws_config::sts::AssumeRoleProvider;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{ProvideCredentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::{ByteStream, DateTimeFormat};
use std::path::Path;
use std::time::{Duration, SystemTime};

const CONFIRM_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Assumes roles on top of the process's ambient identity.
#[derive(Clone)]
pub struct S3ClientFactory {
    base: SdkConfig,
    session_name: String,
}

impl S3ClientFactory {
    pub fn new(base: SdkConfig, session_name: impl Into<String>) -> Self {
        S3ClientFactory {
            base,
            session_name: session_name.into(),
        }
    }

    /// Loads the ambient identity from the default provider chain.
    pub async fn from_env(session_name: impl Into<String>) -> Self {
        let base = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(base, session_name)
    }

    /// Assumes `role` and returns an S3 client for `region` acting as that role.
    ///
    /// Credentials are fetched immediately so a rejected assumption is reported here rather
    /// than on the first storage call.
    pub async fn assume(&self, role: &str, region: &str) -> Result<S3ScopedClient, CredentialError> {
        let region_id = Region::new(region.to_string());
        let provider = AssumeRoleProvider::builder(role)
            .session_name(self.session_name.clone())
            .region(region_id.clone())
            .configure(&self.base)
            .build()
            .await;

        let credentials =
            provider
                .provide_credentials()
                .await
                .map_err(|e| CredentialError {
                    role: role.to_string(),
                    region: region.to_string(),
                    reason: DisplayErrorContext(&e).to_string(),
                })?;
        let expires_at = credentials.expiry();

        let config = aws_sdk_s3::config::Builder::from(&self.base)
            .region(region_id)
            .credentials_provider(credentials)
            .build();

        tracing::debug!(role, region, "Assumed role");

        Ok(S3ScopedClient {
            client: aws_sdk_s3::Client::from_conf(config),
            role: role.to_string(),
            region: region.to_string(),
            expires_at,
        })
    }
}

#[async_trait]
impl ClientFactory for S3ClientFactory {
    async fn client_for(
        &self,
        role: &str,
        region: &str,
    ) -> Result<Box<dyn ScopedClient>, CredentialError> {
        Ok(Box::new(self.assume(role, region).await?))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BucketSummary {
    pub name: String,
    /// RFC3339 creation time, when reported
    pub created: Option<String>,
}

pub struct S3ScopedClient {
    client: aws_sdk_s3::Client,
    role: String,
    region: String,
    expires_at: Option<SystemTime>,
}

impl S3ScopedClient {
    pub async fn list_buckets(&self) -> Result<Vec<BucketSummary>, StorageError> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| StorageError::Service(DisplayErrorContext(&e).to_string()))?;

        Ok(output
            .buckets()
            .iter()
            .map(|b| BucketSummary {
                name: b.name().unwrap_or_default().to_string(),
                created: b
                    .creation_date()
                    .and_then(|d| d.fmt(DateTimeFormat::DateTime).ok()),
            })
            .collect())
    }
}

/// Maps an S3 failure onto `StorageError`. HEAD responses carry no error body, so when the
/// error code is missing or unknown the HTTP status decides.
fn classify<E>(bucket: &str, key: &str, err: SdkError<E, HttpResponse>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let (bucket, key) = (bucket.to_string(), key.to_string());
    match err.code() {
        Some("NoSuchKey" | "NotFound") => StorageError::NotFound { bucket, key },
        Some("AccessDenied" | "Forbidden") => StorageError::AccessDenied { bucket, key },
        _ => match err.raw_response().map(|r| r.status().as_u16()) {
            Some(404) => StorageError::NotFound { bucket, key },
            Some(403) => StorageError::AccessDenied { bucket, key },
            _ => StorageError::Service(DisplayErrorContext(&err).to_string()),
        },
    }
}

#[async_trait]
impl ScopedClient for S3ScopedClient {
    fn role(&self) -> &str {
        &self.role
    }

    fn region(&self) -> &str {
        &self.region
    }

    fn expires_at(&self) -> Option<SystemTime> {
        self.expires_at
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<ObjectReader, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(bucket, key, e))?;

        Ok(Box::pin(output.body.into_async_read()))
    }

    async fn put(&self, bucket: &str, key: &str, source: &Path) -> Result<(), StorageError> {
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| StorageError::Service(e.to_string()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| classify(bucket, key, e))?;
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(bucket, key, e))?;
        Ok(())
    }

    async fn wait_until_absent(
        &self,
        bucket: &str,
        key: &str,
        timeout: Duration,
    ) -> Result<(), StorageError> {
        let poll = async {
            loop {
                match self.client.head_object().bucket(bucket).key(key).send().await {
                    Ok(_) => tokio::time::sleep(CONFIRM_POLL_INTERVAL).await,
                    Err(e) => match classify(bucket, key, e) {
                        StorageError::NotFound { .. } => return Ok(()),
                        other => return Err(other),
                    },
                }
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| StorageError::Timeout {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?
    }
}
