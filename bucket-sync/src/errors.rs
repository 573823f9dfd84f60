use shared::storage::{CredentialError, StorageError};
use std::fmt;
use std::path::PathBuf;

/// A required replication setting is absent from the environment.
#[derive(thiserror::Error, Debug, PartialEq)]
#[error("{missing} is not configured in ENV")]
pub struct ConfigError {
    pub missing: &'static str,
}

/// The delivered body is not a storage notification document.
#[derive(thiserror::Error, Debug)]
#[error("failed to decode notification: {0}")]
pub struct ParseError(#[from] serde_json::Error);

/// The step of an action a credential failure happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Leg {
    Download,
    Upload,
    Delete,
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Leg::Download => "download",
            Leg::Upload => "upload",
            Leg::Delete => "delete",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CopyError {
    #[error("{leg} leg: {source}")]
    Credential {
        leg: Leg,
        #[source]
        source: CredentialError,
    },

    #[error("download of s3://{bucket}/{key} failed: {source}")]
    Download {
        bucket: String,
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("upload of s3://{bucket}/{key} failed: {source}")]
    Upload {
        bucket: String,
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("unable to delete staging file {}: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum DeleteError {
    #[error("delete leg: {0}")]
    Credential(#[source] CredentialError),

    #[error("unable to delete object s3://{bucket}/{key}: {source}")]
    Delete {
        bucket: String,
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("error while waiting for s3://{bucket}/{key} to be deleted: {source}")]
    Confirm {
        bucket: String,
        key: String,
        #[source]
        source: StorageError,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum ActionError {
    #[error("copy failed: {0}")]
    Copy(#[from] CopyError),
    #[error("delete failed: {0}")]
    Delete(#[from] DeleteError),
}

#[derive(thiserror::Error, Debug)]
pub enum BucketSyncError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("invalid service configuration: {0}")]
    Validation(#[from] crate::config::ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
