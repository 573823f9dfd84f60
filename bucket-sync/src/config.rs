use crate::errors::ConfigError;
use serde::Deserialize;
use shared::config::{
    EnvLookup, Listener, ListenerError, default_admin_listener, default_listener,
};
use std::path::PathBuf;
use std::time::Duration;

pub const SOURCE_ROLE_ARN: &str = "SOURCE_ROLE_ARN";
pub const SOURCE_BUCKET: &str = "SOURCE_BUCKET";
pub const SOURCE_BUCKET_REGION: &str = "SOURCE_BUCKET_REGION";
pub const TARGET_ROLE_ARN: &str = "TARGET_ROLE_ARN";
pub const TARGET_BUCKET: &str = "TARGET_BUCKET";
pub const TARGET_BUCKET_REGION: &str = "TARGET_BUCKET_REGION";

/// The six replication parameters, resolved once per delivery.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplicationConfig {
    pub source_role_arn: String,
    pub source_bucket: String,
    pub source_region: String,
    pub target_role_arn: String,
    pub target_bucket: String,
    pub target_region: String,
}

impl ReplicationConfig {
    /// Reads the settings in order and stops at the first one that is absent or empty.
    pub fn resolve(lookup: &EnvLookup) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError { missing: name })
        };

        Ok(ReplicationConfig {
            source_role_arn: required(SOURCE_ROLE_ARN)?,
            source_bucket: required(SOURCE_BUCKET)?,
            source_region: required(SOURCE_BUCKET_REGION)?,
            target_role_arn: required(TARGET_ROLE_ARN)?,
            target_bucket: required(TARGET_BUCKET)?,
            target_region: required(TARGET_BUCKET_REGION)?,
        })
    }
}

/// How the replica's key in the target bucket is derived from the source key.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetKeyStrategy {
    /// `copy_<key>`, the name the staged copy carries.
    #[default]
    PreservePrefix,
    /// The source key, unchanged.
    OriginalKey,
}

pub const REPLICA_PREFIX: &str = "copy_";

impl TargetKeyStrategy {
    pub fn replica_key(&self, key: &str) -> String {
        match self {
            TargetKeyStrategy::PreservePrefix => format!("{REPLICA_PREFIX}{key}"),
            TargetKeyStrategy::OriginalKey => key.to_string(),
        }
    }
}

/// What happens to the remaining records of a notification after an action fails.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failed copy or delete.
    #[default]
    Halt,
    /// Keep going and report every failure.
    Continue,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("listener: {0}")]
    Listener(#[from] ListenerError),

    #[error("confirm_timeout_secs cannot be 0")]
    ZeroConfirmTimeout,

    #[error("session_name cannot be empty")]
    EmptySessionName,

    #[error("max_body_bytes cannot be 0")]
    ZeroBodyLimit,
}

fn default_staging_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_confirm_timeout_secs() -> u64 {
    // Matches the storage waiter: 20 polls, 5 seconds apart
    100
}

fn default_session_name() -> String {
    "bucket-sync".to_string()
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Service configuration for the bucket-sync handler
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener the relay delivers notifications to
    #[serde(default = "default_listener")]
    pub listener: Listener,
    /// Listener for health and readiness probes
    #[serde(default = "default_admin_listener")]
    pub admin_listener: Listener,
    /// Directory holding staged copies between download and upload
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
    #[serde(default)]
    pub target_key_strategy: TargetKeyStrategy,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Upper bound on waiting for a deleted replica to disappear
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,
    /// Session name used when assuming the source and target roles
    #[serde(default = "default_session_name")]
    pub session_name: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: default_listener(),
            admin_listener: default_admin_listener(),
            staging_dir: default_staging_dir(),
            target_key_strategy: TargetKeyStrategy::default(),
            failure_policy: FailurePolicy::default(),
            confirm_timeout_secs: default_confirm_timeout_secs(),
            session_name: default_session_name(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.confirm_timeout_secs == 0 {
            return Err(ValidationError::ZeroConfirmTimeout);
        }
        if self.session_name.is_empty() {
            return Err(ValidationError::EmptySessionName);
        }
        if self.max_body_bytes == 0 {
            return Err(ValidationError::ZeroBodyLimit);
        }
        Ok(())
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::env_from;

    const ALL_SETTINGS: [&str; 6] = [
        SOURCE_ROLE_ARN,
        SOURCE_BUCKET,
        SOURCE_BUCKET_REGION,
        TARGET_ROLE_ARN,
        TARGET_BUCKET,
        TARGET_BUCKET_REGION,
    ];

    fn full_env() -> Vec<(&'static str, &'static str)> {
        vec![
            (SOURCE_ROLE_ARN, "arn:aws:iam::111111111111:role/reader"),
            (SOURCE_BUCKET, "uploads"),
            (SOURCE_BUCKET_REGION, "us-west-2"),
            (TARGET_ROLE_ARN, "arn:aws:iam::222222222222:role/writer"),
            (TARGET_BUCKET, "uploads-replica"),
            (TARGET_BUCKET_REGION, "eu-central-1"),
        ]
    }

    #[test]
    fn test_resolve() {
        let config = ReplicationConfig::resolve(&env_from(&full_env())).unwrap();
        assert_eq!(config.source_role_arn, "arn:aws:iam::111111111111:role/reader");
        assert_eq!(config.source_bucket, "uploads");
        assert_eq!(config.source_region, "us-west-2");
        assert_eq!(config.target_role_arn, "arn:aws:iam::222222222222:role/writer");
        assert_eq!(config.target_bucket, "uploads-replica");
        assert_eq!(config.target_region, "eu-central-1");
    }

    #[test]
    fn test_resolve_reports_missing_setting() {
        for name in ALL_SETTINGS {
            let env: Vec<_> = full_env().into_iter().filter(|(k, _)| *k != name).collect();
            let err = ReplicationConfig::resolve(&env_from(&env)).unwrap_err();
            assert_eq!(err, ConfigError { missing: name });
            assert_eq!(err.to_string(), format!("{name} is not configured in ENV"));
        }
    }

    #[test]
    fn test_resolve_empty_is_missing() {
        let mut env = full_env();
        env[4].1 = "";
        let err = ReplicationConfig::resolve(&env_from(&env)).unwrap_err();
        assert_eq!(err.missing, TARGET_BUCKET);
    }

    #[test]
    fn test_resolve_reports_first_missing_only() {
        let env = vec![(SOURCE_ROLE_ARN, "arn:aws:iam::111111111111:role/reader")];
        let err = ReplicationConfig::resolve(&env_from(&env)).unwrap_err();
        assert_eq!(err.missing, SOURCE_BUCKET);
    }

    #[test]
    fn test_replica_key() {
        assert_eq!(
            TargetKeyStrategy::PreservePrefix.replica_key("a/b.txt"),
            "copy_a/b.txt"
        );
        assert_eq!(TargetKeyStrategy::OriginalKey.replica_key("a/b.txt"), "a/b.txt");
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
listener:
    host: "127.0.0.1"
    port: 9000
staging_dir: /var/tmp/staging
target_key_strategy: original_key
failure_policy: continue
confirm_timeout_secs: 30
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.listener, Listener::new("127.0.0.1", 9000));
        assert_eq!(config.admin_listener, default_admin_listener());
        assert_eq!(config.staging_dir, PathBuf::from("/var/tmp/staging"));
        assert_eq!(config.target_key_strategy, TargetKeyStrategy::OriginalKey);
        assert_eq!(config.failure_policy, FailurePolicy::Continue);
        assert_eq!(config.confirm_timeout(), Duration::from_secs(30));
        assert_eq!(config.session_name, "bucket-sync");
    }

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.target_key_strategy, TargetKeyStrategy::PreservePrefix);
        assert_eq!(config.failure_policy, FailurePolicy::Halt);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default();
        config.listener.port = 0;
        assert_eq!(
            config.validate().unwrap_err(),
            ValidationError::Listener(ListenerError::InvalidPort)
        );

        let mut config = Config::default();
        config.confirm_timeout_secs = 0;
        assert_eq!(
            config.validate().unwrap_err(),
            ValidationError::ZeroConfirmTimeout
        );

        let mut config = Config::default();
        config.session_name = String::new();
        assert_eq!(config.validate().unwrap_err(), ValidationError::EmptySessionName);

        assert!(serde_yaml::from_str::<Config>("failure_policy: retry").is_err());
        assert!(serde_yaml::from_str::<Config>("target_key_strategy: upper").is_err());
    }
}
