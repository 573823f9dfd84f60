use serde::Deserialize;
use shared::config::{Listener, ListenerError, default_admin_listener, default_listener};

pub const ROLE_ARN: &str = "ROLE_ARN";
pub const REGION: &str = "REGION";

fn default_region() -> String {
    "us-west-2".to_string()
}

fn default_session_name() -> String {
    "bucket-lister".to_string()
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("listener: {0}")]
    Listener(#[from] ListenerError),

    #[error("default_region cannot be empty")]
    EmptyRegion,

    #[error("session_name cannot be empty")]
    EmptySessionName,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_listener")]
    pub listener: Listener,
    #[serde(default = "default_admin_listener")]
    pub admin_listener: Listener,
    /// Region used when `REGION` is not set
    #[serde(default = "default_region")]
    pub default_region: String,
    #[serde(default = "default_session_name")]
    pub session_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: default_listener(),
            admin_listener: default_admin_listener(),
            default_region: default_region(),
            session_name: default_session_name(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.default_region.is_empty() {
            return Err(ValidationError::EmptyRegion);
        }
        if self.session_name.is_empty() {
            return Err(ValidationError::EmptySessionName);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.default_region, "us-west-2");
        assert_eq!(config.listener.port, 8080);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate() {
        let config: Config = serde_yaml::from_str("default_region: \"\"").unwrap();
        assert_eq!(config.validate(), Err(ValidationError::EmptyRegion));

        let config: Config = serde_yaml::from_str("listener: {host: 0.0.0.0, port: 0}").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Listener(_))
        ));
    }
}
