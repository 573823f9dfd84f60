use serde::Deserialize;
use shared::config::{Listener, ListenerError, default_admin_listener, default_listener};

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("listener: {0}")]
    Listener(#[from] ListenerError),

    #[error("max_body_bytes cannot be 0")]
    ZeroBodyLimit,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_listener")]
    pub listener: Listener,
    #[serde(default = "default_admin_listener")]
    pub admin_listener: Listener,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: default_listener(),
            admin_listener: default_admin_listener(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.max_body_bytes == 0 {
            return Err(ValidationError::ZeroBodyLimit);
        }
        Ok(())
    }
}
