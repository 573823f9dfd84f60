use serde::Deserialize;
use std::sync::Arc;

/// Looks up a single setting by name, in the process environment outside of tests.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub fn process_env() -> EnvLookup {
    Arc::new(|name| std::env::var(name).ok())
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ListenerError {
    #[error("port cannot be 0")]
    InvalidPort,
    #[error("host cannot be empty")]
    EmptyHost,
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Listener {
            host: host.into(),
            port,
        }
    }

    pub fn validate(&self) -> Result<(), ListenerError> {
        if self.port == 0 {
            return Err(ListenerError::InvalidPort);
        }
        if self.host.is_empty() {
            return Err(ListenerError::EmptyHost);
        }
        Ok(())
    }
}

/// The relay invokes every service on 8080.
pub fn default_listener() -> Listener {
    Listener::new("0.0.0.0", 8080)
}

pub fn default_admin_listener() -> Listener {
    Listener::new("0.0.0.0", 8081)
}
