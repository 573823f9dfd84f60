pub mod admin_service;
pub mod config;
pub mod credentials;
pub mod delivery;
pub mod http;
pub mod metrics_defs;
pub mod storage;
