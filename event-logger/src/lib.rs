pub mod config;
pub mod service;

use service::EventLoggerService;
use shared::admin_service::AdminService;
use shared::http::run_http_service;

#[derive(thiserror::Error, Debug)]
pub enum EventLoggerError {
    #[error("invalid service configuration: {0}")]
    Validation(#[from] config::ValidationError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn run(config: config::Config) -> Result<(), EventLoggerError> {
    config.validate()?;

    let logger_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        EventLoggerService::new(config.max_body_bytes),
    );
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::new("event-logger", || true),
    );

    tokio::try_join!(logger_task, admin_task)?;
    Ok(())
}
