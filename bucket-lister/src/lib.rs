pub mod catalog;
pub mod config;
pub mod service;

use service::ListerService;
use shared::admin_service::AdminService;
use shared::config::process_env;
use shared::credentials::S3ClientFactory;
use shared::http::run_http_service;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum BucketListerError {
    #[error("invalid service configuration: {0}")]
    Validation(#[from] config::ValidationError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn run(config: config::Config) -> Result<(), BucketListerError> {
    config.validate()?;

    let factory = S3ClientFactory::from_env(config.session_name.clone()).await;
    let service = ListerService::new(Arc::new(factory), process_env(), config.default_region);

    let lister_task = run_http_service(&config.listener.host, config.listener.port, service);
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::new("bucket-lister", || true),
    );

    tokio::try_join!(lister_task, admin_task)?;
    Ok(())
}
