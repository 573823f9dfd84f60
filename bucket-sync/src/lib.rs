pub mod config;
pub mod errors;
pub mod executor;
pub mod metrics_defs;
pub mod notification;
pub mod router;
pub mod service;
pub mod staging;

#[cfg(test)]
mod testutils;

use errors::BucketSyncError;
use executor::{Executor, ExecutorSettings};
use router::Router;
use service::BucketSyncService;
use shared::admin_service::AdminService;
use shared::config::process_env;
use shared::credentials::S3ClientFactory;
use shared::http::run_http_service;
use std::sync::Arc;

pub async fn run(config: config::Config) -> Result<(), BucketSyncError> {
    config.validate()?;
    tokio::fs::create_dir_all(&config.staging_dir).await?;

    let factory = S3ClientFactory::from_env(config.session_name.clone()).await;
    let executor = Executor::new(Arc::new(factory), ExecutorSettings::from(&config));
    let router = Router::new(executor, config.failure_policy);
    let service = BucketSyncService::new(router, process_env(), config.max_body_bytes);

    tracing::info!(
        staging_dir = %config.staging_dir.display(),
        target_key_strategy = ?config.target_key_strategy,
        failure_policy = ?config.failure_policy,
        "Starting bucket-sync"
    );

    let sync_task = run_http_service(&config.listener.host, config.listener.port, service);
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::new("bucket-sync", || true),
    );

    tokio::try_join!(sync_task, admin_task)?;
    Ok(())
}
