use crate::config::ReplicationConfig;
use crate::errors::BucketSyncError;
use crate::metrics_defs::{DELIVERIES_RECEIVED, DELIVERIES_REJECTED};
use crate::notification;
use crate::router::{ProcessReport, Router};
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use shared::config::EnvLookup;
use shared::counter;
use shared::delivery::{DeliveryMetadata, message_body};
use shared::http::{BodyError, ResponseBody, make_error_response, make_text_response, read_body};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Treats every request on the main listener as one notification delivery.
#[derive(Clone)]
pub struct BucketSyncService {
    router: Arc<Router>,
    env: EnvLookup,
    max_body_bytes: usize,
}

impl BucketSyncService {
    pub fn new(router: Router, env: EnvLookup, max_body_bytes: usize) -> Self {
        BucketSyncService {
            router: Arc::new(router),
            env,
            max_body_bytes,
        }
    }

    /// Decodes the delivery, resolves the replication settings, and processes each record.
    ///
    /// Nothing touches storage unless both the body and the settings are usable.
    pub async fn handle_delivery(
        &self,
        metadata: &DeliveryMetadata,
        body: Bytes,
    ) -> Result<ProcessReport, BucketSyncError> {
        counter!(DELIVERIES_RECEIVED).increment(1);

        let body = message_body(body);
        tracing::info!(
            "[{}] {} : {}",
            metadata.time_rfc3339(),
            metadata.source_or_empty(),
            String::from_utf8_lossy(&body)
        );

        let notification = notification::parse(&body).inspect_err(|e| {
            counter!(DELIVERIES_REJECTED, "reason" => "parse").increment(1);
            tracing::error!(error = %e, "Unable to decode notification");
        })?;

        let config = ReplicationConfig::resolve(&self.env).inspect_err(|e| {
            counter!(DELIVERIES_REJECTED, "reason" => "config").increment(1);
            tracing::error!(error = %e, "Replication is not configured");
        })?;

        Ok(self.router.process(&notification, &config).await)
    }

    async fn handle(&self, req: Request<Incoming>) -> Response<ResponseBody> {
        let metadata = DeliveryMetadata::from_headers(req.headers());
        let body = match read_body(req.into_body(), self.max_body_bytes).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(id = ?metadata.id, error = %e, "Rejecting delivery");
                return match e {
                    BodyError::TooLarge(_) => make_error_response(StatusCode::PAYLOAD_TOO_LARGE),
                    BodyError::Read(_) => make_error_response(StatusCode::BAD_REQUEST),
                };
            }
        };

        to_response(self.handle_delivery(&metadata, body).await)
    }
}

fn to_response(result: Result<ProcessReport, BucketSyncError>) -> Response<ResponseBody> {
    match result {
        Ok(report) if report.is_success() => make_text_response(StatusCode::OK, "ok\n"),
        Ok(report) => {
            tracing::error!(
                failures = report.failures.len(),
                not_attempted = report.not_attempted,
                copied = report.copied,
                deleted = report.deleted,
                "Notification processed with failures"
            );
            make_error_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
        Err(BucketSyncError::Parse(_)) => make_error_response(StatusCode::BAD_REQUEST),
        Err(_) => make_error_response(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

impl Service<Request<Incoming>> for BucketSyncService {
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}
