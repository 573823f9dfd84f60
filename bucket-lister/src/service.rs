use crate::catalog::BucketCatalog;
use crate::config::{REGION, ROLE_ARN};
use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use shared::config::EnvLookup;
use shared::credentials::BucketSummary;
use shared::http::{ResponseBody, make_text_response};
use std::convert::Infallible;
use std::fmt::Write;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Answers every request with the buckets the configured role can see.
#[derive(Clone)]
pub struct ListerService {
    catalog: Arc<dyn BucketCatalog>,
    env: EnvLookup,
    default_region: String,
}

impl ListerService {
    pub fn new(catalog: Arc<dyn BucketCatalog>, env: EnvLookup, default_region: String) -> Self {
        ListerService {
            catalog,
            env,
            default_region,
        }
    }

    async fn respond(&self) -> (StatusCode, String) {
        tracing::info!("Listing buckets");

        let Some(role) = (self.env)(ROLE_ARN).filter(|v| !v.is_empty()) else {
            tracing::error!("{ROLE_ARN} is not defined");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("FATAL: {ROLE_ARN} is not defined in ENV\n"),
            );
        };
        let region = (self.env)(REGION)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.default_region.clone());

        match self.catalog.list(&role, &region).await {
            Ok(buckets) => (StatusCode::OK, render_listing(&buckets)),
            Err(e) => {
                tracing::error!(role, region, error = %e, "Unable to list buckets");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Error: Unable to list buckets, {e}\n"),
                )
            }
        }
    }
}

pub fn render_listing(buckets: &[BucketSummary]) -> String {
    let mut out = String::from("Buckets:\n");
    for bucket in buckets {
        let _ = writeln!(
            out,
            "* {} created on {}",
            bucket.name,
            bucket.created.as_deref().unwrap_or("unknown date")
        );
    }
    out
}

impl Service<Request<Incoming>> for ListerService {
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, _req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move {
            let (status, text) = service.respond().await;
            Ok(make_text_response(status, text))
        })
    }
}
