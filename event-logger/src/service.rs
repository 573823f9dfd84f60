use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use shared::delivery::{DeliveryMetadata, message_body};
use shared::http::{BodyError, ResponseBody, make_error_response, make_text_response, read_body};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

/// Logs each delivered message with its delivery time and source, then acknowledges it.
#[derive(Clone)]
pub struct EventLoggerService {
    max_body_bytes: usize,
}

impl EventLoggerService {
    pub fn new(max_body_bytes: usize) -> Self {
        EventLoggerService { max_body_bytes }
    }

    async fn handle(&self, req: Request<Incoming>) -> Response<ResponseBody> {
        let metadata = DeliveryMetadata::from_headers(req.headers());
        match read_body(req.into_body(), self.max_body_bytes).await {
            Ok(body) => {
                tracing::info!("{}", log_line(&metadata, body));
                make_text_response(StatusCode::OK, "ok\n")
            }
            Err(e @ BodyError::TooLarge(_)) => {
                tracing::warn!(error = %e, "Rejecting delivery");
                make_error_response(StatusCode::PAYLOAD_TOO_LARGE)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Rejecting delivery");
                make_error_response(StatusCode::BAD_REQUEST)
            }
        }
    }
}

pub fn log_line(metadata: &DeliveryMetadata, body: Bytes) -> String {
    let body = message_body(body);
    format!(
        "[{}] {} : {}",
        metadata.time_rfc3339(),
        metadata.source_or_empty(),
        String::from_utf8_lossy(&body)
    )
}

impl Service<Request<Incoming>> for EventLoggerService {
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}
