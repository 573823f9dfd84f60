use crate::http::{ResponseBody, make_error_response, make_text_response};
use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

/// Health and readiness probes, served on a listener separate from the main service.
pub struct AdminService<F> {
    name: &'static str,
    is_ready: F,
}

impl<F> AdminService<F>
where
    F: Fn() -> bool,
{
    pub fn new(name: &'static str, is_ready: F) -> Self {
        Self { name, is_ready }
    }

    fn respond(&self, path: &str) -> Response<ResponseBody> {
        match path {
            "/health" => make_text_response(StatusCode::OK, "ok\n"),
            "/ready" => match (self.is_ready)() {
                true => make_text_response(StatusCode::OK, "ok\n"),
                false => make_error_response(StatusCode::SERVICE_UNAVAILABLE),
            },
            "/" => make_text_response(StatusCode::OK, format!("{}\n", self.name)),
            _ => make_error_response(StatusCode::NOT_FOUND),
        }
    }
}

impl<F> Service<Request<Incoming>> for AdminService<F>
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let res = self.respond(req.uri().path());
        Box::pin(async move { Ok(res) })
    }
}
