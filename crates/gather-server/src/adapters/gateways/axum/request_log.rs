use axum::{
    body::HttpBody,
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::{header, Extensions, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Instant;

use crate::use_cases::gather::panic_message;
use crate::use_cases::ports::SharedLogger;

/// Per-request logger, placed in request extensions by [`log_requests`]
#[derive(Clone)]
pub(crate) struct RequestLogger(pub(crate) SharedLogger);

/// Logger for this request, or `fallback` when request logging is off
pub(crate) fn request_logger(extensions: &Extensions, fallback: &SharedLogger) -> SharedLogger {
    extensions
        .get::<RequestLogger>()
        .map(|l| l.0.clone())
        .unwrap_or_else(|| fallback.clone())
}

/// Set on the 500 response produced for a panicking handler
#[derive(Clone, Debug)]
struct PanicMessage(String);

/// Turn a handler panic into a 500; [`log_requests`] logs it
pub(crate) fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let mut response =
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response();
    response
        .extensions_mut()
        .insert(PanicMessage(panic_message(&*panic)));
    response
}

/// State for the request logging middleware
#[derive(Clone)]
pub(crate) struct RequestLog {
    logger: SharedLogger,
    // not unique across a cluster
    last_request_id: Arc<AtomicU64>,
}

impl RequestLog {
    pub(crate) fn new(logger: SharedLogger) -> Self {
        Self {
            logger,
            last_request_id: Arc::new(AtomicU64::new(0)),
        }
    }
}

/// Bytes in the response body, when known before it is streamed
fn response_length(response: &Response) -> Option<u64> {
    HttpBody::size_hint(response.body()).exact().or_else(|| {
        response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    })
}

/// Log each request when received and when responded to
pub(crate) async fn log_requests(
    State(log): State<RequestLog>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = log.last_request_id.fetch_add(1, Ordering::Relaxed) + 1;
    let page = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "-".to_string());
    let logger = log
        .logger
        .with_field("request", &request_id)
        .with_field("page", &page);

    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string();
    logger
        .with_field("method", request.method())
        .with_field("url_path", &request.uri().path())
        .with_field("url_query", &request.uri().query().unwrap_or_default())
        .with_field("host", &host)
        .with_field("remote", &remote)
        .info("received");

    request
        .extensions_mut()
        .insert(RequestLogger(logger.clone()));

    let started = Instant::now();
    let response = next.run(request).await;
    let duration_us = format!("{:.2}", started.elapsed().as_secs_f64() * 1_000_000.0);

    if let Some(PanicMessage(message)) = response.extensions().get::<PanicMessage>() {
        logger.with_field("panic", message).error("run-time panic");
    }

    let length = response_length(&response)
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string());
    logger
        .with_field("code", &response.status().as_u16())
        .with_field("duration_us", &duration_us)
        .with_field("length", &length)
        .info("responded");

    response
}
