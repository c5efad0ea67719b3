use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use percent_encoding::percent_decode_str;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;

use super::request_log::{handle_panic, log_requests, request_logger, RequestLog};
use crate::entities::PageKind;
use crate::error::ServeError;
use crate::use_cases::ports::Server;
use crate::use_cases::{dump_metadata, render, AppContext, PageRegistry};

const INDEX_TITLE: &str = "Gather Server";

/// Axum-based HTTP server implementation
#[derive(Clone)]
pub struct Axum {
    addr: SocketAddr,
}

impl Axum {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    pub fn bind(addr: impl Into<SocketAddr>) -> Self {
        Self::new(addr.into())
    }
}

impl Default for Axum {
    fn default() -> Self {
        Self::new(([127, 0, 0, 1], 0).into())
    }
}

/// State shared with every handler
#[derive(Clone)]
struct AppState {
    context: AppContext,
    index: Arc<Vec<String>>,
    /// Parent of every per-request token; cancelled on shutdown
    shutdown: CancellationToken,
}

impl AppState {
    /// Token cancelled when the request is dropped or the server shuts down
    fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render::render_index(INDEX_TITLE, &state.index))
}

async fn metadata_html(State(state): State<AppState>, request: Request) -> Html<String> {
    let logger = request_logger(request.extensions(), &state.context.logger);
    let token = state.request_token();
    let _cancel_on_drop = token.clone().drop_guard();

    let report = dump_metadata(&state.context, &token, logger.as_ref()).await;
    Html(report.to_html())
}

async fn metadata_json(State(state): State<AppState>, request: Request) -> Json<serde_json::Value> {
    let logger = request_logger(request.extensions(), &state.context.logger);
    let token = state.request_token();
    let _cancel_on_drop = token.clone().drop_guard();

    let report = dump_metadata(&state.context, &token, logger.as_ref()).await;
    Json(report.to_json())
}

async fn not_found(State(state): State<AppState>, request: Request) -> Response {
    let logger = request_logger(request.extensions(), &state.context.logger);
    if !logger.is_disabled() {
        logger
            .with_field("http_error", &404)
            .with_field("url", request.uri())
            .info("sent 404");
    }
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain")],
        "page not found",
    )
        .into_response()
}

/// True when any component of the decoded path starts with a dot
fn is_hidden(path: &str) -> bool {
    percent_decode_str(path).decode_utf8_lossy().contains("/.")
}

/// Refuse any path with a dot-prefixed component, encoded or not
async fn refuse_hidden(request: Request, next: Next) -> Response {
    if is_hidden(request.uri().path()) {
        return (StatusCode::FORBIDDEN, "forbidden").into_response();
    }
    next.run(request).await
}

fn static_dir(dir: &Path) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(dir))
        .layer(middleware::from_fn(refuse_hidden))
}

/// Build the router for the resolved pages.
///
/// Request logging is only installed when the context logger is enabled.
fn build_router(registry: &PageRegistry, context: AppContext, shutdown: CancellationToken) -> Router {
    let logger = context.logger.clone();
    let mut router: Router<AppState> = Router::new().route("/", get(index));

    for page in registry.pages() {
        let path = page.mount_path();
        if !logger.is_disabled() {
            logger
                .with_field("page", &path)
                .debug("registering page handler");
        }
        router = match &page.kind {
            PageKind::Metadata => router
                .route(&path, get(metadata_html))
                .route(&format!("{path}.json"), get(metadata_json)),
            PageKind::StaticDir(dir) => router.nest_service(&path, static_dir(dir)),
            PageKind::NotFound => router.route(&path, any(not_found)),
        };
    }

    let state = AppState {
        context,
        index: Arc::new(registry.index_names()),
        shutdown,
    };
    let router = router
        .fallback(not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic));

    if logger.is_disabled() {
        router
    } else {
        router.layer(middleware::from_fn_with_state(
            RequestLog::new(logger),
            log_requests,
        ))
    }
}

#[async_trait]
impl Server for Axum {
    async fn serve<F>(
        &self,
        registry: PageRegistry,
        context: AppContext,
        shutdown: CancellationToken,
        on_ready: Option<F>,
    ) -> Result<(), ServeError>
    where
        F: FnOnce(SocketAddr) + Send + 'static,
    {
        let logger = context.logger.clone();
        let router = build_router(&registry, context, shutdown.clone());

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| ServeError::ServerError(format!("listening on {}: {e}", self.addr)))?;

        let addr = listener
            .local_addr()
            .map_err(|e| ServeError::ServerError(e.to_string()))?;

        logger
            .with_field("listen", &self.addr)
            .with_field("bound", &addr)
            .info("accepting connections");

        // Call the on_ready callback if provided
        if let Some(callback) = on_ready {
            callback(addr);
        }

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ServeError::ServerError(e.to_string()))
    }
}
