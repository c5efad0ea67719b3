use async_trait::async_trait;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

use crate::error::ServeError;
use crate::use_cases::{AppContext, PageRegistry};

/// Trait for HTTP server implementations
#[async_trait]
pub trait Server: Send + Sync + Clone {
    /// Serve the pages in `registry` until `shutdown` is cancelled.
    ///
    /// If `on_ready` is provided, it will be called with the actual bound address
    /// once the server is ready to accept connections.
    async fn serve<F>(
        &self,
        registry: PageRegistry,
        context: AppContext,
        shutdown: CancellationToken,
        on_ready: Option<F>,
    ) -> Result<(), ServeError>
    where
        F: FnOnce(SocketAddr) + Send + 'static;
}
