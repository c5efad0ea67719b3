//! Gather Server
//!
//! A small web server whose interesting page gathers several remote metadata
//! sections in parallel under one shared deadline and renders whatever
//! finished in time, in the order the sections were requested.
//!
//! # Example
//!
//! ```rust,no_run
//! use gather_server::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ServeError> {
//!     let fetcher = HttpFetcher::new(METADATA_BASE, Duration::from_secs(3))?;
//!
//!     // Gather directly, outside of any server
//!     let sections = vec!["hostname".to_string(), "iam/info".to_string()];
//!     let deadline = Deadline::after(Duration::from_secs(2));
//!     let result = ParallelCollector::new()
//!         .run(&sections, Arc::new(fetcher.clone()), &deadline)
//!         .await;
//!     for key in result.missing(&sections) {
//!         println!("timed out: {key}");
//!     }
//!
//!     // Or serve the metadata page
//!     let registry = PageRegistry::new().page(Page::new("aws", PageKind::Metadata))?;
//!     Axum::bind(([127, 0, 0, 1], 8080))
//!         .serve(
//!             registry,
//!             AppContext::new(Arc::new(fetcher)),
//!             CancellationToken::new(),
//!             None::<fn(std::net::SocketAddr)>,
//!         )
//!         .await
//! }
//! ```

mod adapters;
pub mod config;
pub mod entities;
pub mod error;
pub mod use_cases;
pub mod version;

pub use error::ServeError;

#[cfg(feature = "axum")]
pub use adapters::gateways::Axum;
pub use adapters::gateways::{init_tracing, HttpFetcher, LogSettings, TracingLogger, METADATA_BASE};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::entities::{
        CollectionResult, Deadline, FetchError, FetchKey, FetchOutcome, Page, PageKind,
        Precondition,
    };
    pub use crate::error::ServeError;
    pub use crate::use_cases::ports::{
        fetch_fn, FetchFn, Fetcher, Logger, NilLogger, Server, SharedLogger,
    };
    pub use crate::use_cases::{dump_metadata, AppContext, PageRegistry, ParallelCollector};
    pub use crate::{HttpFetcher, TracingLogger, METADATA_BASE};

    #[cfg(feature = "axum")]
    pub use crate::Axum;

    pub use tokio_util::sync::CancellationToken;
}
