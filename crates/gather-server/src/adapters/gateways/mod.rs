#[cfg(feature = "axum")]
mod axum;
mod reqwest;
mod tracing;

#[cfg(feature = "axum")]
pub use self::axum::Axum;
pub use self::reqwest::{HttpFetcher, METADATA_BASE};
pub use self::tracing::{init_tracing, LogSettings, TracingLogger};
