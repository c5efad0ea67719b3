use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::entities::{FetchError, FetchKey};

/// A single remote lookup.
///
/// Implementations are invoked concurrently, one call per key, and should
/// return promptly once `cancel` fires rather than run past the round.
#[async_trait]
pub trait Fetcher<K: FetchKey>: Send + Sync {
    async fn fetch(&self, key: &K, cancel: CancellationToken) -> Result<Vec<u8>, FetchError>;
}

/// Fetcher backed by an async closure
pub struct FetchFn<F> {
    f: F,
}

/// Wrap an async closure `(key, cancel) -> Result<Vec<u8>, FetchError>` as a [`Fetcher`]
pub fn fetch_fn<K, F, Fut>(f: F) -> FetchFn<F>
where
    K: FetchKey,
    F: Fn(K, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<u8>, FetchError>> + Send,
{
    FetchFn { f }
}

#[async_trait]
impl<K, F, Fut> Fetcher<K> for FetchFn<F>
where
    K: FetchKey,
    F: Fn(K, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<u8>, FetchError>> + Send,
{
    async fn fetch(&self, key: &K, cancel: CancellationToken) -> Result<Vec<u8>, FetchError> {
        (self.f)(key.clone(), cancel).await
    }
}

impl<F> std::fmt::Debug for FetchFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FetchFn").field(&"<fn>").finish()
    }
}
