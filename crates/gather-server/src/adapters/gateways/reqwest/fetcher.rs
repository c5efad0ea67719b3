use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::entities::FetchError;
use crate::error::ServeError;
use crate::use_cases::ports::Fetcher;

/// Link-local instance metadata service
pub const METADATA_BASE: &str = "http://169.254.169.254/latest/meta-data/";

/// HTTP GET of `base` joined with the key.
///
/// Each call carries its own short timeout under whatever deadline the caller
/// applies through the cancellation token.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base: Url,
}

impl HttpFetcher {
    pub fn new(base: &str, timeout: Duration) -> Result<Self, ServeError> {
        let base = Url::parse(base)
            .map_err(|e| ServeError::ConfigurationError(format!("metadata base {base}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServeError::ConfigurationError(e.to_string()))?;
        Ok(Self { client, base })
    }

    fn url_for(&self, key: &str) -> Result<Url, FetchError> {
        self.base
            .join(key)
            .map_err(|e| FetchError::InvalidRequest(format!("{key}: {e}")))
    }

    async fn get(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl Fetcher<String> for HttpFetcher {
    async fn fetch(&self, key: &String, cancel: CancellationToken) -> Result<Vec<u8>, FetchError> {
        let url = self.url_for(key)?;
        tokio::select! {
            result = self.get(url) => result,
            () = cancel.cancelled() => Err(FetchError::Cancelled),
        }
    }
}
