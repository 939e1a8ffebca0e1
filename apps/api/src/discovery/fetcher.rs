use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use reqwest::Client;
use thiserror::Error;

pub const PAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
/// Bytes read from a page before the rest is discarded.
pub const MAX_PAGE_BYTES: usize = 500 * 1024;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Page returned status {0}")]
    Status(u16),
}

/// Fetches raw page markup. No rendering or script execution.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

#[derive(Clone)]
pub struct HttpPageFetcher {
    client: Client,
    max_bytes: usize,
}

impl HttpPageFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(PAGE_FETCH_TIMEOUT)
                .user_agent(concat!("jobscout/", env!("CARGO_PKG_VERSION")))
                .build()
                .expect("Failed to build HTTP client"),
            max_bytes: MAX_PAGE_BYTES,
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            let room = self.max_bytes - body.len();
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
