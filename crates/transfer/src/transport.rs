//! Transport seam between the upload engine and the outside world.
//!
//! `ChunkTransport` is implemented by the app (and mocked in tests);
//! `HttpChunkTransport` is the bundled implementation that posts chunks to
//! the Recap API as multipart form data.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::debug;

use crate::TransferError;

/// Abstract delivery of a single chunk.
///
/// The server is expected to deduplicate by `(session_id, chunk_index)`, so
/// retried sends of the same index are safe. The engine does not bound how
/// long one call may take; a transport that never resolves stalls its
/// chunk's batch, so implementations should enforce their own timeout (the
/// bundled HTTP transport does).
pub trait ChunkTransport: Send + Sync {
    /// Sends one chunk and resolves once the server acknowledges it.
    fn send_chunk(
        &self,
        data: &[u8],
        chunk_index: usize,
        total_chunks: usize,
        session_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransferError>> + Send + '_>>;
}

/// Connection settings for the Recap upload API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the API, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001/api".into(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl ApiConfig {
    /// Builds a config from the environment, falling back to defaults.
    ///
    /// Recognized variables: `RECAP_API_URL`, `RECAP_API_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("RECAP_API_URL") {
            if !url.is_empty() {
                config.base_url = url.trim_end_matches('/').to_string();
            }
        }
        if let Some(ms) = std::env::var("RECAP_API_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&v| v > 0)
        {
            config.timeout = Duration::from_millis(ms);
        }
        config
    }

    fn chunk_url(&self) -> String {
        format!("{}/upload/chunk", self.base_url)
    }
}

/// Posts chunks to the upload API as `multipart/form-data`.
///
/// Field layout matches what the API ingests: the chunk bytes under
/// `chunk`, plus `chunkIndex`, `totalChunks` and `sessionId` text fields.
pub struct HttpChunkTransport {
    client: reqwest::Client,
    chunk_url: String,
}

impl HttpChunkTransport {
    /// Creates a transport for the given API settings.
    pub fn new(config: ApiConfig) -> Result<Self, TransferError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransferError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            chunk_url: config.chunk_url(),
        })
    }

    /// Creates a transport configured from the environment.
    pub fn from_env() -> Result<Self, TransferError> {
        Self::new(ApiConfig::from_env())
    }
}

impl ChunkTransport for HttpChunkTransport {
    fn send_chunk(
        &self,
        data: &[u8],
        chunk_index: usize,
        total_chunks: usize,
        session_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransferError>> + Send + '_>> {
        let client = self.client.clone();
        let url = self.chunk_url.clone();
        let body = data.to_vec();
        let session_id = session_id.to_string();

        Box::pin(async move {
            let form = reqwest::multipart::Form::new()
                .part(
                    "chunk",
                    reqwest::multipart::Part::bytes(body).file_name("chunk"),
                )
                .text("chunkIndex", chunk_index.to_string())
                .text("totalChunks", total_chunks.to_string())
                .text("sessionId", session_id.clone());

            let response = client
                .post(&url)
                .multipart(form)
                .send()
                .await
                .map_err(|e| TransferError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(TransferError::Transport(format!(
                    "chunk {chunk_index} rejected with status {status}"
                )));
            }

            debug!(session = %session_id, chunk = chunk_index, "chunk accepted by API");
            Ok(())
        })
    }
}
