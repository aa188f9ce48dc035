//! Chunked upload engine for recording files.
//!
//! Splits a byte source into fixed-size chunks and delivers them through a
//! [`ChunkTransport`] with bounded concurrency, per-chunk retry with
//! exponential backoff, cooperative cancellation, and resume of failed
//! chunks without re-sending acknowledged ones.
//!
//! The app supplies a [`ChunkTransport`] implementation (or uses the
//! bundled [`HttpChunkTransport`]) and drives an [`UploadManager`]; no UI
//! or socket wiring lives here.

mod chunked;
mod config;
mod manager;
mod retry;
mod session;
mod transport;

pub use chunked::{ChunkSpan, chunk_spans};
pub use config::UploadConfig;
pub use manager::{ErrorCallback, ProgressCallback, UploadManager, new_session_id};
pub use retry::RetryPolicy;
pub use session::UploadSession;
pub use transport::{ApiConfig, ChunkTransport, HttpChunkTransport};

/// Default chunk size: 1 MiB.
///
/// Matches the chunk size the upload API deduplicates on; the last chunk of
/// a file may be smaller.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Errors produced by the upload engine.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("chunk {chunk_index} failed after {attempts} attempts: {message}")]
    ChunkFailed {
        chunk_index: usize,
        attempts: u32,
        message: String,
    },

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session already active: {0}")]
    SessionActive(String),

    #[error("upload cancelled: {0}")]
    Cancelled(String),
}
