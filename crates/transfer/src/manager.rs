//! Upload manager: session lifecycle and batched chunk delivery.
//!
//! One manager instance is constructed at app startup with the transport it
//! should deliver through, and is shared by reference wherever uploads are
//! started. Sessions with distinct ids are independent; the manager only
//! shares the session table between them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use futures_util::future::join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use recap_protocol::{ChunkFailure, UploadProgress};

use crate::TransferError;
use crate::config::UploadConfig;
use crate::session::UploadSession;
use crate::transport::ChunkTransport;

/// Callback invoked with a progress record after each acknowledged chunk.
pub type ProgressCallback = Box<dyn Fn(UploadProgress) + Send + Sync>;

/// Callback invoked once per chunk whose retry budget is exhausted.
pub type ErrorCallback = Box<dyn Fn(ChunkFailure) + Send + Sync>;

/// Generates a session id in the dashboard's `upload-<uuid>` scheme.
pub fn new_session_id() -> String {
    format!("upload-{}", Uuid::new_v4())
}

/// Delivers byte sources to a [`ChunkTransport`] in fixed-size chunks.
///
/// Chunks are dispatched in batches of at most `max_concurrent`; a batch
/// must fully resolve before the next one starts, which caps outstanding
/// transport calls at the batch width. Failed chunks are retried with
/// exponential backoff, and a session whose upload halts stays tracked so
/// [`resume`](Self::resume) can retry just the failed chunks later.
pub struct UploadManager {
    transport: Arc<dyn ChunkTransport>,
    config: UploadConfig,
    sessions: RwLock<HashMap<String, Arc<UploadSession>>>,
}

impl UploadManager {
    /// Creates a manager with default tuning.
    pub fn new(transport: Arc<dyn ChunkTransport>) -> Self {
        Self::with_config(transport, UploadConfig::default())
    }

    /// Creates a manager with explicit tuning.
    pub fn with_config(transport: Arc<dyn ChunkTransport>, config: UploadConfig) -> Self {
        Self {
            transport,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Uploads `data` under `session_id`.
    ///
    /// Fails fast with [`TransferError::SessionActive`] if the id is
    /// already tracked. On success the session is removed; on failure or
    /// cancellation it stays tracked with its completed/failed bookkeeping
    /// intact so the caller can [`resume`](Self::resume) or
    /// [`discard`](Self::discard) it. Empty input completes immediately
    /// with a single 100% progress report.
    pub async fn start(
        &self,
        data: Vec<u8>,
        session_id: &str,
        on_progress: Option<ProgressCallback>,
        on_error: Option<ErrorCallback>,
    ) -> Result<(), TransferError> {
        let session = {
            let mut sessions = self.sessions.write().unwrap();
            if sessions.contains_key(session_id) {
                return Err(TransferError::SessionActive(session_id.to_string()));
            }
            let session = Arc::new(UploadSession::new(
                session_id.to_string(),
                data,
                self.config.chunk_size,
            ));
            sessions.insert(session_id.to_string(), Arc::clone(&session));
            session
        };

        info!(
            session = %session_id,
            total_bytes = session.total_bytes(),
            chunks = session.total_chunks(),
            "upload started"
        );

        match self
            .drive(&session, on_progress.as_ref(), on_error.as_ref())
            .await
        {
            Ok(()) => {
                self.remove(session_id);
                info!(session = %session_id, "upload complete");
                Ok(())
            }
            Err(e) => {
                // Session stays tracked so failed chunks can be resumed.
                warn!(session = %session_id, error = %e, "upload halted");
                Err(e)
            }
        }
    }

    /// Reads a file from disk and uploads it under `session_id`.
    pub async fn start_path(
        &self,
        path: impl AsRef<Path>,
        session_id: &str,
        on_progress: Option<ProgressCallback>,
        on_error: Option<ErrorCallback>,
    ) -> Result<(), TransferError> {
        let data = tokio::fs::read(path.as_ref()).await?;
        self.start(data, session_id, on_progress, on_error).await
    }

    /// Retries the failed chunks of a tracked session, sequentially in
    /// index order.
    ///
    /// Clears any pending cancellation first. Chunks that already
    /// completed are not re-sent; a session with no failed chunks performs
    /// no transport calls. The session is removed once every chunk has
    /// completed.
    pub async fn resume(
        &self,
        session_id: &str,
        on_progress: Option<ProgressCallback>,
        on_error: Option<ErrorCallback>,
    ) -> Result<(), TransferError> {
        let session = self
            .sessions
            .read()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| TransferError::SessionNotFound(session_id.to_string()))?;

        session.clear_cancelled();

        let failed = session.failed_indices();
        info!(session = %session_id, failed = failed.len(), "resuming upload");

        for index in failed {
            self.upload_chunk(&session, index, on_progress.as_ref(), on_error.as_ref())
                .await?;
        }

        if session.all_completed() {
            session.mark_complete();
            self.remove(session_id);
            info!(session = %session_id, "upload complete");
        }
        Ok(())
    }

    /// Cancels a tracked session; unknown ids are a no-op.
    ///
    /// Cooperative: an attempt already handed to the transport resolves
    /// normally, but no further attempt starts and pending backoff waits
    /// are woken to fail with [`TransferError::Cancelled`].
    pub fn cancel(&self, session_id: &str) {
        if let Some(session) = self.sessions.read().unwrap().get(session_id) {
            session.cancel();
            info!(session = %session_id, "upload cancelled");
        }
    }

    /// Progress snapshot for a tracked session, `None` otherwise
    /// (including after successful completion).
    pub fn progress(&self, session_id: &str) -> Option<UploadProgress> {
        self.sessions
            .read()
            .unwrap()
            .get(session_id)
            .map(|session| session.snapshot())
    }

    /// Drops a tracked session, abandoning its bookkeeping.
    ///
    /// Returns `false` if the id was not tracked.
    pub fn discard(&self, session_id: &str) -> bool {
        let removed = self.remove(session_id);
        if removed {
            info!(session = %session_id, "upload discarded");
        }
        removed
    }

    fn remove(&self, session_id: &str) -> bool {
        self.sessions.write().unwrap().remove(session_id).is_some()
    }

    async fn drive(
        &self,
        session: &Arc<UploadSession>,
        on_progress: Option<&ProgressCallback>,
        on_error: Option<&ErrorCallback>,
    ) -> Result<(), TransferError> {
        let total = session.total_chunks();
        if total == 0 {
            session.mark_complete();
            if let Some(cb) = on_progress {
                cb(session.progress_for(0));
            }
            return Ok(());
        }

        let width = self.config.max_concurrent.max(1);
        let mut next = 0;
        while next < total {
            let batch_end = (next + width).min(total);
            let batch =
                (next..batch_end).map(|index| self.upload_chunk(session, index, on_progress, on_error));
            let results = join_all(batch).await;
            next = batch_end;

            // The whole batch has resolved; an error halts later batches.
            if let Some(err) = results.into_iter().find_map(Result::err) {
                return Err(err);
            }
        }

        session.mark_complete();
        Ok(())
    }

    async fn upload_chunk(
        &self,
        session: &UploadSession,
        index: usize,
        on_progress: Option<&ProgressCallback>,
        on_error: Option<&ErrorCallback>,
    ) -> Result<(), TransferError> {
        let total = session.total_chunks();
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            // Checked before the first dispatch and again after each backoff.
            if session.is_cancelled() {
                return Err(TransferError::Cancelled(session.id().to_string()));
            }

            match self
                .transport
                .send_chunk(session.chunk_bytes(index), index, total, session.id())
                .await
            {
                Ok(()) => {
                    session.mark_completed(index);
                    debug!(session = %session.id(), chunk = index, "chunk acknowledged");
                    if let Some(cb) = on_progress {
                        cb(session.progress_for(index));
                    }
                    return Ok(());
                }
                Err(e) => {
                    attempt += 1;
                    warn!(
                        session = %session.id(),
                        chunk = index,
                        attempt,
                        error = %e,
                        "chunk attempt failed"
                    );

                    if attempt >= max_attempts {
                        let failure = ChunkFailure {
                            session_id: session.id().to_string(),
                            chunk_index: index,
                            error: e.to_string(),
                            retryable: attempt < max_attempts,
                        };
                        session.record_failure(index, failure.clone());
                        if let Some(cb) = on_error {
                            cb(failure);
                        }
                        return Err(TransferError::ChunkFailed {
                            chunk_index: index,
                            attempts: attempt,
                            message: e.to_string(),
                        });
                    }

                    let delay = self.config.retry.delay_for_attempt(attempt);
                    let cancelled = session.cancel_token();
                    tokio::select! {
                        _ = cancelled.cancelled() => {}
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}
