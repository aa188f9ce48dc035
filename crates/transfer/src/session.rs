use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, RwLock};

use tokio_util::sync::CancellationToken;

use recap_protocol::{ChunkFailure, UploadProgress};

use crate::chunked::{ChunkSpan, chunk_spans};

/// State of one tracked upload, keyed by a caller-supplied session id.
///
/// The byte source and span table are fixed at creation; only the
/// completed/failed bookkeeping and the cancellation signal change
/// afterwards. Chunk indices move between `completed` and `failed` such
/// that the two sets never intersect; the remainder are pending or
/// in flight.
pub struct UploadSession {
    id: String,
    data: Vec<u8>,
    chunk_size: usize,
    spans: Vec<ChunkSpan>,
    // Replaced with a fresh token when a resume clears cancellation.
    cancel: Mutex<CancellationToken>,
    state: RwLock<SessionState>,
}

struct SessionState {
    completed: HashSet<usize>,
    failed: HashMap<usize, ChunkFailure>,
    complete: bool,
}

impl UploadSession {
    /// Creates a session over `data`, sliced into `chunk_size` chunks.
    pub fn new(id: String, data: Vec<u8>, chunk_size: usize) -> Self {
        let spans = chunk_spans(data.len(), chunk_size);
        Self {
            id,
            data,
            chunk_size,
            spans,
            cancel: Mutex::new(CancellationToken::new()),
            state: RwLock::new(SessionState {
                completed: HashSet::new(),
                failed: HashMap::new(),
                complete: false,
            }),
        }
    }

    /// Returns the session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of chunks the source was sliced into.
    pub fn total_chunks(&self) -> usize {
        self.spans.len()
    }

    /// Size of the source in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.data.len() as u64
    }

    /// Returns the bytes of chunk `index`.
    ///
    /// Panics if `index` is out of range; callers only iterate the span
    /// table fixed at creation.
    pub fn chunk_bytes(&self, index: usize) -> &[u8] {
        &self.data[self.spans[index].range()]
    }

    /// Marks a chunk acknowledged, clearing any prior failure record.
    pub fn mark_completed(&self, index: usize) {
        let mut state = self.state.write().unwrap();
        state.failed.remove(&index);
        state.completed.insert(index);
    }

    /// Records a terminal failure for a chunk.
    ///
    /// A failure never overwrites a success: if the chunk completed in the
    /// meantime the record is dropped.
    pub fn record_failure(&self, index: usize, failure: ChunkFailure) {
        let mut state = self.state.write().unwrap();
        if !state.completed.contains(&index) {
            state.failed.insert(index, failure);
        }
    }

    /// Failed chunk indices in ascending order.
    pub fn failed_indices(&self) -> Vec<usize> {
        let state = self.state.read().unwrap();
        let mut indices: Vec<usize> = state.failed.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    /// Returns `true` once every chunk index is in `completed`.
    pub fn all_completed(&self) -> bool {
        let state = self.state.read().unwrap();
        state.completed.len() == self.spans.len()
    }

    /// Marks the session complete.
    pub fn mark_complete(&self) {
        self.state.write().unwrap().complete = true;
    }

    /// Returns `true` if the session has been marked complete.
    pub fn is_complete(&self) -> bool {
        self.state.read().unwrap().complete
    }

    /// Trips the cancellation signal.
    ///
    /// In-flight transport calls are not interrupted; the signal is
    /// observed before each dispatch and during backoff waits.
    pub fn cancel(&self) {
        self.cancel.lock().unwrap().cancel();
    }

    /// Returns `true` if the session is currently cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.lock().unwrap().is_cancelled()
    }

    /// Clears cancellation by installing a fresh signal (used by resume).
    pub fn clear_cancelled(&self) {
        *self.cancel.lock().unwrap() = CancellationToken::new();
    }

    /// Returns a handle to the current cancellation signal.
    ///
    /// Backoff sleeps race against this so a cancel wakes them
    /// immediately instead of waiting out the delay.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.lock().unwrap().clone()
    }

    /// Progress record for a just-acknowledged chunk.
    pub fn progress_for(&self, chunk_index: usize) -> UploadProgress {
        let completed = self.state.read().unwrap().completed.len();
        self.progress_record(chunk_index, completed)
    }

    /// Point-in-time progress snapshot.
    ///
    /// `chunk_index` carries the completed-chunk count here, matching what
    /// the dashboard polls for.
    pub fn snapshot(&self) -> UploadProgress {
        let completed = self.state.read().unwrap().completed.len();
        self.progress_record(completed, completed)
    }

    fn progress_record(&self, chunk_index: usize, completed: usize) -> UploadProgress {
        let total = self.spans.len();
        let percentage = if total == 0 {
            100.0
        } else {
            completed as f64 / total as f64 * 100.0
        };
        UploadProgress {
            session_id: self.id.clone(),
            chunk_index,
            total_chunks: total,
            percentage,
            // Estimate: the short final chunk is not re-measured.
            bytes_uploaded: (completed * self.chunk_size) as u64,
            total_bytes: self.total_bytes(),
        }
    }
}
