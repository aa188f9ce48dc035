use serde::{Deserialize, Serialize};

/// Progress record emitted after each acknowledged chunk.
///
/// `bytes_uploaded` is an estimate: completed chunk count times the
/// configured chunk size. It can exceed `total_bytes` once a short final
/// chunk completes; the dashboard has always displayed this figure, so the
/// estimate is kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub session_id: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub percentage: f64,
    pub bytes_uploaded: u64,
    pub total_bytes: u64,
}

/// Terminal failure record for one chunk whose retry budget is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkFailure {
    pub session_id: String,
    pub chunk_index: usize,
    pub error: String,
    pub retryable: bool,
}
