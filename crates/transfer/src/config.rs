use crate::DEFAULT_CHUNK_SIZE;
use crate::retry::RetryPolicy;

/// Tuning knobs for an [`UploadManager`](crate::UploadManager) instance.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Chunk size in bytes.
    pub chunk_size: usize,
    /// Maximum chunks dispatched concurrently per batch.
    pub max_concurrent: usize,
    /// Per-chunk retry policy.
    pub retry: RetryPolicy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrent: 3,
            retry: RetryPolicy::default(),
        }
    }
}

impl UploadConfig {
    /// Builds a config from the environment, falling back to defaults.
    ///
    /// Recognized variables: `RECAP_UPLOAD_CHUNK_SIZE` (bytes),
    /// `RECAP_UPLOAD_MAX_CONCURRENT`, `RECAP_UPLOAD_MAX_RETRIES`.
    /// Unparseable or zero values keep the default.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(chunk_size) = env_usize("RECAP_UPLOAD_CHUNK_SIZE") {
            config.chunk_size = chunk_size;
        }
        if let Some(max_concurrent) = env_usize("RECAP_UPLOAD_MAX_CONCURRENT") {
            config.max_concurrent = max_concurrent;
        }
        if let Some(max_retries) = env_usize("RECAP_UPLOAD_MAX_RETRIES") {
            config.retry.max_attempts = max_retries as u32;
        }
        config
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
}
