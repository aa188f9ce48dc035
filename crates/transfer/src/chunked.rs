use crate::DEFAULT_CHUNK_SIZE;

/// A contiguous byte range of the source, the unit of upload and retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    /// Byte offset within the source.
    pub offset: usize,
    /// Length of this chunk in bytes.
    pub len: usize,
}

impl ChunkSpan {
    /// Returns the byte range this span covers.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Slices a source of `file_size` bytes into fixed-size spans.
///
/// Every span is `chunk_size` long except the last, which may be shorter.
/// A zero-byte source produces no spans. If `chunk_size` is 0,
/// [`DEFAULT_CHUNK_SIZE`] (1 MiB) is used.
pub fn chunk_spans(file_size: usize, chunk_size: usize) -> Vec<ChunkSpan> {
    let chunk_size = if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size
    };

    let mut spans = Vec::with_capacity(file_size.div_ceil(chunk_size));
    let mut offset = 0;
    while offset < file_size {
        let len = chunk_size.min(file_size - offset);
        spans.push(ChunkSpan { offset, len });
        offset += len;
    }
    spans
}
