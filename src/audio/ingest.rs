/// Per-session accumulator of raw audio chunks
///
/// Chunks are kept in delivery order; `take` hands back their exact
/// concatenation and leaves the buffer empty.
#[derive(Debug, Default)]
pub struct AudioBuffer {
    chunks: Vec<Vec<u8>>,
    total_bytes: usize,
}

impl AudioBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk at the end of the buffer
    pub fn push(&mut self, chunk: Vec<u8>) {
        self.total_bytes += chunk.len();
        self.chunks.push(chunk);
    }

    /// Number of chunks currently buffered
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Number of bytes currently buffered
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.total_bytes == 0
    }

    /// Drain the buffer into one contiguous blob
    pub fn take(&mut self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(self.total_bytes);
        for chunk in self.chunks.drain(..) {
            blob.extend_from_slice(&chunk);
        }
        self.total_bytes = 0;
        blob
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_bytes = 0;
    }
}
