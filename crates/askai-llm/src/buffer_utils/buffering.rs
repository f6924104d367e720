use std::collections::VecDeque;

use crate::error::ProviderError;

/// Byte buffer that yields complete `\n`-terminated lines
///
/// Shared by the SSE reader and the NDJSON subprocess reader; chunks may split
/// lines (and UTF-8 sequences) anywhere.
pub struct CircularLineBuffer {
    buffer: VecDeque<u8>,
}

impl CircularLineBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Next complete line, trimmed. `None` until a newline arrives.
    pub fn next_line(&mut self) -> Option<Result<String, ProviderError>> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        Some(decode(&line_bytes))
    }

    /// Whatever is left without a trailing newline, for end-of-stream handling
    pub fn take_remainder(&mut self) -> Option<Result<String, ProviderError>> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest: Vec<u8> = self.buffer.drain(..).collect();
        Some(decode(&rest))
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn decode(bytes: &[u8]) -> Result<String, ProviderError> {
    std::str::from_utf8(bytes)
        .map(|s| s.trim().to_string())
        .map_err(|e| ProviderError::Stream(format!("Invalid UTF-8: {}", e)))
}
