//! Stream reassembly: turns arbitrary read chunks into complete frames.

use tracing::warn;

use super::frame::Frame;
use crate::config::MAX_PENDING_BYTES;

const DELIMITER: u8 = b'\n';

/// Per-connection decoder holding the bytes of a partially received frame.
///
/// Lines are only decoded as UTF-8 once complete, so a multi-byte character
/// split across reads is reassembled correctly.
#[derive(Debug)]
pub struct FrameDecoder {
    pending: Vec<u8>,
    limit: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_limit(MAX_PENDING_BYTES)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            limit,
        }
    }

    /// Feed a chunk and return every frame it completes, in order.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.pending.extend_from_slice(chunk);

        let Some(last) = self.pending.iter().rposition(|&b| b == DELIMITER) else {
            self.enforce_limit();
            return Vec::new();
        };

        let rest = self.pending.split_off(last + 1);
        let complete = std::mem::replace(&mut self.pending, rest);
        let frames = complete
            .split(|&b| b == DELIMITER)
            .filter_map(|line| Frame::parse(&String::from_utf8_lossy(line)))
            .collect();
        self.enforce_limit();
        frames
    }

    /// Bytes received after the last complete frame.
    pub fn remainder(&self) -> &[u8] {
        &self.pending
    }

    fn enforce_limit(&mut self) {
        if self.pending.len() > self.limit {
            warn!(
                "Dropping {} buffered bytes without a frame delimiter",
                self.pending.len()
            );
            self.pending.clear();
        }
    }
}
