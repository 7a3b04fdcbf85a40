//! Capture buffer for raw session output.
//!
//! Bytes are kept exactly as the device sent them (escape sequences, page
//! banners and all) so that a [`CommandResult`](crate::session::CommandResult)
//! can expose the raw capture alongside the sanitized text.

use bytes::{Bytes, BytesMut};

use super::patterns::{MarkerMatch, MarkerScanner};

/// Buffer for accumulating output from one engine operation.
#[derive(Debug)]
pub struct CaptureBuffer {
    /// The accumulated output buffer.
    buffer: BytesMut,
}

impl CaptureBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Append newly received bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Run a scanner over the accumulated bytes.
    pub fn scan(&self, scanner: &mut MarkerScanner) -> Option<MarkerMatch> {
        scanner.next_match(&self.buffer)
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Bytes {
        std::mem::take(&mut self.buffer).freeze()
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for CaptureBuffer {
    fn default() -> Self {
        Self::new()
    }
}
