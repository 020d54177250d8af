//! Per-download bookkeeping.
//!
//! A [`DownloadTask`] accumulates the chunks of one body in arrival order,
//! tracks how many bytes have arrived, and turns them into a single
//! immutable blob once the body ends.

use bytes::{Bytes, BytesMut};

use crate::error::{Error, Result};

/// Lifecycle of a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    /// Requested, no bytes yet.
    #[default]
    Pending,
    /// At least one chunk has arrived.
    InFlight,
    /// All bytes arrived and were assembled into a blob.
    Completed,
    /// Transport error, short body, or abort.
    Failed,
}

/// Progress of a download with a known total size.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// The URL being downloaded.
    pub url: String,
    /// Bytes received so far.
    pub received_bytes: u64,
    /// Bytes declared by the server.
    pub total_bytes: u64,
    /// Percentage in `[0, 100]`.
    pub percent: f64,
}

/// Percentage of `total` covered by `received`, clamped to `[0, 100]`.
///
/// An empty body counts as fully received.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn percent_of(received: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (received as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

/// State of a single download.
#[derive(Debug)]
pub struct DownloadTask {
    source_url: String,
    total_bytes: Option<u64>,
    received_bytes: u64,
    chunks: Vec<Bytes>,
    state: TaskState,
}

impl DownloadTask {
    /// Create a pending task for a URL.
    #[must_use]
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            total_bytes: None,
            received_bytes: 0,
            chunks: Vec::new(),
            state: TaskState::Pending,
        }
    }

    /// Record the size declared by the server once headers arrive.
    pub fn set_total_bytes(&mut self, total_bytes: Option<u64>) {
        self.total_bytes = total_bytes;
    }

    /// The URL being downloaded.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// The declared total size, if known.
    #[must_use]
    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }

    /// Bytes received so far.
    #[must_use]
    pub fn received_bytes(&self) -> u64 {
        self.received_bytes
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Current progress, if the total size is known.
    #[must_use]
    pub fn percent(&self) -> Option<f64> {
        self.total_bytes
            .map(|total| percent_of(self.received_bytes, total))
    }

    /// Append the next chunk.
    ///
    /// Returns a progress event when the total size is known.
    pub fn push_chunk(&mut self, chunk: Bytes) -> Option<ProgressEvent> {
        debug_assert!(matches!(
            self.state,
            TaskState::Pending | TaskState::InFlight
        ));
        self.state = TaskState::InFlight;

        if !chunk.is_empty() {
            self.received_bytes += chunk.len() as u64;
            self.chunks.push(chunk);
        }

        self.progress_event()
    }

    /// Progress event for the current byte count, if the total size is known.
    #[must_use]
    pub fn progress_event(&self) -> Option<ProgressEvent> {
        let total_bytes = self.total_bytes?;
        Some(ProgressEvent {
            url: self.source_url.clone(),
            received_bytes: self.received_bytes,
            total_bytes,
            percent: percent_of(self.received_bytes, total_bytes),
        })
    }

    /// Finish the task after the body ended and assemble the blob.
    ///
    /// Fails with [`Error::Truncated`] when fewer bytes than declared arrived.
    /// Extra bytes beyond the declared length are kept.
    pub fn complete(&mut self) -> Result<Bytes> {
        if let Some(expected) = self.total_bytes
            && self.received_bytes < expected
        {
            self.fail();
            return Err(Error::Truncated {
                url: self.source_url.clone(),
                received: self.received_bytes,
                expected,
            });
        }

        let blob = if self.chunks.len() == 1 {
            self.chunks.pop().unwrap_or_default()
        } else {
            let capacity = usize::try_from(self.received_bytes).unwrap_or(0);
            let mut buffer = BytesMut::with_capacity(capacity);
            for chunk in self.chunks.drain(..) {
                buffer.extend_from_slice(&chunk);
            }
            buffer.freeze()
        };

        self.state = TaskState::Completed;
        Ok(blob)
    }

    /// Mark the task failed and drop any buffered chunks.
    pub fn fail(&mut self) {
        self.chunks.clear();
        self.state = TaskState::Failed;
    }
}
