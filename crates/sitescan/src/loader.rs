//! Streaming asset loader.
//!
//! The loader downloads one body at a time, strictly chunk by chunk, and
//! reports progress after every chunk when the server declared a size.
//! Every await is raced against an [`AbortSignal`] so a view that goes away
//! mid-download stops the transfer and receives no further events.
//!
//! # Example
//!
//! ```ignore
//! use sitescan::{Loader, abort_pair};
//!
//! let loader = Loader::new();
//! let (_handle, signal) = abort_pair();
//! let blob = loader
//!     .load("https://example.com/site.splat", &signal, |p| println!("{:.2}%", p.percent))
//!     .await?;
//! ```

use std::sync::Arc;

use bytes::Bytes;
use futures_util::{
    StreamExt,
    future::{self, Either},
    stream::FuturesUnordered,
};

use crate::{
    abort::AbortSignal,
    download::{DownloadTask, ProgressEvent},
    error::{Error, Result},
    source::{ByteSource, HttpSource, SourceFuture},
};

/// Events emitted while loading a primary asset followed by secondaries.
#[derive(Debug, Clone)]
pub enum SequenceEvent {
    /// Progress of the primary asset.
    Progress(ProgressEvent),
    /// The primary asset finished. Always precedes any secondary event.
    PrimaryReady {
        /// Index of the asset in the requested URL list.
        index: usize,
        /// The asset URL.
        url: String,
        /// The assembled asset bytes.
        blob: Bytes,
    },
    /// A secondary asset finished.
    SecondaryReady {
        /// Index of the asset in the requested URL list.
        index: usize,
        /// The asset URL.
        url: String,
        /// The assembled asset bytes.
        blob: Bytes,
    },
    /// A secondary asset failed. Other assets are unaffected.
    SecondaryFailed {
        /// Index of the asset in the requested URL list.
        index: usize,
        /// The asset URL.
        url: String,
        /// Why it failed.
        error: Error,
    },
}

/// Load status of one asset in a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssetStatus {
    /// Not finished yet.
    #[default]
    Pending,
    /// Bytes are available.
    Ready,
    /// The download failed.
    Failed,
}

/// Per-asset ready flags for a loaded sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetReadiness {
    statuses: Vec<AssetStatus>,
}

impl AssetReadiness {
    /// Create flags for `count` pending assets.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            statuses: vec![AssetStatus::Pending; count],
        }
    }

    /// Status of the asset at `index`.
    #[must_use]
    pub fn status(&self, index: usize) -> Option<AssetStatus> {
        self.statuses.get(index).copied()
    }

    /// Whether the asset at `index` is ready.
    #[must_use]
    pub fn is_ready(&self, index: usize) -> bool {
        self.status(index) == Some(AssetStatus::Ready)
    }

    /// Indices of all ready assets.
    #[must_use]
    pub fn ready_indices(&self) -> Vec<usize> {
        self.statuses
            .iter()
            .enumerate()
            .filter(|(_, status)| **status == AssetStatus::Ready)
            .map(|(index, _)| index)
            .collect()
    }

    /// Record a status change.
    pub fn set(&mut self, index: usize, status: AssetStatus) {
        if let Some(slot) = self.statuses.get_mut(index) {
            *slot = status;
        }
    }
}

/// Downloads asset bodies from a [`ByteSource`].
///
/// The loader is runtime-agnostic: it returns futures and works with any
/// executor.
#[derive(Debug)]
pub struct Loader<S: ByteSource = HttpSource> {
    source: Arc<S>,
}

impl Loader<HttpSource> {
    /// Create a loader that fetches over HTTP.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: Arc::new(HttpSource::new()),
        }
    }
}

impl Default for Loader<HttpSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ByteSource> Clone for Loader<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<S: ByteSource> Loader<S> {
    /// Create a loader over a custom byte source.
    #[must_use]
    pub fn with_source(source: S) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    /// The underlying byte source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Download `url`, reporting progress after every chunk.
    ///
    /// Fails with [`Error::LengthUnknown`] before reading the body when the
    /// server does not declare a size; no progress is emitted in that case.
    /// Progress is non-decreasing and ends at exactly 100 on success.
    pub async fn load<F>(&self, url: &str, signal: &AbortSignal, mut on_progress: F) -> Result<Bytes>
    where
        F: FnMut(ProgressEvent),
    {
        tracing::info!("Loading {url}");
        let mut task = DownloadTask::new(url);
        let result = self
            .run(&mut task, signal, true, &mut on_progress)
            .await;
        Self::finish(&mut task, result)
    }

    /// Download `url` without progress reporting.
    ///
    /// Works whether or not the server declares a size.
    pub async fn load_unsized(&self, url: &str, signal: &AbortSignal) -> Result<Bytes> {
        tracing::info!("Loading {url} in the background");
        let mut task = DownloadTask::new(url);
        let result = self
            .run(&mut task, signal, false, &mut |_: ProgressEvent| {})
            .await;
        Self::finish(&mut task, result)
    }

    /// Load a primary asset with progress, then the remaining assets.
    ///
    /// The primary asset is fully loaded before any other URL is opened.
    /// The others are then loaded concurrently without progress; each one
    /// reports its own completion or failure. If the primary fails, the
    /// error is returned and nothing else is loaded. Once the signal fires,
    /// no further events are emitted and [`Error::Aborted`] is returned.
    pub async fn load_sequence<F>(
        &self,
        urls: &[String],
        primary_index: usize,
        signal: &AbortSignal,
        mut on_event: F,
    ) -> Result<AssetReadiness>
    where
        F: FnMut(SequenceEvent),
    {
        let Some(primary_url) = urls.get(primary_index) else {
            return Err(Error::InvalidData {
                context: "asset sequence",
                detail: format!(
                    "primary index {primary_index} out of range for {} urls",
                    urls.len()
                ),
            });
        };

        let mut readiness = AssetReadiness::new(urls.len());

        let blob = self
            .load(primary_url, signal, |event| {
                on_event(SequenceEvent::Progress(event));
            })
            .await?;
        readiness.set(primary_index, AssetStatus::Ready);
        on_event(SequenceEvent::PrimaryReady {
            index: primary_index,
            url: primary_url.clone(),
            blob,
        });
        if signal.is_aborted() {
            return Err(Error::Aborted {
                url: primary_url.clone(),
            });
        }

        let mut pending: FuturesUnordered<_> = urls
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != primary_index)
            .map(|(index, url)| async move { (index, url, self.load_unsized(url, signal).await) })
            .collect();

        // An aborted sequence reports nothing further and never succeeds.
        while let Some((index, url, result)) = pending.next().await {
            if signal.is_aborted() {
                return Err(Error::Aborted { url: url.clone() });
            }
            match result {
                Err(Error::Aborted { url }) => return Err(Error::Aborted { url }),
                Ok(blob) => {
                    readiness.set(index, AssetStatus::Ready);
                    on_event(SequenceEvent::SecondaryReady {
                        index,
                        url: url.clone(),
                        blob,
                    });
                }
                Err(error) => {
                    readiness.set(index, AssetStatus::Failed);
                    on_event(SequenceEvent::SecondaryFailed {
                        index,
                        url: url.clone(),
                        error,
                    });
                }
            }
        }

        Ok(readiness)
    }

    async fn run<F>(
        &self,
        task: &mut DownloadTask,
        signal: &AbortSignal,
        report: bool,
        on_progress: &mut F,
    ) -> Result<Bytes>
    where
        F: FnMut(ProgressEvent),
    {
        let url = task.source_url().to_string();
        if signal.is_aborted() {
            return Err(Error::Aborted { url });
        }

        let mut body = until_aborted(self.source.open(&url), signal, &url).await?;
        let total = body.content_length();
        if report && total.is_none() {
            return Err(Error::LengthUnknown { url });
        }
        task.set_total_bytes(total);

        let mut reached_full = false;
        loop {
            if signal.is_aborted() {
                return Err(Error::Aborted { url });
            }

            let Some(chunk) = until_aborted(body.next_chunk(), signal, &url).await? else {
                break;
            };
            tracing::debug!("{url}: received {} bytes", chunk.len());

            if let Some(event) = task.push_chunk(chunk)
                && report
            {
                reached_full = event.percent >= 100.0;
                on_progress(event);
            }
        }
        drop(body);

        let blob = task.complete()?;
        if report
            && !reached_full
            && let Some(event) = task.progress_event()
        {
            on_progress(event);
        }
        Ok(blob)
    }

    fn finish(task: &mut DownloadTask, result: Result<Bytes>) -> Result<Bytes> {
        match result {
            Ok(blob) => {
                tracing::info!("Loaded {} ({} bytes)", task.source_url(), blob.len());
                Ok(blob)
            }
            Err(e) => {
                task.fail();
                tracing::warn!("Failed to load {}: {e}", task.source_url());
                Err(e)
            }
        }
    }
}

/// Await `future` unless `signal` fires first.
async fn until_aborted<T>(
    future: SourceFuture<'_, T>,
    signal: &AbortSignal,
    url: &str,
) -> Result<T> {
    let aborted = std::pin::pin!(signal.aborted());
    match future::select(future, aborted).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => Err(Error::Aborted {
            url: url.to_string(),
        }),
    }
}
