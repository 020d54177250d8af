//! Byte sources the loader pulls asset bodies from.
//!
//! A [`ByteSource`] opens a URL and hands back a [`Body`] that yields chunks
//! one at a time. The loader awaits each chunk before asking for the next,
//! so sources never see concurrent reads on the same body.
//!
//! # Implementations
//!
//! - [`HttpSource`]: HTTP GET via reqwest (native and WASM)
//! - [`MemorySource`]: In-memory assets, used by tests and offline demos

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, RwLock},
};

use bytes::Bytes;
use futures_util::StreamExt;

use crate::error::{Error, Result};

/// Future type returned by sources and bodies.
#[cfg(not(target_family = "wasm"))]
pub type SourceFuture<'a, T> = futures_util::future::BoxFuture<'a, Result<T>>;

/// Future type returned by sources and bodies.
///
/// Browser futures are not `Send`, so WASM uses local futures.
#[cfg(target_family = "wasm")]
pub type SourceFuture<'a, T> = futures_util::future::LocalBoxFuture<'a, Result<T>>;

/// `Send` on native, nothing on WASM.
#[cfg(not(target_family = "wasm"))]
pub trait MaybeSend: Send {}
#[cfg(not(target_family = "wasm"))]
impl<T: Send + ?Sized> MaybeSend for T {}

/// `Send` on native, nothing on WASM.
#[cfg(target_family = "wasm")]
pub trait MaybeSend {}
#[cfg(target_family = "wasm")]
impl<T: ?Sized> MaybeSend for T {}

/// `Sync` on native, nothing on WASM.
#[cfg(not(target_family = "wasm"))]
pub trait MaybeSync: Sync {}
#[cfg(not(target_family = "wasm"))]
impl<T: Sync + ?Sized> MaybeSync for T {}

/// `Sync` on native, nothing on WASM.
#[cfg(target_family = "wasm")]
pub trait MaybeSync {}
#[cfg(target_family = "wasm")]
impl<T: ?Sized> MaybeSync for T {}

/// An opened response body.
pub trait Body: MaybeSend {
    /// The declared total size, if the server reported one.
    fn content_length(&self) -> Option<u64>;

    /// Pull the next chunk.
    ///
    /// Returns `Ok(None)` once the body is exhausted.
    fn next_chunk(&mut self) -> SourceFuture<'_, Option<Bytes>>;
}

/// Something that can open a URL for reading.
pub trait ByteSource: MaybeSend + MaybeSync {
    /// Issue the request and return the body once headers are available.
    fn open(&self, url: &str) -> SourceFuture<'_, Box<dyn Body>>;
}

impl<S: ByteSource + ?Sized> ByteSource for Arc<S> {
    fn open(&self, url: &str) -> SourceFuture<'_, Box<dyn Body>> {
        (**self).open(url)
    }
}

// ============================================================================
// HTTP
// ============================================================================

#[cfg(not(target_family = "wasm"))]
type ChunkStream = futures_util::stream::BoxStream<'static, reqwest::Result<Bytes>>;

#[cfg(target_family = "wasm")]
type ChunkStream = futures_util::stream::LocalBoxStream<'static, reqwest::Result<Bytes>>;

/// Byte source backed by a reqwest client.
#[derive(Debug, Clone, Default)]
pub struct HttpSource {
    http: reqwest::Client,
}

impl HttpSource {
    /// Create a source with a default HTTP client.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Create a source with a custom HTTP client.
    #[must_use]
    pub fn with_http(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl ByteSource for HttpSource {
    fn open(&self, url: &str) -> SourceFuture<'_, Box<dyn Body>> {
        let url = url.to_string();
        Box::pin(async move {
            let response = self.http.get(&url).send().await.map_err(|e| Error::Http {
                url: url.clone(),
                message: e.to_string(),
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::HttpStatus {
                    url,
                    status: status.as_u16(),
                });
            }

            let length = response.content_length();
            tracing::debug!("Opened {url} (content length {length:?})");

            #[cfg(not(target_family = "wasm"))]
            let stream: ChunkStream = response.bytes_stream().boxed();
            #[cfg(target_family = "wasm")]
            let stream: ChunkStream = response.bytes_stream().boxed_local();

            Ok(Box::new(HttpBody {
                url,
                length,
                stream,
            }) as Box<dyn Body>)
        })
    }
}

struct HttpBody {
    url: String,
    length: Option<u64>,
    stream: ChunkStream,
}

impl Body for HttpBody {
    fn content_length(&self) -> Option<u64> {
        self.length
    }

    fn next_chunk(&mut self) -> SourceFuture<'_, Option<Bytes>> {
        Box::pin(async move {
            match self.stream.next().await {
                Some(Ok(chunk)) => Ok(Some(chunk)),
                Some(Err(e)) => Err(Error::Http {
                    url: self.url.clone(),
                    message: e.to_string(),
                }),
                None => Ok(None),
            }
        })
    }
}

// ============================================================================
// Memory
// ============================================================================

/// A canned asset served by [`MemorySource`].
#[derive(Debug, Clone)]
pub struct MemoryAsset {
    chunks: Vec<Bytes>,
    declared_length: Option<u64>,
    fail_after: Option<usize>,
    stall_after: Option<usize>,
}

impl MemoryAsset {
    /// Serve the given chunks, declaring their summed length.
    pub fn new<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let chunks: Vec<Bytes> = chunks.into_iter().map(Into::into).collect();
        let declared = chunks.iter().map(|c| c.len() as u64).sum();
        Self {
            chunks,
            declared_length: Some(declared),
            fail_after: None,
            stall_after: None,
        }
    }

    /// Override the declared length (`None` omits it entirely).
    #[must_use]
    pub fn with_declared_length(mut self, length: Option<u64>) -> Self {
        self.declared_length = length;
        self
    }

    /// Fail the read that follows the first `n` chunks.
    #[must_use]
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Never complete the read that follows the first `n` chunks.
    #[must_use]
    pub fn stalling_after(mut self, n: usize) -> Self {
        self.stall_after = Some(n);
        self
    }
}

/// An in-memory byte source.
///
/// Clones share the same assets and the same open log.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    assets: Arc<RwLock<HashMap<String, MemoryAsset>>>,
    opened: Arc<Mutex<Vec<String>>>,
}

impl MemorySource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset under a URL, replacing any previous one.
    pub fn insert(&self, url: &str, asset: MemoryAsset) {
        self.assets.write().unwrap().insert(url.to_string(), asset);
    }

    /// URLs opened so far, in order.
    #[must_use]
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl ByteSource for MemorySource {
    fn open(&self, url: &str) -> SourceFuture<'_, Box<dyn Body>> {
        self.opened.lock().unwrap().push(url.to_string());
        let asset = self.assets.read().unwrap().get(url).cloned();
        let url = url.to_string();

        Box::pin(async move {
            let Some(asset) = asset else {
                return Err(Error::HttpStatus { url, status: 404 });
            };
            Ok(Box::new(MemoryBody {
                url,
                length: asset.declared_length,
                remaining: asset.chunks.into(),
                served: 0,
                fail_after: asset.fail_after,
                stall_after: asset.stall_after,
            }) as Box<dyn Body>)
        })
    }
}

struct MemoryBody {
    url: String,
    length: Option<u64>,
    remaining: VecDeque<Bytes>,
    served: usize,
    fail_after: Option<usize>,
    stall_after: Option<usize>,
}

impl Body for MemoryBody {
    fn content_length(&self) -> Option<u64> {
        self.length
    }

    fn next_chunk(&mut self) -> SourceFuture<'_, Option<Bytes>> {
        Box::pin(async move {
            if self.stall_after == Some(self.served) {
                futures_util::future::pending::<()>().await;
            }
            if self.fail_after == Some(self.served) {
                return Err(Error::Http {
                    url: self.url.clone(),
                    message: "connection reset".to_string(),
                });
            }
            let chunk = self.remaining.pop_front();
            if chunk.is_some() {
                self.served += 1;
            }
            Ok(chunk)
        })
    }
}
