//! Cooperative cancellation for downloads.
//!
//! An [`AbortHandle`] is held by whoever owns the download (usually a view);
//! the matching [`AbortSignal`] travels into the loader. Aborting, or simply
//! dropping the handle when the owner goes away, wakes every pending
//! [`AbortSignal::aborted`] future.
//!
//! The pair is a zero-capacity use of an `async_channel`: nothing is ever
//! sent, and closing the channel is the signal.

/// Owning side of an abort pair.
#[derive(Debug)]
pub struct AbortHandle {
    tx: async_channel::Sender<()>,
}

/// Observing side of an abort pair. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: async_channel::Receiver<()>,
    /// Keeps the channel open forever for [`AbortSignal::never`].
    _keepalive: Option<async_channel::Sender<()>>,
}

/// Create a connected handle/signal pair.
#[must_use]
pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = async_channel::bounded(1);
    (
        AbortHandle { tx },
        AbortSignal {
            rx,
            _keepalive: None,
        },
    )
}

impl AbortHandle {
    /// Abort every operation observing the paired signal.
    pub fn abort(&self) {
        self.tx.close();
    }

    /// Check whether [`abort`](Self::abort) has been called.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.tx.is_closed()
    }
}

impl AbortSignal {
    /// A signal that is never aborted.
    #[must_use]
    pub fn never() -> Self {
        let (tx, rx) = async_channel::bounded(1);
        Self {
            rx,
            _keepalive: Some(tx),
        }
    }

    /// Check whether the paired handle aborted or was dropped.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.rx.is_closed()
    }

    /// Resolve once the paired handle aborts or is dropped.
    pub async fn aborted(&self) {
        while self.rx.recv().await.is_ok() {}
    }
}
