//! Revocable handles to completed asset blobs.
//!
//! Completed downloads are published into a [`HandleRegistry`], which hands
//! back an [`ObjectHandle`] that renderers resolve to bytes. A handle keeps its
//! blob alive until it is revoked, so owners must release handles they no
//! longer display. [`AssetSlot`] does that bookkeeping for the common case of
//! "one displayed asset that gets swapped".

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use bytes::Bytes;

/// URL scheme prefix for handles.
const HANDLE_PREFIX: &str = "blob:sitescan/";

/// A process-local reference to a published blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    id: u64,
}

impl ObjectHandle {
    /// The loadable URL for this handle.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{HANDLE_PREFIX}{}", self.id)
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{HANDLE_PREFIX}{}", self.id)
    }
}

/// Store of live blobs keyed by handle.
///
/// Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct HandleRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    entries: RwLock<HashMap<u64, Bytes>>,
    next_id: AtomicU64,
}

impl HandleRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a blob and return a handle to it.
    pub fn create(&self, blob: Bytes) -> ObjectHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.entries.write().unwrap().insert(id, blob);
        let handle = ObjectHandle { id };
        tracing::debug!("Created {handle}");
        handle
    }

    /// Look up the blob behind a handle.
    ///
    /// Returns `None` once the handle has been revoked.
    #[must_use]
    pub fn resolve(&self, handle: &ObjectHandle) -> Option<Bytes> {
        self.inner.entries.read().unwrap().get(&handle.id).cloned()
    }

    /// Release a handle.
    ///
    /// Returns true if the handle was live. Revoking twice is a no-op.
    pub fn revoke(&self, handle: &ObjectHandle) -> bool {
        let released = self.inner.entries.write().unwrap().remove(&handle.id).is_some();
        if released {
            tracing::debug!("Revoked {handle}");
        }
        released
    }

    /// Number of live handles.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.inner.entries.read().unwrap().len()
    }

    /// Total bytes held by live handles.
    #[must_use]
    pub fn live_bytes(&self) -> usize {
        self.inner
            .entries
            .read()
            .unwrap()
            .values()
            .map(Bytes::len)
            .sum()
    }
}

/// Owner of the single live handle for one displayed asset.
///
/// Replacing the handle revokes the previous one; dropping the slot revokes
/// the current one.
#[derive(Debug)]
pub struct AssetSlot {
    registry: HandleRegistry,
    current: Option<ObjectHandle>,
}

impl AssetSlot {
    /// Create an empty slot publishing into `registry`.
    #[must_use]
    pub fn new(registry: HandleRegistry) -> Self {
        Self {
            registry,
            current: None,
        }
    }

    /// Publish a new blob, revoking the previously displayed one.
    pub fn replace(&mut self, blob: Bytes) -> ObjectHandle {
        self.clear();
        let handle = self.registry.create(blob);
        self.current = Some(handle.clone());
        handle
    }

    /// The currently displayed handle.
    #[must_use]
    pub fn current(&self) -> Option<&ObjectHandle> {
        self.current.as_ref()
    }

    /// Revoke the current handle, if any.
    pub fn clear(&mut self) {
        if let Some(previous) = self.current.take() {
            self.registry.revoke(&previous);
        }
    }
}

impl Drop for AssetSlot {
    fn drop(&mut self) {
        self.clear();
    }
}

/// What a renderer consumes to build a displayable point cloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderAsset {
    /// Handle to the asset bytes.
    pub handle: ObjectHandle,
    /// Maximum number of points/splats the renderer should draw.
    pub point_budget: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_resolve() {
        let registry = HandleRegistry::new();
        let handle = registry.create(Bytes::from_static(b"splat"));

        assert!(handle.url().starts_with("blob:sitescan/"));
        assert_eq!(registry.resolve(&handle), Some(Bytes::from_static(b"splat")));
        assert_eq!(registry.live_count(), 1);
        assert_eq!(registry.live_bytes(), 5);
    }

    #[test]
    fn test_double_revoke_and_use_after_revoke() {
        let registry = HandleRegistry::new();
        let handle = registry.create(Bytes::from_static(b"splat"));

        assert!(registry.revoke(&handle));
        assert!(!registry.revoke(&handle));
        assert_eq!(registry.resolve(&handle), None);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_handles_are_unique() {
        let registry = HandleRegistry::new();
        let a = registry.create(Bytes::from_static(b"a"));
        let b = registry.create(Bytes::from_static(b"a"));
        assert_ne!(a, b);
        assert_ne!(a.url(), b.url());
    }

    #[test]
    fn test_slot_revokes_previous_on_replace() {
        let registry = HandleRegistry::new();
        let mut slot = AssetSlot::new(registry.clone());

        let first = slot.replace(Bytes::from_static(b"first"));
        let second = slot.replace(Bytes::from_static(b"second"));

        assert_eq!(registry.resolve(&first), None);
        assert_eq!(registry.resolve(&second), Some(Bytes::from_static(b"second")));
        assert_eq!(slot.current(), Some(&second));
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn test_slot_drop_revokes_current() {
        let registry = HandleRegistry::new();
        {
            let mut slot = AssetSlot::new(registry.clone());
            slot.replace(Bytes::from_static(b"scan"));
            assert_eq!(registry.live_count(), 1);
        }
        assert_eq!(registry.live_count(), 0);
    }
}
