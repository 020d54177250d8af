//! Loading pipeline and free-fly camera control for a construction-site
//! point-cloud viewer.
//!
//! This crate downloads a set of model assets over HTTP with progress
//! reporting, turns each downloaded blob into a locally resolvable handle,
//! and drives an external look-at camera from keyboard input, hotspot
//! selections and a home reset.
//!
//! # Design principles
//!
//! - **Web-compatible**: Works on desktop and WASM via reqwest
//! - **Runtime-agnostic**: Loading returns plain futures, works with any executor
//! - **Renderer-agnostic**: The camera and fullscreen surface are traits
//!
//! # Example
//!
//! ```ignore
//! use sitescan::{HandleRegistry, Loader, SequenceEvent, abort_pair};
//!
//! let loader = Loader::new();
//! let registry = HandleRegistry::new();
//! let (_handle, signal) = abort_pair();
//!
//! let urls = vec!["https://example.com/site.ply".to_string()];
//! loader
//!     .load_sequence(&urls, 0, &signal, |event| {
//!         if let SequenceEvent::PrimaryReady { blob, .. } = event {
//!             let handle = registry.create(blob);
//!             println!("primary ready at {}", handle.url());
//!         }
//!     })
//!     .await?;
//! ```

mod abort;
pub mod budget;
pub mod camera;
pub mod controller;
mod download;
mod error;
mod handle;
pub mod hotspot;
pub mod input;
mod loader;
pub mod source;

pub use abort::{AbortHandle, AbortSignal, abort_pair};
pub use budget::{GovernorSettings, PerformanceGovernor, QualityNotice};
pub use camera::{FullscreenSurface, LookAtCamera, Pose, TransitionStatus};
pub use controller::{ControllerSettings, ControllerState, FreeFlyController};
pub use download::{DownloadTask, ProgressEvent, TaskState, percent_of};
pub use error::{Error, Result};
pub use handle::{AssetSlot, HandleRegistry, ObjectHandle, RenderAsset};
pub use hotspot::{HotspotCatalog, HotspotPoint};
pub use input::{CameraMoveState, ControlKey, InputState, KeyPhase};
pub use loader::{AssetReadiness, AssetStatus, Loader, SequenceEvent};
pub use source::{Body, ByteSource, HttpSource, MemoryAsset, MemorySource};
