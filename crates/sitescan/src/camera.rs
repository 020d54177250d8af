//! Capabilities the controller drives but does not implement.
//!
//! The renderer owns the actual camera and the fullscreen surface; the
//! controller only sees them through these traits.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// An eye/target pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Camera position.
    pub eye: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
}

impl Pose {
    /// Create a pose.
    #[must_use]
    pub const fn new(eye: Vec3, target: Vec3) -> Self {
        Self { eye, target }
    }
}

/// Whether an animated transition is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStatus {
    /// The camera cannot report transition completion.
    Unsupported,
    /// A transition is in progress.
    InProgress,
    /// No transition is running.
    Finished,
}

/// A look-at camera primitive.
///
/// `forward` moves along the view direction. `truck` moves sideways (`dx`,
/// positive to the right) and vertically (`dy`, positive up) without
/// changing the view direction.
pub trait LookAtCamera {
    /// Move to `eye` looking at `target`, optionally animated.
    fn set_look_at(&mut self, eye: Vec3, target: Vec3, animate: bool) -> Result<()>;

    /// Move along the view direction.
    fn forward(&mut self, distance: f32, animate: bool) -> Result<()>;

    /// Move across the view plane.
    fn truck(&mut self, dx: f32, dy: f32, animate: bool) -> Result<()>;

    /// Report whether an animated transition is still running.
    fn transition_status(&self) -> TransitionStatus {
        TransitionStatus::Unsupported
    }
}

/// Platform fullscreen control for the root viewport.
pub trait FullscreenSurface {
    /// Enter fullscreen.
    fn request_fullscreen(&mut self) -> Result<()>;

    /// Leave fullscreen.
    fn exit_fullscreen(&mut self) -> Result<()>;
}
