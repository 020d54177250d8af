//! Keyboard state for the free-fly controller.
//!
//! Key events are translated into [`ControlKey`]s by the platform layer.
//! Movement keys toggle flags in [`CameraMoveState`]; the rest are one-shot
//! commands the controller acts on.

/// A key the controller understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKey {
    /// Move along the view direction.
    Forward,
    /// Move against the view direction.
    Backward,
    /// Strafe left.
    Left,
    /// Strafe right.
    Right,
    /// Move up.
    Up,
    /// Move down.
    Down,
    /// Return to the home pose.
    Reset,
    /// Enter or leave fullscreen.
    ToggleFullscreen,
    /// Leave fullscreen if active.
    Escape,
}

impl ControlKey {
    /// All keys, movement first.
    pub const ALL: [ControlKey; 9] = [
        ControlKey::Forward,
        ControlKey::Backward,
        ControlKey::Left,
        ControlKey::Right,
        ControlKey::Up,
        ControlKey::Down,
        ControlKey::Reset,
        ControlKey::ToggleFullscreen,
        ControlKey::Escape,
    ];

    /// Whether this key is held for continuous movement.
    #[must_use]
    pub fn is_movement(self) -> bool {
        matches!(
            self,
            ControlKey::Forward
                | ControlKey::Backward
                | ControlKey::Left
                | ControlKey::Right
                | ControlKey::Up
                | ControlKey::Down
        )
    }
}

/// Key press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
    /// Key went down (repeats are allowed).
    Pressed,
    /// Key went up.
    Released,
}

/// Which movement keys are currently held.
///
/// Opposite directions may be held together; they cancel out per frame.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraMoveState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl CameraMoveState {
    /// Whether any movement key is held.
    #[must_use]
    pub fn any(&self) -> bool {
        self.forward || self.backward || self.left || self.right || self.up || self.down
    }

    fn flag_mut(&mut self, key: ControlKey) -> Option<&mut bool> {
        match key {
            ControlKey::Forward => Some(&mut self.forward),
            ControlKey::Backward => Some(&mut self.backward),
            ControlKey::Left => Some(&mut self.left),
            ControlKey::Right => Some(&mut self.right),
            ControlKey::Up => Some(&mut self.up),
            ControlKey::Down => Some(&mut self.down),
            ControlKey::Reset | ControlKey::ToggleFullscreen | ControlKey::Escape => None,
        }
    }
}

/// Keyboard state owned by one controller.
///
/// Only key handlers write it and only the frame tick reads it.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    movement: CameraMoveState,
}

impl InputState {
    /// Create an input state with no keys held.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a key event. Returns true if the key is a movement key.
    pub fn apply(&mut self, key: ControlKey, phase: KeyPhase) -> bool {
        let Some(flag) = self.movement.flag_mut(key) else {
            return false;
        };
        *flag = phase == KeyPhase::Pressed;
        true
    }

    /// Release every key, e.g. when the window loses focus.
    pub fn blur(&mut self) {
        self.movement = CameraMoveState::default();
    }

    /// Current movement flags.
    #[must_use]
    pub fn movement(&self) -> CameraMoveState {
        self.movement
    }
}
