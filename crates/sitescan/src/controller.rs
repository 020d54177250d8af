//! Free-fly camera controller.
//!
//! Layers keyboard flight, hotspot focus jumps, a home reset and fullscreen
//! control over an external [`LookAtCamera`].
//!
//! ## Lifecycle
//!
//! The only constructor, [`FreeFlyController::mount`], takes a camera that
//! already exists, so nothing can drive a camera before the scene is ready.
//! [`FreeFlyController::unmount`] hands the camera back; once it has been
//! called there is no controller left to issue calls.
//!
//! ## States
//!
//! ```text
//! Uninitialized -> Idle             (mount)
//! Idle          -> Transitioning    (focus_on / reset, camera reports progress)
//! Transitioning -> Idle             (camera reports the transition finished)
//! ```
//!
//! Cameras that cannot report transitions go straight back to `Idle`, and
//! keyboard movement may overlap a running transition either way.

use glam::Vec3;

use crate::{
    camera::{FullscreenSurface, LookAtCamera, Pose, TransitionStatus},
    error::Result,
    hotspot::HotspotPoint,
    input::{ControlKey, InputState, KeyPhase},
};

/// Default distance moved per frame while a movement key is held.
pub const DEFAULT_STEP: f32 = 0.1;

/// Default home pose, looking at the middle of the site from above.
pub const DEFAULT_HOME: Pose = Pose::new(Vec3::new(7.0, 8.0, 2.5), Vec3::new(0.0, -2.0, 3.0));

/// Tunables for the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSettings {
    /// Distance moved per frame per held key.
    pub step: f32,
    /// Pose restored by [`FreeFlyController::reset`].
    pub home: Pose,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            home: DEFAULT_HOME,
        }
    }
}

/// Controller state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No controller is mounted yet.
    Uninitialized,
    /// Accepting input, no transition running.
    Idle,
    /// An animated transition is running.
    Transitioning,
}

/// Free-fly controller over a camera primitive.
#[derive(Debug)]
pub struct FreeFlyController<C: LookAtCamera> {
    camera: C,
    settings: ControllerSettings,
    input: InputState,
    state: ControllerState,
    active_hotspot: Option<String>,
    fullscreen: bool,
}

impl<C: LookAtCamera> FreeFlyController<C> {
    /// Take control of an existing camera.
    pub fn mount(camera: C, settings: ControllerSettings) -> Self {
        tracing::info!("Camera controller mounted (step {})", settings.step);
        Self {
            camera,
            settings,
            input: InputState::new(),
            state: ControllerState::Idle,
            active_hotspot: None,
            fullscreen: false,
        }
    }

    /// Release the camera. No further calls reach it through this controller.
    pub fn unmount(self) -> C {
        tracing::info!("Camera controller unmounted");
        self.camera
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// The settings in use.
    #[must_use]
    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// The controlled camera.
    #[must_use]
    pub fn camera(&self) -> &C {
        &self.camera
    }

    /// The controlled camera, for the renderer to advance animations.
    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }

    /// Keyboard state.
    #[must_use]
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Id of the selected hotspot, if any.
    #[must_use]
    pub fn active_hotspot(&self) -> Option<&str> {
        self.active_hotspot.as_deref()
    }

    /// Whether the viewport is fullscreen, as far as the controller knows.
    #[must_use]
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Fly to `camera_position` looking at `target_position`.
    ///
    /// A new call interrupts any running transition.
    pub fn focus_on(&mut self, camera_position: Vec3, target_position: Vec3) -> Result<()> {
        tracing::debug!("Focusing on {target_position} from {camera_position}");
        self.camera
            .set_look_at(camera_position, target_position, true)?;
        self.begin_transition();
        Ok(())
    }

    /// Select a hotspot, flying to its preset view when it has one.
    pub fn focus_hotspot(&mut self, point: &HotspotPoint) -> Result<()> {
        self.active_hotspot = Some(point.id.clone());
        match point.camera_position {
            Some(camera_position) => self.focus_on(camera_position, point.world_position),
            None => Ok(()),
        }
    }

    /// Deselect the active hotspot without moving the camera.
    pub fn close_hotspot(&mut self) {
        self.active_hotspot = None;
    }

    /// Fly back to the home pose and deselect any hotspot.
    pub fn reset(&mut self) -> Result<()> {
        self.active_hotspot = None;
        let home = self.settings.home;
        self.focus_on(home.eye, home.target)
    }

    /// Handle a key event.
    pub fn handle_key<F: FullscreenSurface>(
        &mut self,
        key: ControlKey,
        phase: KeyPhase,
        surface: &mut F,
    ) -> Result<()> {
        if self.input.apply(key, phase) || phase == KeyPhase::Released {
            return Ok(());
        }

        match key {
            ControlKey::Reset => self.reset(),
            ControlKey::ToggleFullscreen => self.toggle_fullscreen(surface),
            ControlKey::Escape => self.escape(surface),
            _ => Ok(()),
        }
    }

    /// Release all movement keys, e.g. when the window loses focus.
    pub fn blur(&mut self) {
        self.input.blur();
    }

    /// Enter fullscreen, or leave it if already fullscreen.
    pub fn toggle_fullscreen<F: FullscreenSurface>(&mut self, surface: &mut F) -> Result<()> {
        if self.fullscreen {
            surface.exit_fullscreen()?;
            self.fullscreen = false;
        } else {
            surface.request_fullscreen()?;
            self.fullscreen = true;
        }
        Ok(())
    }

    /// Leave fullscreen if active; otherwise do nothing.
    pub fn escape<F: FullscreenSurface>(&mut self, surface: &mut F) -> Result<()> {
        if self.fullscreen {
            surface.exit_fullscreen()?;
            self.fullscreen = false;
        }
        Ok(())
    }

    /// Record a fullscreen change made outside the controller.
    pub fn sync_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    /// Advance one animation frame.
    ///
    /// Applies one fixed step per held movement key, in the order forward,
    /// backward, left, right, up, down. A failing camera call is logged and
    /// the remaining calls of the frame still run. Returns the directions
    /// whose call failed.
    pub fn tick(&mut self) -> Vec<&'static str> {
        if self.state == ControllerState::Transitioning
            && self.camera.transition_status() != TransitionStatus::InProgress
        {
            self.state = ControllerState::Idle;
        }

        let movement = self.input.movement();
        let step = self.settings.step;
        let mut failed = Vec::new();
        let mut apply = |direction: &'static str, result: Result<()>| {
            if let Err(e) = result {
                tracing::warn!("Camera move {direction} failed this frame: {e}");
                failed.push(direction);
            }
        };

        if movement.forward {
            apply("forward", self.camera.forward(step, false));
        }
        if movement.backward {
            apply("backward", self.camera.forward(-step, false));
        }
        if movement.left {
            apply("left", self.camera.truck(-step, 0.0, false));
        }
        if movement.right {
            apply("right", self.camera.truck(step, 0.0, false));
        }
        if movement.up {
            apply("up", self.camera.truck(0.0, step, false));
        }
        if movement.down {
            apply("down", self.camera.truck(0.0, -step, false));
        }
        failed
    }

    fn begin_transition(&mut self) {
        self.state = match self.camera.transition_status() {
            TransitionStatus::InProgress => ControllerState::Transitioning,
            TransitionStatus::Unsupported | TransitionStatus::Finished => ControllerState::Idle,
        };
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::error::Error;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        LookAt(Vec3, Vec3, bool),
        Forward(f32),
        Truck(f32, f32),
    }

    /// Camera that records calls and tracks its pose.
    #[derive(Debug)]
    struct RecordingCamera {
        calls: Rc<RefCell<Vec<Call>>>,
        pose: Pose,
        status: TransitionStatus,
        fail_forward: bool,
    }

    impl RecordingCamera {
        fn new(calls: Rc<RefCell<Vec<Call>>>) -> Self {
            Self {
                calls,
                pose: Pose::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO),
                status: TransitionStatus::Unsupported,
                fail_forward: false,
            }
        }

        fn axes(&self) -> (Vec3, Vec3, Vec3) {
            let dir = (self.pose.target - self.pose.eye).normalize();
            let right = dir.cross(Vec3::Y).normalize();
            let up = right.cross(dir);
            (dir, right, up)
        }

        fn translate(&mut self, delta: Vec3) {
            self.pose.eye += delta;
            self.pose.target += delta;
        }
    }

    impl LookAtCamera for RecordingCamera {
        fn set_look_at(&mut self, eye: Vec3, target: Vec3, animate: bool) -> Result<()> {
            self.calls.borrow_mut().push(Call::LookAt(eye, target, animate));
            self.pose = Pose::new(eye, target);
            Ok(())
        }

        fn forward(&mut self, distance: f32, _animate: bool) -> Result<()> {
            self.calls.borrow_mut().push(Call::Forward(distance));
            if self.fail_forward {
                return Err(Error::Camera {
                    operation: "forward",
                    message: "disposed".to_string(),
                });
            }
            let (dir, _, _) = self.axes();
            self.translate(dir * distance);
            Ok(())
        }

        fn truck(&mut self, dx: f32, dy: f32, _animate: bool) -> Result<()> {
            self.calls.borrow_mut().push(Call::Truck(dx, dy));
            let (_, right, up) = self.axes();
            self.translate(right * dx + up * dy);
            Ok(())
        }

        fn transition_status(&self) -> TransitionStatus {
            self.status
        }
    }

    #[derive(Debug, Default)]
    struct FakeSurface {
        requests: usize,
        exits: usize,
    }

    impl FullscreenSurface for FakeSurface {
        fn request_fullscreen(&mut self) -> Result<()> {
            self.requests += 1;
            Ok(())
        }

        fn exit_fullscreen(&mut self) -> Result<()> {
            self.exits += 1;
            Ok(())
        }
    }

    fn mounted() -> (FreeFlyController<RecordingCamera>, Rc<RefCell<Vec<Call>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let controller = FreeFlyController::mount(
            RecordingCamera::new(Rc::clone(&calls)),
            ControllerSettings::default(),
        );
        (controller, calls)
    }

    fn press(controller: &mut FreeFlyController<RecordingCamera>, key: ControlKey) {
        controller
            .handle_key(key, KeyPhase::Pressed, &mut FakeSurface::default())
            .unwrap();
    }

    #[test]
    fn test_mount_starts_idle() {
        let (controller, calls) = mounted();
        assert_eq!(controller.state(), ControllerState::Idle);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_forward_and_right_for_n_frames() {
        let (mut controller, calls) = mounted();
        let start = controller.camera().pose;
        let (dir, right, _) = controller.camera().axes();

        press(&mut controller, ControlKey::Forward);
        press(&mut controller, ControlKey::Right);

        let frames = 5;
        for _ in 0..frames {
            controller.tick();
        }

        let step = DEFAULT_STEP;
        let expected: Vec<Call> = (0..frames)
            .flat_map(|_| [Call::Forward(step), Call::Truck(step, 0.0)])
            .collect();
        assert_eq!(*calls.borrow(), expected);

        #[allow(clippy::cast_precision_loss)]
        let n = frames as f32;
        let moved = controller.camera().pose.eye - start.eye;
        assert!(moved.abs_diff_eq(dir * step * n + right * step * n, 1e-4));
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let (mut controller, _calls) = mounted();
        let start = controller.camera().pose;

        press(&mut controller, ControlKey::Up);
        press(&mut controller, ControlKey::Down);
        for _ in 0..3 {
            controller.tick();
        }

        assert!(controller.camera().pose.eye.abs_diff_eq(start.eye, 1e-5));
    }

    #[test]
    fn test_release_and_blur_stop_movement() {
        let (mut controller, calls) = mounted();
        press(&mut controller, ControlKey::Forward);
        press(&mut controller, ControlKey::Left);
        controller
            .handle_key(
                ControlKey::Forward,
                KeyPhase::Released,
                &mut FakeSurface::default(),
            )
            .unwrap();
        controller.tick();
        assert_eq!(*calls.borrow(), vec![Call::Truck(-DEFAULT_STEP, 0.0)]);

        controller.blur();
        controller.tick();
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_reset_always_reaches_home() {
        let (mut controller, _calls) = mounted();
        let home = controller.settings().home;

        controller.reset().unwrap();
        assert_eq!(controller.camera().pose, home);

        press(&mut controller, ControlKey::Forward);
        press(&mut controller, ControlKey::Up);
        for _ in 0..10 {
            controller.tick();
        }
        controller
            .focus_on(Vec3::new(50.0, 5.0, 1.0), Vec3::new(3.0, 0.0, 0.0))
            .unwrap();
        controller.reset().unwrap();
        assert_eq!(controller.camera().pose, home);
    }

    #[test]
    fn test_reset_key_clears_active_hotspot() {
        let (mut controller, calls) = mounted();
        let hotspot = HotspotPoint {
            id: "crane".to_string(),
            world_position: Vec3::new(1.0, 2.0, 3.0),
            label: "Crane".to_string(),
            camera_position: Some(Vec3::new(5.0, 5.0, 5.0)),
            description: None,
            video_url: None,
        };

        controller.focus_hotspot(&hotspot).unwrap();
        assert_eq!(controller.active_hotspot(), Some("crane"));
        assert_eq!(
            calls.borrow().last(),
            Some(&Call::LookAt(
                Vec3::new(5.0, 5.0, 5.0),
                Vec3::new(1.0, 2.0, 3.0),
                true
            ))
        );

        press(&mut controller, ControlKey::Reset);
        assert_eq!(controller.active_hotspot(), None);
        assert_eq!(controller.camera().pose, DEFAULT_HOME);
    }

    #[test]
    fn test_hotspot_without_view_does_not_move() {
        let (mut controller, calls) = mounted();
        let hotspot = HotspotPoint {
            id: "gate".to_string(),
            world_position: Vec3::ZERO,
            label: "Gate".to_string(),
            camera_position: None,
            description: None,
            video_url: None,
        };

        controller.focus_hotspot(&hotspot).unwrap();
        assert_eq!(controller.active_hotspot(), Some("gate"));
        assert!(calls.borrow().is_empty());

        controller.close_hotspot();
        assert_eq!(controller.active_hotspot(), None);
    }

    #[test]
    fn test_repeated_focus_issues_two_requests() {
        let (mut controller, calls) = mounted();
        let eye = Vec3::new(3.0, 4.0, 5.0);
        let target = Vec3::new(0.0, 1.0, 0.0);

        controller.focus_on(eye, target).unwrap();
        let first = controller.camera().pose;
        controller.focus_on(eye, target).unwrap();

        assert_eq!(calls.borrow().len(), 2);
        assert_eq!(calls.borrow()[0], calls.borrow()[1]);
        assert_eq!(controller.camera().pose, first);
    }

    #[test]
    fn test_transition_state_follows_camera() {
        let (mut controller, _calls) = mounted();
        controller.camera.status = TransitionStatus::InProgress;

        controller.focus_on(Vec3::ONE, Vec3::ZERO).unwrap();
        assert_eq!(controller.state(), ControllerState::Transitioning);

        controller.tick();
        assert_eq!(controller.state(), ControllerState::Transitioning);

        controller.camera.status = TransitionStatus::Finished;
        controller.tick();
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn test_unsupported_transitions_return_to_idle() {
        let (mut controller, _calls) = mounted();
        controller.focus_on(Vec3::ONE, Vec3::ZERO).unwrap();
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn test_failing_frame_does_not_stop_later_frames() {
        let (mut controller, calls) = mounted();
        controller.camera.fail_forward = true;
        press(&mut controller, ControlKey::Forward);
        press(&mut controller, ControlKey::Right);

        assert_eq!(controller.tick(), vec!["forward"]);
        controller.tick();

        // Both frames issued both calls despite the failures.
        assert_eq!(calls.borrow().len(), 4);
        assert_eq!(calls.borrow()[3], Call::Truck(DEFAULT_STEP, 0.0));
    }

    #[test]
    fn test_failed_moves_named_by_direction() {
        let (mut controller, calls) = mounted();
        controller.camera.fail_forward = true;
        press(&mut controller, ControlKey::Backward);
        press(&mut controller, ControlKey::Up);

        assert_eq!(controller.tick(), vec!["backward"]);
        assert_eq!(calls.borrow()[0], Call::Forward(-DEFAULT_STEP));
        assert_eq!(calls.borrow()[1], Call::Truck(0.0, DEFAULT_STEP));
    }

    #[test]
    fn test_no_calls_after_unmount() {
        let (controller, calls) = mounted();
        let mut slot = Some(controller);
        if let Some(controller) = slot.as_mut() {
            press(controller, ControlKey::Forward);
        }

        // Frame loop driven by the owner.
        let frame = |slot: &mut Option<FreeFlyController<RecordingCamera>>| {
            if let Some(controller) = slot.as_mut() {
                controller.tick();
            }
        };

        frame(&mut slot);
        frame(&mut slot);
        assert_eq!(calls.borrow().len(), 2);

        let camera = slot.take().map(FreeFlyController::unmount);
        assert!(camera.is_some());

        frame(&mut slot);
        frame(&mut slot);
        assert_eq!(calls.borrow().len(), 2);
    }

    #[test]
    fn test_fullscreen_toggle_and_escape() {
        let (mut controller, _calls) = mounted();
        let mut surface = FakeSurface::default();

        // Escape without fullscreen is a no-op.
        controller
            .handle_key(ControlKey::Escape, KeyPhase::Pressed, &mut surface)
            .unwrap();
        assert_eq!(surface.exits, 0);

        controller
            .handle_key(ControlKey::ToggleFullscreen, KeyPhase::Pressed, &mut surface)
            .unwrap();
        assert!(controller.is_fullscreen());
        assert_eq!(surface.requests, 1);

        // Releasing a command key does nothing.
        controller
            .handle_key(ControlKey::ToggleFullscreen, KeyPhase::Released, &mut surface)
            .unwrap();
        assert!(controller.is_fullscreen());

        controller
            .handle_key(ControlKey::Escape, KeyPhase::Pressed, &mut surface)
            .unwrap();
        assert!(!controller.is_fullscreen());
        assert_eq!(surface.exits, 1);

        controller.toggle_fullscreen(&mut surface).unwrap();
        controller.toggle_fullscreen(&mut surface).unwrap();
        assert!(!controller.is_fullscreen());
        assert_eq!(surface.requests, 2);
        assert_eq!(surface.exits, 2);

        controller.sync_fullscreen(true);
        assert!(controller.is_fullscreen());
    }
}
