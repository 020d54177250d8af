//! Bevy side of the free-fly controller.
//!
//! [`ViewerCamera`] is the look-at primitive the controller drives. It keeps
//! its own eye/target pose and smooths animated moves over
//! [`FLIGHT_SECONDS`]; a system copies the pose onto the camera entity's
//! `Transform` every frame. The controller itself lives in the
//! [`SiteController`] resource, which only exists once the primary model
//! has loaded.

use bevy::app::AppExit;
use bevy::ecs::message::MessageReader;
use bevy::prelude::*;
use bevy::window::{MonitorSelection, PrimaryWindow, WindowFocused, WindowMode};
use sitescan::{
    ControlKey, ControllerState, Error, FreeFlyController, FullscreenSurface, KeyPhase,
    LookAtCamera, Pose, TransitionStatus,
};

/// Duration of an animated camera flight in seconds.
pub const FLIGHT_SECONDS: f32 = 1.2;

/// Keyboard bindings for the controller.
const KEY_BINDINGS: [(KeyCode, ControlKey); 9] = [
    (KeyCode::KeyW, ControlKey::Forward),
    (KeyCode::KeyS, ControlKey::Backward),
    (KeyCode::KeyA, ControlKey::Left),
    (KeyCode::KeyD, ControlKey::Right),
    (KeyCode::KeyE, ControlKey::Up),
    (KeyCode::KeyQ, ControlKey::Down),
    (KeyCode::KeyR, ControlKey::Reset),
    (KeyCode::KeyF, ControlKey::ToggleFullscreen),
    (KeyCode::Escape, ControlKey::Escape),
];

/// Plugin wiring the controller into the frame loop.
pub struct CameraControllerPlugin;

impl Plugin for CameraControllerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                sync_fullscreen,
                release_keys_on_blur,
                keyboard_input,
                tick_controller,
                apply_camera_pose,
            )
                .chain()
                .run_if(resource_exists::<SiteController>),
        )
        .add_systems(Last, unmount_on_exit);
    }
}

/// Marker for the camera entity the controller moves.
#[derive(Component)]
pub struct SiteCamera;

/// The mounted controller.
#[derive(Resource, Deref, DerefMut)]
pub struct SiteController(pub FreeFlyController<ViewerCamera>);

/// State to display for an optional controller.
pub fn controller_state(controller: Option<&SiteController>) -> ControllerState {
    controller.map_or(ControllerState::Uninitialized, |controller| {
        controller.state()
    })
}

// ============================================================================
// Camera primitive
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Flight {
    from: Pose,
    to: Pose,
    elapsed: f32,
}

/// Look-at camera with smoothed flights.
#[derive(Debug, Clone)]
pub struct ViewerCamera {
    pose: Pose,
    flight: Option<Flight>,
}

impl ViewerCamera {
    /// Create a camera resting at `pose`.
    pub fn new(pose: Pose) -> Self {
        Self { pose, flight: None }
    }

    /// Current pose, including any flight progress.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Advance the running flight by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        let Some(flight) = &mut self.flight else {
            return;
        };

        flight.elapsed += dt;
        let t = (flight.elapsed / FLIGHT_SECONDS).clamp(0.0, 1.0);
        let s = t * t * (3.0 - 2.0 * t);
        self.pose = Pose::new(
            flight.from.eye.lerp(flight.to.eye, s),
            flight.from.target.lerp(flight.to.target, s),
        );

        if t >= 1.0 {
            self.flight = None;
        }
    }

    /// Transform for the camera entity.
    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.pose.eye).looking_at(self.pose.target, Vec3::Y)
    }

    fn view_direction(&self, operation: &'static str) -> sitescan::Result<Vec3> {
        (self.pose.target - self.pose.eye)
            .try_normalize()
            .ok_or_else(|| Error::Camera {
                operation,
                message: "eye and target coincide".to_string(),
            })
    }

    /// Move the pose, and any running flight, by `offset`.
    fn shift(&mut self, offset: Vec3) {
        self.pose.eye += offset;
        self.pose.target += offset;
        if let Some(flight) = &mut self.flight {
            for pose in [&mut flight.from, &mut flight.to] {
                pose.eye += offset;
                pose.target += offset;
            }
        }
    }
}

impl LookAtCamera for ViewerCamera {
    fn set_look_at(&mut self, eye: Vec3, target: Vec3, animate: bool) -> sitescan::Result<()> {
        if !eye.is_finite() || !target.is_finite() || eye.distance_squared(target) < 1e-8 {
            return Err(Error::Camera {
                operation: "set_look_at",
                message: format!("invalid pose {eye} -> {target}"),
            });
        }

        let to = Pose::new(eye, target);
        if animate {
            self.flight = Some(Flight {
                from: self.pose,
                to,
                elapsed: 0.0,
            });
        } else {
            self.pose = to;
            self.flight = None;
        }
        Ok(())
    }

    fn forward(&mut self, distance: f32, _animate: bool) -> sitescan::Result<()> {
        let direction = self.view_direction("forward")?;
        self.shift(direction * distance);
        Ok(())
    }

    fn truck(&mut self, dx: f32, dy: f32, _animate: bool) -> sitescan::Result<()> {
        let direction = self.view_direction("truck")?;
        let right = direction.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X);
        let up = right.cross(direction);
        self.shift(right * dx + up * dy);
        Ok(())
    }

    fn transition_status(&self) -> TransitionStatus {
        if self.flight.is_some() {
            TransitionStatus::InProgress
        } else {
            TransitionStatus::Finished
        }
    }
}

/// Fullscreen control over the primary window.
pub struct WindowSurface<'a>(pub &'a mut Window);

impl FullscreenSurface for WindowSurface<'_> {
    fn request_fullscreen(&mut self) -> sitescan::Result<()> {
        self.0.mode = WindowMode::BorderlessFullscreen(MonitorSelection::Current);
        Ok(())
    }

    fn exit_fullscreen(&mut self) -> sitescan::Result<()> {
        self.0.mode = WindowMode::Windowed;
        Ok(())
    }
}

// ============================================================================
// Systems
// ============================================================================

/// Pick up fullscreen changes made by the OS or window manager.
fn sync_fullscreen(
    mut controller: ResMut<SiteController>,
    window: Single<&Window, With<PrimaryWindow>>,
) {
    let fullscreen = window.mode != WindowMode::Windowed;
    if controller.is_fullscreen() != fullscreen {
        controller.sync_fullscreen(fullscreen);
    }
}

/// Release every movement key when the window loses focus.
fn release_keys_on_blur(
    mut focus_events: MessageReader<WindowFocused>,
    mut controller: ResMut<SiteController>,
) {
    let lost_focus = focus_events
        .read()
        .fold(false, |lost, event| lost || !event.focused);
    if lost_focus {
        tracing::debug!("Window lost focus, releasing keys");
        controller.blur();
    }
}

/// Feed key presses and releases to the controller.
fn keyboard_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut controller: ResMut<SiteController>,
    mut window: Single<&mut Window, With<PrimaryWindow>>,
) {
    for (code, key) in KEY_BINDINGS {
        let phase = if keyboard.just_pressed(code) {
            KeyPhase::Pressed
        } else if keyboard.just_released(code) {
            KeyPhase::Released
        } else {
            continue;
        };

        let mut surface = WindowSurface(&mut **window);
        if let Err(e) = controller.handle_key(key, phase, &mut surface) {
            tracing::warn!("Key {key:?} failed: {e}");
        }
    }
}

/// Apply held keys and advance flights.
fn tick_controller(time: Res<Time>, mut controller: ResMut<SiteController>) {
    controller.tick();
    controller.camera_mut().advance(time.delta_secs());
}

/// Copy the controller's pose onto the camera entity.
#[allow(clippy::needless_pass_by_value)]
fn apply_camera_pose(
    controller: Res<SiteController>,
    mut camera: Single<&mut Transform, With<SiteCamera>>,
) {
    **camera = controller.camera().transform();
}

/// Tear the controller down when the app exits.
fn unmount_on_exit(mut exit_events: MessageReader<AppExit>, mut commands: Commands) {
    if exit_events.is_empty() {
        return;
    }
    exit_events.clear();

    commands.queue(|world: &mut World| {
        if let Some(controller) = world.remove_resource::<SiteController>() {
            let camera = controller.0.unmount();
            tracing::debug!("Final camera pose: {:?}", camera.pose());
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home() -> Pose {
        Pose::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO)
    }

    #[test]
    fn test_forward_moves_eye_and_target() {
        let mut camera = ViewerCamera::new(home());
        camera.forward(2.0, false).unwrap();
        assert!(camera.pose().eye.abs_diff_eq(Vec3::new(0.0, 0.0, 8.0), 1e-5));
        assert!(camera.pose().target.abs_diff_eq(Vec3::new(0.0, 0.0, -2.0), 1e-5));
    }

    #[test]
    fn test_truck_right_and_up() {
        let mut camera = ViewerCamera::new(home());
        // Looking down -Z, right is +X and up is +Y.
        camera.truck(1.0, 0.0, false).unwrap();
        assert!(camera.pose().eye.abs_diff_eq(Vec3::new(1.0, 0.0, 10.0), 1e-5));
        camera.truck(0.0, 1.0, false).unwrap();
        assert!(camera.pose().eye.abs_diff_eq(Vec3::new(1.0, 1.0, 10.0), 1e-5));
    }

    #[test]
    fn test_animated_flight_finishes() {
        let mut camera = ViewerCamera::new(home());
        let eye = Vec3::new(5.0, 5.0, 5.0);
        camera.set_look_at(eye, Vec3::ZERO, true).unwrap();
        assert_eq!(camera.transition_status(), TransitionStatus::InProgress);
        assert_eq!(camera.pose(), home());

        camera.advance(FLIGHT_SECONDS / 2.0);
        assert_eq!(camera.transition_status(), TransitionStatus::InProgress);
        let halfway = camera.pose().eye;
        assert!(halfway.abs_diff_eq(home().eye.lerp(eye, 0.5), 1e-4));

        camera.advance(FLIGHT_SECONDS);
        assert_eq!(camera.transition_status(), TransitionStatus::Finished);
        assert_eq!(camera.pose().eye, eye);
    }

    #[test]
    fn test_immediate_move() {
        let mut camera = ViewerCamera::new(home());
        let pose = Pose::new(Vec3::ONE, Vec3::ZERO);
        camera.set_look_at(pose.eye, pose.target, false).unwrap();
        assert_eq!(camera.pose(), pose);
        assert_eq!(camera.transition_status(), TransitionStatus::Finished);
    }

    #[test]
    fn test_degenerate_pose_rejected() {
        let mut camera = ViewerCamera::new(home());
        assert!(camera.set_look_at(Vec3::ONE, Vec3::ONE, true).is_err());
        assert!(camera.set_look_at(Vec3::NAN, Vec3::ZERO, false).is_err());
        assert_eq!(camera.pose(), home());
    }

    #[test]
    fn test_movement_during_flight_shifts_destination() {
        let mut camera = ViewerCamera::new(home());
        camera
            .set_look_at(Vec3::new(0.0, 0.0, 20.0), Vec3::ZERO, true)
            .unwrap();
        camera.truck(1.0, 0.0, false).unwrap();
        camera.advance(FLIGHT_SECONDS);
        assert!(camera.pose().eye.abs_diff_eq(Vec3::new(1.0, 0.0, 20.0), 1e-5));
    }

    #[test]
    fn test_controller_drives_viewer_camera() {
        let mut controller = FreeFlyController::mount(
            ViewerCamera::new(home()),
            sitescan::ControllerSettings::default(),
        );
        controller
            .focus_on(Vec3::new(3.0, 3.0, 3.0), Vec3::ZERO)
            .unwrap();
        assert_eq!(controller.state(), ControllerState::Transitioning);

        controller.camera_mut().advance(FLIGHT_SECONDS);
        controller.tick();
        assert_eq!(controller.state(), ControllerState::Idle);
    }
}
