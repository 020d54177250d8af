//! Frame-rate driven quality settings.
//!
//! Samples the smoothed FPS once per [`SAMPLE_SECONDS`], turns it into a
//! performance factor and feeds the governor. The resulting point budget and
//! pixel ratio are published in [`RenderOutput`] together with the handle of
//! the displayed model; that is the contract an external splat renderer
//! consumes. The pixel ratio is also applied to the primary window.

use bevy::diagnostic::{Diagnostic, DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use sitescan::{PerformanceGovernor, RenderAsset};

use crate::launch_params::LaunchParams;
use crate::loading::SiteModels;

/// Frame rate at which the performance factor is 1.
pub const TARGET_FPS: f64 = 60.0;

/// Seconds between governor samples.
pub const SAMPLE_SECONDS: f32 = 1.0;

/// Plugin for the quality governor.
pub struct QualityPlugin;

impl Plugin for QualityPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RenderOutput>()
            .add_systems(Startup, init_governor)
            .add_systems(
                Update,
                (sample_performance, publish_render_output, apply_pixel_ratio)
                    .chain()
                    .run_if(resource_exists::<SiteModels>),
            );
    }
}

/// The governor, shared with the settings UI.
#[derive(Resource, Deref, DerefMut)]
pub struct Governor(pub PerformanceGovernor);

/// What the renderer should draw this frame.
#[derive(Resource, Debug, Default, PartialEq)]
pub struct RenderOutput {
    /// Displayed model with its point budget.
    pub asset: Option<RenderAsset>,
    /// Pixel ratio to render at.
    pub pixel_ratio: f32,
}

/// Map a frame rate to a performance factor in `[0, 1]`.
#[allow(clippy::cast_possible_truncation)]
pub fn performance_factor(fps: f64) -> f32 {
    (fps / TARGET_FPS).clamp(0.0, 1.0) as f32
}

#[allow(clippy::needless_pass_by_value)]
fn init_governor(mut commands: Commands, params: Res<LaunchParams>) {
    commands.insert_resource(Governor(PerformanceGovernor::new(params.governor)));
}

/// Feed the governor with the smoothed frame rate.
#[allow(clippy::needless_pass_by_value)]
fn sample_performance(
    time: Res<Time>,
    diagnostics: Res<DiagnosticsStore>,
    mut governor: ResMut<Governor>,
    mut timer: Local<Option<Timer>>,
) {
    let timer = timer
        .get_or_insert_with(|| Timer::from_seconds(SAMPLE_SECONDS, TimerMode::Repeating));
    if !timer.tick(time.delta()).just_finished() {
        return;
    }

    let Some(fps) = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(Diagnostic::smoothed)
    else {
        return;
    };

    let before = governor.point_budget();
    governor.observe(performance_factor(fps));
    if governor.point_budget() != before {
        tracing::debug!(
            "Point budget {} -> {} at {fps:.0} FPS",
            before,
            governor.point_budget()
        );
    }
}

/// Pair the displayed model with the current budgets.
#[allow(clippy::needless_pass_by_value)]
fn publish_render_output(
    governor: Res<Governor>,
    models: Res<SiteModels>,
    mut output: ResMut<RenderOutput>,
) {
    output.set_if_neq(RenderOutput {
        asset: models
            .current_handle()
            .map(|handle| governor.render_asset(handle.clone())),
        pixel_ratio: governor.pixel_ratio(),
    });
}

/// Scale factor override for a pixel ratio, `None` when it matches the
/// display's own scale factor.
pub fn scale_factor_override(pixel_ratio: f32, base_scale_factor: f32) -> Option<f32> {
    ((pixel_ratio - base_scale_factor).abs() > f32::EPSILON).then_some(pixel_ratio)
}

/// Render the primary window at the governed pixel ratio.
#[allow(clippy::needless_pass_by_value)]
fn apply_pixel_ratio(
    output: Res<RenderOutput>,
    mut window: Single<&mut Window, With<PrimaryWindow>>,
) {
    let wanted = scale_factor_override(output.pixel_ratio, window.resolution.base_scale_factor());
    if window.resolution.scale_factor_override() != wanted {
        tracing::debug!("Pixel ratio override {wanted:?}");
        window.resolution.set_scale_factor_override(wanted);
    }
}

#[cfg(test)]
mod tests {
    use bevy::ecs::system::RunSystemOnce;

    use super::*;

    fn window_override(world: &mut World) -> Option<f32> {
        let mut windows = world.query_filtered::<&Window, With<PrimaryWindow>>();
        windows.single(world).unwrap().resolution.scale_factor_override()
    }

    #[test]
    fn test_pixel_ratio_applied_to_window() {
        let mut world = World::new();
        world.spawn((Window::default(), PrimaryWindow));
        world.insert_resource(RenderOutput {
            asset: None,
            pixel_ratio: 0.5,
        });

        world.run_system_once(apply_pixel_ratio).unwrap();
        assert_eq!(window_override(&mut world), Some(0.5));

        world.resource_mut::<RenderOutput>().pixel_ratio = 1.0;
        world.run_system_once(apply_pixel_ratio).unwrap();
        assert_eq!(window_override(&mut world), None);
    }

    #[test]
    fn test_scale_factor_override() {
        assert_eq!(scale_factor_override(2.0, 1.0), Some(2.0));
        assert_eq!(scale_factor_override(1.0, 1.0), None);
        assert_eq!(scale_factor_override(1.0, 2.0), Some(1.0));
    }

    #[test]
    fn test_performance_factor() {
        assert_eq!(performance_factor(120.0), 1.0);
        assert_eq!(performance_factor(60.0), 1.0);
        assert_eq!(performance_factor(30.0), 0.5);
        assert_eq!(performance_factor(0.0), 0.0);
    }
}
