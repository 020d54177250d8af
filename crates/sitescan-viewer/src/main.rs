//! Construction-site scan viewer using Bevy.
//!
//! Downloads the site models with a progress screen, then hands the camera
//! to a free-fly controller with hotspot jumps, a home reset and fullscreen
//! toggling.

mod async_runtime;
mod aux_models;
mod camera;
mod launch_params;
mod loading;
mod markers;
mod quality;
mod ui;

use async_runtime::AsyncRuntimePlugin;
use aux_models::AuxModelPlugin;
use bevy::prelude::*;
use camera::{CameraControllerPlugin, SiteCamera, ViewerCamera};
use launch_params::LaunchParams;
use loading::LoadingPlugin;
use markers::MarkerPlugin;
use quality::QualityPlugin;
use ui::SiteUiPlugin;

/// Plugin for the main application.
pub struct AppPlugin;

impl Plugin for AppPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            AsyncRuntimePlugin,
            LoadingPlugin,
            CameraControllerPlugin,
            QualityPlugin,
            MarkerPlugin,
            AuxModelPlugin,
            SiteUiPlugin,
        ))
        .add_systems(Startup, setup_scene);
    }
}

/// Set up the camera, light and ground plane.
#[allow(clippy::needless_pass_by_value)]
fn setup_scene(
    mut commands: Commands,
    params: Res<LaunchParams>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    // The camera rests at the home pose until the controller takes over.
    let home = ViewerCamera::new(params.controller.home);
    commands.spawn((
        Camera3d::default(),
        Camera {
            clear_color: bevy::camera::ClearColorConfig::Custom(Color::srgb(0.08, 0.09, 0.11)),
            ..default()
        },
        home.transform(),
        SiteCamera,
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 8_000.0,
            ..default()
        },
        Transform::from_xyz(10.0, 20.0, 10.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(60.0, 60.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.25, 0.27, 0.25))),
        Transform::from_xyz(0.0, -2.0, 0.0),
    ));

    tracing::info!(
        "Scene setup complete - WASD/QE to move, R to reset, F for fullscreen"
    );
}

fn main() {
    // Initialize tracing for native platforms.
    #[cfg(not(target_family = "wasm"))]
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    // Initialize tracing for WASM (logs to browser console).
    #[cfg(target_family = "wasm")]
    {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    }

    let params = launch_params::parse();
    tracing::info!(
        "Launching with {} model(s), primary {}, {} hotspot(s)",
        params.urls.len(),
        params.urls[params.primary],
        params.hotspots.len()
    );

    let mut app = App::new();

    #[allow(unused_mut)]
    let mut window = Window {
        title: "sitescan-viewer".to_string(),
        resolution: (1280, 720).into(),
        ..Default::default()
    };

    // WASM: Fit canvas to parent element and prevent browser event handling.
    #[cfg(target_family = "wasm")]
    {
        window.fit_canvas_to_parent = true;
        window.prevent_default_event_handling = true;
    }

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(window),
        ..Default::default()
    }))
    .insert_resource(params)
    .add_plugins(AppPlugin)
    .run();
}
