//! Hotspot markers in the 3D scene.
//!
//! Clicking a marker selects its hotspot, the same as picking it from the
//! hotspot list.

use bevy::picking::mesh_picking::MeshPickingPlugin;
use bevy::picking::prelude::{Click, Pointer};
use bevy::prelude::*;
use sitescan::HotspotCatalog;

use crate::camera::SiteController;
use crate::launch_params::LaunchParams;

/// Marker sphere radius in world units.
const MARKER_RADIUS: f32 = 0.25;

/// Plugin spawning one marker per hotspot.
pub struct MarkerPlugin;

impl Plugin for MarkerPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(MeshPickingPlugin)
            .add_observer(focus_clicked_marker)
            .add_systems(Startup, spawn_markers)
            .add_systems(Update, highlight_active_marker);
    }
}

/// A hotspot marker entity.
#[derive(Component)]
pub struct HotspotMarker {
    /// Id of the hotspot this marker shows.
    pub id: String,
}

#[derive(Resource)]
struct MarkerMaterials {
    idle: Handle<StandardMaterial>,
    active: Handle<StandardMaterial>,
}

#[allow(clippy::needless_pass_by_value)]
fn spawn_markers(
    mut commands: Commands,
    params: Res<LaunchParams>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let mesh = meshes.add(Sphere::new(MARKER_RADIUS));
    let idle = materials.add(StandardMaterial {
        base_color: Color::srgb(1.0, 0.55, 0.0),
        unlit: true,
        ..default()
    });
    let active = materials.add(StandardMaterial {
        base_color: Color::srgb(0.2, 0.8, 1.0),
        unlit: true,
        ..default()
    });

    for point in params.hotspots.points() {
        commands.spawn((
            Mesh3d(mesh.clone()),
            MeshMaterial3d(idle.clone()),
            Transform::from_translation(point.world_position),
            HotspotMarker {
                id: point.id.clone(),
            },
        ));
    }

    tracing::info!("Spawned {} hotspot markers", params.hotspots.len());
    commands.insert_resource(MarkerMaterials { idle, active });
}

/// Select the hotspot of a clicked marker.
#[allow(clippy::needless_pass_by_value)]
fn focus_clicked_marker(
    click: On<Pointer<Click>>,
    markers: Query<&HotspotMarker>,
    params: Res<LaunchParams>,
    controller: Option<ResMut<SiteController>>,
) {
    // Markers stay inert until the controller is mounted.
    let Some(mut controller) = controller else {
        return;
    };
    let Ok(marker) = markers.get(click.event().event_target()) else {
        return;
    };
    focus_marker(&mut controller, &params.hotspots, &marker.id);
}

/// Focus the hotspot `id`. Returns whether a hotspot was selected.
fn focus_marker(controller: &mut SiteController, catalog: &HotspotCatalog, id: &str) -> bool {
    let Some(point) = catalog.get(id) else {
        tracing::warn!("Clicked marker for unknown hotspot {id}");
        return false;
    };
    if let Err(e) = controller.focus_hotspot(point) {
        tracing::warn!("Failed to focus hotspot {id}: {e}");
    }
    true
}

/// Tint the marker of the selected hotspot.
#[allow(clippy::needless_pass_by_value)]
fn highlight_active_marker(
    controller: Option<Res<SiteController>>,
    materials: Option<Res<MarkerMaterials>>,
    mut markers: Query<(&HotspotMarker, &mut MeshMaterial3d<StandardMaterial>)>,
) {
    let (Some(controller), Some(materials)) = (controller, materials) else {
        return;
    };
    if !controller.is_changed() {
        return;
    }

    let active = controller.active_hotspot();
    for (marker, mut material) in &mut markers {
        let wanted = if active == Some(marker.id.as_str()) {
            &materials.active
        } else {
            &materials.idle
        };
        if material.0 != *wanted {
            material.0 = wanted.clone();
        }
    }
}
