//! Auxiliary glTF models placed next to the scan.
//!
//! Up to [`AUX_MODEL_SLOTS`] models are loaded through the asset server.
//! Each one can be shown, hidden and positioned from the overlay panel.

use bevy::gltf::GltfAssetLabel;
use bevy::prelude::*;
use bevy::scene::SceneRoot;

use crate::launch_params::LaunchParams;

/// Number of auxiliary model slots.
pub const AUX_MODEL_SLOTS: usize = 2;

/// Plugin for auxiliary models.
pub struct AuxModelPlugin;

impl Plugin for AuxModelPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, init_aux_models).add_systems(
            Update,
            sync_aux_models.run_if(resource_exists::<AuxModels>),
        );
    }
}

/// One auxiliary model slot.
#[derive(Debug, Clone, PartialEq)]
pub struct AuxModel {
    /// Asset path of the glTF file.
    pub path: String,
    /// Whether the model is drawn.
    pub visible: bool,
    /// Translation in world units.
    pub position: Vec3,
    /// XYZ Euler rotation in degrees.
    pub rotation_degrees: Vec3,
    load_requested: bool,
    entity: Option<Entity>,
}

impl AuxModel {
    /// Create a slot; a non-empty `path` is loaded on the next update.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            load_requested: !path.trim().is_empty(),
            path,
            visible: true,
            position: Vec3::ZERO,
            rotation_degrees: Vec3::ZERO,
            entity: None,
        }
    }

    /// Load `path`, replacing the current model.
    pub fn request_load(&mut self) {
        self.load_requested = !self.path.trim().is_empty();
    }

    /// Whether a model has been spawned for this slot.
    pub fn is_loaded(&self) -> bool {
        self.entity.is_some()
    }

    /// Transform of the model root.
    pub fn transform(&self) -> Transform {
        let r = self.rotation_degrees;
        Transform::from_translation(self.position).with_rotation(Quat::from_euler(
            EulerRot::XYZ,
            r.x.to_radians(),
            r.y.to_radians(),
            r.z.to_radians(),
        ))
    }

    /// Visibility of the model root.
    pub fn visibility(&self) -> Visibility {
        if self.visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        }
    }

    fn take_load_request(&mut self) -> Option<String> {
        if !std::mem::take(&mut self.load_requested) {
            return None;
        }
        let path = self.path.trim();
        (!path.is_empty()).then(|| path.to_string())
    }
}

/// All auxiliary model slots.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct AuxModels {
    slots: Vec<AuxModel>,
}

impl AuxModels {
    /// Create the slots, preloading the given paths in order.
    pub fn new(paths: &[String]) -> Self {
        Self {
            slots: (0..AUX_MODEL_SLOTS)
                .map(|index| AuxModel::new(paths.get(index).cloned().unwrap_or_default()))
                .collect(),
        }
    }

    /// The slots in panel order.
    pub fn slots(&self) -> &[AuxModel] {
        &self.slots
    }

    /// Mutable access to the slots.
    pub fn slots_mut(&mut self) -> &mut [AuxModel] {
        &mut self.slots
    }
}

/// Root entity of an auxiliary model.
#[derive(Component)]
pub struct AuxModelRoot {
    /// Slot index.
    pub slot: usize,
}

#[allow(clippy::needless_pass_by_value)]
fn init_aux_models(mut commands: Commands, params: Res<LaunchParams>) {
    commands.insert_resource(AuxModels::new(&params.aux_models));
}

/// Spawn requested models and apply panel edits to spawned ones.
#[allow(clippy::needless_pass_by_value)]
fn sync_aux_models(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut models: ResMut<AuxModels>,
    mut roots: Query<(&mut Transform, &mut Visibility), With<AuxModelRoot>>,
) {
    if !models.is_changed() {
        return;
    }

    // Writes below must not mark the resource changed again.
    let models = models.bypass_change_detection();
    for (slot, model) in models.slots.iter_mut().enumerate() {
        if let Some(path) = model.take_load_request() {
            if let Some(entity) = model.entity.take() {
                commands.entity(entity).despawn();
            }
            tracing::info!("Loading auxiliary model {} from {path}", slot + 1);
            let entity = commands
                .spawn((
                    SceneRoot(asset_server.load(GltfAssetLabel::Scene(0).from_asset(path))),
                    model.transform(),
                    model.visibility(),
                    AuxModelRoot { slot },
                ))
                .id();
            model.entity = Some(entity);
        } else if let Some(entity) = model.entity
            && let Ok((mut transform, mut visibility)) = roots.get_mut(entity)
        {
            transform.set_if_neq(model.transform());
            visibility.set_if_neq(model.visibility());
        }
    }
}
