//! Overlay UI: loading screen, hotspot list, hotspot info, model picker,
//! auxiliary models and quality stats.

use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::{EguiContexts, EguiPlugin, EguiPrimaryContextPass, egui};
use sitescan::{AssetStatus, GovernorSettings};

use crate::aux_models::AuxModels;
use crate::camera::{SiteController, WindowSurface, controller_state};
use crate::launch_params::{LaunchParams, SITE_TITLE};
use crate::loading::{LoadProgress, SiteModels};
use crate::quality::{Governor, RenderOutput};

/// Plugin for the egui overlay.
pub struct SiteUiPlugin;

impl Plugin for SiteUiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin::default())
            .add_plugins(FrameTimeDiagnosticsPlugin::default())
            .add_systems(
                EguiPrimaryContextPass,
                (
                    loading_screen_system,
                    hotspot_panel_system,
                    hotspot_info_system,
                    aux_models_system,
                    stats_system,
                )
                    .chain()
                    .run_if(resource_exists::<LoadProgress>),
            );
    }
}

/// Full-screen progress display until the primary model is ready.
#[allow(clippy::needless_pass_by_value, clippy::cast_possible_truncation)]
fn loading_screen_system(mut contexts: EguiContexts, progress: Res<LoadProgress>) -> Result {
    if progress.primary_ready {
        return Ok(());
    }

    let ctx = contexts.ctx_mut()?;
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() / 3.0);
            ui.heading(SITE_TITLE);
            ui.add_space(12.0);

            if let Some(error) = &progress.error {
                ui.colored_label(egui::Color32::LIGHT_RED, format!("Loading failed: {error}"));
                return;
            }

            match progress.percent {
                Some(percent) => {
                    ui.add(egui::ProgressBar::new((percent / 100.0) as f32).desired_width(320.0));
                    ui.label(format!("Loading model: {percent:.2}%"));
                }
                None => {
                    ui.spinner();
                    ui.label("Loading model...");
                }
            }
        });
    });

    Ok(())
}

/// Hotspot list, camera controls and model picker.
#[allow(clippy::needless_pass_by_value)]
fn hotspot_panel_system(
    mut contexts: EguiContexts,
    params: Res<LaunchParams>,
    controller: Option<ResMut<SiteController>>,
    mut models: ResMut<SiteModels>,
    mut window: Single<&mut Window, With<PrimaryWindow>>,
) -> Result {
    let Some(mut controller) = controller else {
        return Ok(());
    };

    let ctx = contexts.ctx_mut()?;
    egui::SidePanel::left("hotspots")
        .resizable(false)
        .default_width(220.0)
        .show(ctx, |ui| {
            ui.heading("Hotspots");
            for point in params.hotspots.points() {
                let active = controller.active_hotspot() == Some(point.id.as_str());
                if ui.selectable_label(active, point.label.as_str()).clicked() {
                    if let Err(e) = controller.focus_hotspot(point) {
                        tracing::warn!("Failed to focus hotspot {}: {e}", point.id);
                    }
                }
            }

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Reset view").clicked() {
                    if let Err(e) = controller.reset() {
                        tracing::warn!("Failed to reset camera: {e}");
                    }
                }

                let label = if controller.is_fullscreen() {
                    "Exit fullscreen"
                } else {
                    "Fullscreen"
                };
                if ui.button(label).clicked() {
                    let mut surface = WindowSurface(&mut **window);
                    if let Err(e) = controller.toggle_fullscreen(&mut surface) {
                        tracing::warn!("Failed to toggle fullscreen: {e}");
                    }
                }
            });

            if models.urls().len() > 1 {
                ui.separator();
                model_picker(ui, &mut models);
            }

            ui.separator();
            ui.label("Controls:");
            ui.label("  WASD - Move");
            ui.label("  Q/E - Down/up");
            ui.label("  R - Reset view");
            ui.label("  F - Fullscreen");
        });

    Ok(())
}

/// Combo box of models; only ready models can be selected.
fn model_picker(ui: &mut egui::Ui, models: &mut SiteModels) {
    let name = |url: &str| url.rsplit('/').next().unwrap_or(url).to_string();
    let selected = models
        .displayed()
        .map_or_else(String::new, |index| name(&models.urls()[index]));

    let mut choice = None;
    egui::ComboBox::from_label("Model")
        .selected_text(selected)
        .show_ui(ui, |ui| {
            for (index, url) in models.urls().iter().enumerate() {
                let status = models.status(index);
                let text = match status {
                    AssetStatus::Ready => name(url),
                    AssetStatus::Pending => format!("{} (loading)", name(url)),
                    AssetStatus::Failed => format!("{} (failed)", name(url)),
                };
                let enabled = status == AssetStatus::Ready;
                let current = models.displayed() == Some(index);
                if ui
                    .add_enabled(enabled, egui::Button::selectable(current, text))
                    .clicked()
                {
                    choice = Some(index);
                }
            }
        });

    if let Some(index) = choice
        && models.displayed() != Some(index)
    {
        models.show(index);
    }
}

/// Info window for the selected hotspot.
#[allow(clippy::needless_pass_by_value)]
fn hotspot_info_system(
    mut contexts: EguiContexts,
    params: Res<LaunchParams>,
    controller: Option<ResMut<SiteController>>,
) -> Result {
    let Some(mut controller) = controller else {
        return Ok(());
    };
    let Some(point) = controller
        .active_hotspot()
        .and_then(|id| params.hotspots.get(id))
    else {
        return Ok(());
    };

    let ctx = contexts.ctx_mut()?;
    let mut close = false;
    egui::Window::new(point.label.as_str())
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::RIGHT_TOP, [-10.0, 10.0])
        .show(ctx, |ui| {
            if let Some(description) = &point.description {
                ui.label(description.as_str());
            }
            if let Some(video_url) = &point.video_url {
                ui.hyperlink_to("Watch video", video_url);
            }
            let p = point.world_position;
            ui.small(format!("Position: ({:.1}, {:.1}, {:.1})", p.x, p.y, p.z));
            if ui.button("Close").clicked() {
                close = true;
            }
        });

    if close {
        controller.close_hotspot();
    }

    Ok(())
}

/// Panel for loading, toggling and placing auxiliary models.
#[allow(clippy::needless_pass_by_value)]
fn aux_models_system(
    mut contexts: EguiContexts,
    progress: Res<LoadProgress>,
    models: Option<ResMut<AuxModels>>,
) -> Result {
    let Some(mut models) = models else {
        return Ok(());
    };
    if !progress.primary_ready {
        return Ok(());
    }

    let ctx = contexts.ctx_mut()?;
    let mut edited = models.clone();
    egui::Window::new("Auxiliary models")
        .default_open(false)
        .anchor(egui::Align2::LEFT_BOTTOM, [240.0, -10.0])
        .show(ctx, |ui| {
            for (index, model) in edited.slots_mut().iter_mut().enumerate() {
                ui.push_id(index, |ui| {
                    ui.strong(format!("Model {}", index + 1));
                    ui.horizontal(|ui| {
                        ui.add(egui::TextEdit::singleline(&mut model.path).hint_text("model.glb"));
                        if ui.button("Load").clicked() {
                            model.request_load();
                        }
                        let label = if model.visible { "Hide" } else { "Show" };
                        if ui
                            .add_enabled(model.is_loaded(), egui::Button::new(label))
                            .clicked()
                        {
                            model.visible = !model.visible;
                        }
                    });
                    ui.horizontal(|ui| {
                        ui.label("XYZ:");
                        for value in model.position.as_mut() {
                            ui.add(egui::DragValue::new(value).speed(0.1));
                        }
                    });
                    ui.horizontal(|ui| {
                        ui.label("Rot:");
                        for value in model.rotation_degrees.as_mut() {
                            ui.add(
                                egui::DragValue::new(value)
                                    .speed(1.0)
                                    .range(-180.0..=180.0)
                                    .suffix("°"),
                            );
                        }
                    });
                });
                ui.separator();
            }
        });

    if edited != *models {
        *models = edited;
    }

    Ok(())
}

/// Quality stats and settings.
#[allow(clippy::needless_pass_by_value)]
fn stats_system(
    mut contexts: EguiContexts,
    controller: Option<Res<SiteController>>,
    governor: Option<ResMut<Governor>>,
    output: Res<RenderOutput>,
) -> Result {
    let Some(mut governor) = governor else {
        return Ok(());
    };

    let ctx = contexts.ctx_mut()?;
    let mut settings = *governor.settings();

    egui::Window::new("Stats")
        .default_open(false)
        .anchor(egui::Align2::RIGHT_BOTTOM, [-10.0, -10.0])
        .show(ctx, |ui| {
            ui.label(format!("Performance factor: {:.2}", governor.factor()));
            ui.label(format!("Applied pixel ratio: {:.2}", output.pixel_ratio));
            ui.label(format!(
                "Point budget: {:.2} M",
                f64::from(governor.point_budget()) / 1_000_000.0
            ));
            ui.label(format!(
                "Camera: {:?}",
                controller_state(controller.as_deref())
            ));
            if let Some(asset) = &output.asset {
                ui.small(asset.handle.url());
            }
            if let Some(notice) = governor.notice() {
                ui.colored_label(egui::Color32::YELLOW, notice.message());
            }

            ui.separator();
            settings_controls(ui, &mut settings);
        });

    if settings != *governor.settings() {
        tracing::info!("Quality settings changed: {settings:?}");
        governor.set_settings(settings);
    }

    Ok(())
}

fn settings_controls(ui: &mut egui::Ui, settings: &mut GovernorSettings) {
    ui.checkbox(
        &mut settings.throttle_pixel_ratio,
        "Degrade pixel ratio based on perf.",
    );
    ui.add(egui::Slider::new(&mut settings.max_pixel_ratio, 0.5..=3.0).text("Max pixel ratio"));
    ui.checkbox(
        &mut settings.throttle_points,
        "Degrade point count based on perf.",
    );
    ui.add(
        egui::Slider::new(&mut settings.max_points, 100_000..=20_000_000)
            .logarithmic(true)
            .text("Max point count"),
    );
}
