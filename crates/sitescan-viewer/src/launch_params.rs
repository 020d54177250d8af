//! Launch parameter parsing for the viewer.
//!
//! On native, parameters are parsed from command-line arguments using clap.
//! On WASM, defaults are used (CLI argument parsing is not available).

use bevy::prelude::*;
use sitescan::{ControllerSettings, GovernorSettings, HotspotCatalog};

/// Model loaded when no `--url` is given.
pub const DEFAULT_MODEL_URL: &str = "https://huggingface.co/datasets/Alekso/Equinor_Base_20240604/resolve/main/EQUINOR_20240604.splat";

/// Title shown on the loading screen.
pub const SITE_TITLE: &str = "EQ_LEBA_BASE";

/// Launch parameters for the viewer.
#[derive(Resource, Debug, Clone)]
pub struct LaunchParams {
    /// Model URLs, in picker order.
    pub urls: Vec<String>,
    /// Index of the model loaded first, with progress.
    pub primary: usize,
    /// Hotspots shown in the list and the scene.
    pub hotspots: HotspotCatalog,
    /// Initial quality settings.
    pub governor: GovernorSettings,
    /// Camera controller settings.
    pub controller: ControllerSettings,
    /// glTF asset paths preloaded into the auxiliary model slots.
    pub aux_models: Vec<String>,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self {
            urls: vec![DEFAULT_MODEL_URL.to_string()],
            primary: 0,
            hotspots: HotspotCatalog::demo_site(),
            governor: GovernorSettings::default(),
            controller: ControllerSettings::default(),
            aux_models: Vec::new(),
        }
    }
}

#[cfg(not(target_family = "wasm"))]
mod native {
    use clap::{CommandFactory, Parser, error::ErrorKind};
    use sitescan::budget::DEFAULT_MAX_POINTS;
    use sitescan::controller::DEFAULT_STEP;

    use super::*;
    use crate::aux_models::AUX_MODEL_SLOTS;

    /// Read a hotspot catalog from a JSON file.
    fn parse_hotspots(path: &str) -> Result<HotspotCatalog, String> {
        let json = std::fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))?;
        HotspotCatalog::from_json_str(&json).map_err(|e| format!("{path}: {e}"))
    }

    #[derive(Parser, Debug)]
    #[command(about = "Construction-site scan viewer")]
    pub(super) struct CliArgs {
        /// Model URL. Repeat to offer several models in the picker.
        #[arg(long = "url", default_value = DEFAULT_MODEL_URL)]
        urls: Vec<String>,

        /// Index of the model to load first.
        #[arg(long, default_value_t = 0)]
        primary: usize,

        /// JSON file with hotspots (defaults to the built-in demo site).
        #[arg(long, value_parser = parse_hotspots)]
        hotspots: Option<HotspotCatalog>,

        /// Maximum number of points to draw.
        #[arg(long, default_value_t = DEFAULT_MAX_POINTS)]
        max_points: u32,

        /// Lower the point budget when the frame rate drops.
        #[arg(long)]
        throttle_points: bool,

        /// Lower the pixel ratio when the frame rate drops.
        #[arg(long)]
        throttle_pixel_ratio: bool,

        /// Maximum pixel ratio.
        #[arg(long, default_value_t = 1.0)]
        max_pixel_ratio: f32,

        /// Distance moved per frame per held key.
        #[arg(long, default_value_t = DEFAULT_STEP)]
        step: f32,

        /// glTF asset path for an auxiliary model. Repeat for a second one.
        #[arg(long = "aux-model")]
        aux_models: Vec<String>,
    }

    impl CliArgs {
        pub(super) fn into_params(self) -> Result<LaunchParams, String> {
            if self.primary >= self.urls.len() {
                return Err(format!(
                    "--primary {} is out of range for {} model url(s)",
                    self.primary,
                    self.urls.len()
                ));
            }
            if self.aux_models.len() > AUX_MODEL_SLOTS {
                return Err(format!(
                    "at most {AUX_MODEL_SLOTS} --aux-model paths are supported, got {}",
                    self.aux_models.len()
                ));
            }

            Ok(LaunchParams {
                urls: self.urls,
                primary: self.primary,
                hotspots: self.hotspots.unwrap_or_else(HotspotCatalog::demo_site),
                governor: GovernorSettings {
                    throttle_pixel_ratio: self.throttle_pixel_ratio,
                    max_pixel_ratio: self.max_pixel_ratio,
                    throttle_points: self.throttle_points,
                    max_points: self.max_points,
                },
                controller: ControllerSettings {
                    step: self.step,
                    ..ControllerSettings::default()
                },
                aux_models: self.aux_models,
            })
        }
    }

    pub fn parse() -> LaunchParams {
        match CliArgs::parse().into_params() {
            Ok(params) => params,
            Err(message) => CliArgs::command()
                .error(ErrorKind::InvalidValue, message)
                .exit(),
        }
    }
}

/// Parse launch parameters from CLI args (native) or use defaults (WASM).
pub fn parse() -> LaunchParams {
    #[cfg(not(target_family = "wasm"))]
    {
        native::parse()
    }
    #[cfg(target_family = "wasm")]
    {
        LaunchParams::default()
    }
}
