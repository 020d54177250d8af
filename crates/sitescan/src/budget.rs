//! Quality governor: turns a performance factor into render budgets.
//!
//! A performance monitor (owned by the renderer) reports a factor in
//! `[0, 1]`, where 1 means the target frame rate is met. When throttling is
//! enabled the governor lowers the pixel ratio and the point budget as the
//! factor drops; otherwise it only reports that the frame rate suffers.

use crate::handle::{ObjectHandle, RenderAsset};

/// Default cap on drawn points.
pub const DEFAULT_MAX_POINTS: u32 = 10_000_000;

/// User-facing quality options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GovernorSettings {
    /// Lower the pixel ratio when performance drops.
    pub throttle_pixel_ratio: bool,
    /// Upper bound on the pixel ratio.
    pub max_pixel_ratio: f32,
    /// Lower the point budget when performance drops.
    pub throttle_points: bool,
    /// Upper bound on the point budget.
    pub max_points: u32,
}

impl Default for GovernorSettings {
    fn default() -> Self {
        Self {
            throttle_pixel_ratio: false,
            max_pixel_ratio: 1.0,
            throttle_points: false,
            max_points: DEFAULT_MAX_POINTS,
        }
    }
}

/// Message shown to the user about the current quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityNotice {
    /// Throttling is lowering quality to save frame rate.
    QualityReduced,
    /// Frame rate is poor and throttling is off.
    FpsDegraded,
}

impl QualityNotice {
    /// Text for the stats panel.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            QualityNotice::QualityReduced => {
                "Quality degraded to save FPS! You can disable this in settings."
            }
            QualityNotice::FpsDegraded => {
                "FPS degraded! You can enable quality tuning in settings."
            }
        }
    }
}

/// Tracks the performance factor and derives budgets from it.
#[derive(Debug, Clone)]
pub struct PerformanceGovernor {
    settings: GovernorSettings,
    factor: f32,
    points: u32,
}

impl PerformanceGovernor {
    /// Start at full quality.
    #[must_use]
    pub fn new(settings: GovernorSettings) -> Self {
        Self {
            settings,
            factor: 1.0,
            points: settings.max_points,
        }
    }

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> &GovernorSettings {
        &self.settings
    }

    /// Replace the settings, keeping the adapted point count within bounds.
    pub fn set_settings(&mut self, settings: GovernorSettings) {
        self.settings = settings;
        self.points = self.points.min(settings.max_points);
    }

    /// Latest performance factor.
    #[must_use]
    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Record a new performance factor.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn observe(&mut self, factor: f32) {
        self.factor = factor.clamp(0.0, 1.0);
        let scale = 0.9 + 0.2 * f64::from(self.factor);
        let scaled = (scale * f64::from(self.point_budget())).round();
        self.points = (scaled.max(0.0) as u32).min(self.settings.max_points);
    }

    /// Pixel ratio the renderer should use.
    #[must_use]
    pub fn pixel_ratio(&self) -> f32 {
        let max = self.settings.max_pixel_ratio;
        if self.settings.throttle_pixel_ratio {
            (0.5 + 1.5 * self.factor).round().min(max)
        } else {
            max
        }
    }

    /// Maximum number of points the renderer should draw.
    #[must_use]
    pub fn point_budget(&self) -> u32 {
        if self.settings.throttle_points {
            self.points.min(self.settings.max_points)
        } else {
            self.settings.max_points
        }
    }

    /// Notice to show, if any.
    #[must_use]
    pub fn notice(&self) -> Option<QualityNotice> {
        let throttling = self.settings.throttle_points || self.settings.throttle_pixel_ratio;
        if self.factor < 1.0 && throttling {
            Some(QualityNotice::QualityReduced)
        } else if self.factor < 0.5 && !throttling {
            Some(QualityNotice::FpsDegraded)
        } else {
            None
        }
    }

    /// Pair a handle with the current point budget.
    #[must_use]
    pub fn render_asset(&self, handle: ObjectHandle) -> RenderAsset {
        RenderAsset {
            handle,
            point_budget: self.point_budget(),
        }
    }
}

impl Default for PerformanceGovernor {
    fn default() -> Self {
        Self::new(GovernorSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn throttled() -> GovernorSettings {
        GovernorSettings {
            throttle_pixel_ratio: true,
            max_pixel_ratio: 2.0,
            throttle_points: true,
            max_points: 1_000_000,
        }
    }

    #[test]
    fn test_unthrottled_uses_maximums() {
        let mut governor = PerformanceGovernor::default();
        governor.observe(0.2);
        assert_eq!(governor.point_budget(), DEFAULT_MAX_POINTS);
        assert_eq!(governor.pixel_ratio(), 1.0);
        assert_eq!(governor.notice(), Some(QualityNotice::FpsDegraded));
    }

    #[test]
    fn test_throttled_points_shrink_and_recover() {
        let mut governor = PerformanceGovernor::new(throttled());

        governor.observe(0.0);
        assert_eq!(governor.point_budget(), 900_000);
        governor.observe(0.0);
        assert_eq!(governor.point_budget(), 810_000);

        // Full factor grows the budget by 10% per observation, capped at the max.
        governor.observe(1.0);
        assert_eq!(governor.point_budget(), 891_000);
        governor.observe(1.0);
        governor.observe(1.0);
        assert_eq!(governor.point_budget(), 1_000_000);
    }

    #[test]
    fn test_throttled_pixel_ratio() {
        let mut governor = PerformanceGovernor::new(throttled());
        governor.observe(1.0);
        assert_eq!(governor.pixel_ratio(), 2.0);
        governor.observe(0.5);
        assert_eq!(governor.pixel_ratio(), 1.0);
        governor.observe(0.0);
        assert_eq!(governor.pixel_ratio(), 1.0);
        assert_eq!(governor.notice(), Some(QualityNotice::QualityReduced));
    }

    #[test]
    fn test_factor_is_clamped() {
        let mut governor = PerformanceGovernor::new(throttled());
        governor.observe(3.0);
        assert_eq!(governor.factor(), 1.0);
        assert_eq!(governor.notice(), None);
        governor.observe(-1.0);
        assert_eq!(governor.factor(), 0.0);
    }

    #[test]
    fn test_lower_max_clamps_budget() {
        let mut governor = PerformanceGovernor::new(throttled());
        governor.set_settings(GovernorSettings {
            max_points: 500,
            ..throttled()
        });
        assert_eq!(governor.point_budget(), 500);
    }
}
