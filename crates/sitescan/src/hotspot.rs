//! Hotspots: fixed points of interest with optional preset views.
//!
//! Catalogs are read-only reference data, loaded from JSON:
//!
//! ```json
//! [
//!   {
//!     "id": "crane",
//!     "label": "Tower crane",
//!     "world_position": [4.0, 12.0, -3.5],
//!     "camera_position": [10.0, 15.0, 4.0],
//!     "description": "Liebherr 280 EC-H, installed in week 14."
//!   }
//! ]
//! ```

use std::collections::HashSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A point of interest in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotPoint {
    /// Unique key.
    pub id: String,
    /// Where the marker sits.
    pub world_position: Vec3,
    /// Short title shown in lists and on the marker.
    pub label: String,
    /// Where the camera goes when the hotspot is selected.
    #[serde(default)]
    pub camera_position: Option<Vec3>,
    /// Longer text for the info panel.
    #[serde(default)]
    pub description: Option<String>,
    /// Link to a video about this point.
    #[serde(default)]
    pub video_url: Option<String>,
}

/// An ordered set of hotspots with unique ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HotspotCatalog {
    points: Vec<HotspotPoint>,
}

impl HotspotCatalog {
    /// Build a catalog, rejecting duplicate ids.
    pub fn new(points: Vec<HotspotPoint>) -> Result<Self> {
        let mut seen = HashSet::new();
        for point in &points {
            if !seen.insert(point.id.as_str()) {
                return Err(Error::InvalidData {
                    context: "hotspot catalog",
                    detail: format!("duplicate hotspot id '{}'", point.id),
                });
            }
        }
        Ok(Self { points })
    }

    /// Parse a catalog from a JSON array.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let points: Vec<HotspotPoint> = serde_json::from_str(json)?;
        Self::new(points)
    }

    /// The built-in catalog for the demo site.
    #[must_use]
    pub fn demo_site() -> Self {
        let point = |id: &str, label: &str, world: Vec3, camera: Vec3, description: &str| {
            HotspotPoint {
                id: id.to_string(),
                world_position: world,
                label: label.to_string(),
                camera_position: Some(camera),
                description: Some(description.to_string()),
                video_url: None,
            }
        };

        Self {
            points: vec![
                point(
                    "entrance",
                    "Site entrance",
                    Vec3::new(10.0, 1.0, 5.0),
                    Vec3::new(14.0, 4.0, 9.0),
                    "Gate and delivery checkpoint.",
                ),
                point(
                    "foundation",
                    "Foundation slab",
                    Vec3::new(0.0, -2.0, 3.0),
                    Vec3::new(6.0, 6.0, 6.0),
                    "Poured concrete slab of the main building.",
                ),
                point(
                    "crane",
                    "Tower crane",
                    Vec3::new(-4.0, 6.0, -2.0),
                    Vec3::new(-10.0, 9.0, 4.0),
                    "Crane base and counterweight.",
                ),
            ],
        }
    }

    /// All hotspots in catalog order.
    #[must_use]
    pub fn points(&self) -> &[HotspotPoint] {
        &self.points
    }

    /// Look up a hotspot by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&HotspotPoint> {
        self.points.iter().find(|point| point.id == id)
    }

    /// Number of hotspots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the catalog has no hotspots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalog() {
        let json = r#"[
            {
                "id": "crane",
                "label": "Tower crane",
                "world_position": [4.0, 12.0, -3.5],
                "camera_position": [10.0, 15.0, 4.0],
                "description": "Crane base."
            },
            {
                "id": "gate",
                "label": "Gate",
                "world_position": [0.0, 0.0, 0.0]
            }
        ]"#;

        let catalog = HotspotCatalog::from_json_str(json).unwrap();
        assert_eq!(catalog.len(), 2);

        let crane = catalog.get("crane").unwrap();
        assert_eq!(crane.world_position, Vec3::new(4.0, 12.0, -3.5));
        assert_eq!(crane.camera_position, Some(Vec3::new(10.0, 15.0, 4.0)));

        let gate = catalog.get("gate").unwrap();
        assert!(gate.camera_position.is_none());
        assert!(gate.video_url.is_none());
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"[
            {"id": "a", "label": "A", "world_position": [0, 0, 0]},
            {"id": "a", "label": "B", "world_position": [1, 1, 1]}
        ]"#;
        let err = HotspotCatalog::from_json_str(json).unwrap_err();
        assert!(matches!(err, Error::InvalidData { context: "hotspot catalog", .. }));
    }

    #[test]
    fn test_malformed_json() {
        let err = HotspotCatalog::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, Error::InvalidData { context: "json", .. }));
    }

    #[test]
    fn test_demo_site_has_unique_ids() {
        let demo = HotspotCatalog::demo_site();
        assert!(!demo.is_empty());
        assert!(HotspotCatalog::new(demo.points().to_vec()).is_ok());
    }
}
