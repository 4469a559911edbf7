use orbitcap_core::config::LayeredConfig;
use orbitcap_core::models::Vec3;
use serde::{Deserialize, Serialize};

use crate::field::{CheckpointField, RingLayout};

/// Gates applied before a camera position may light up a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Maximum camera distance from the anchor in metres
    pub distance_threshold: f32,

    /// Maximum elevation mismatch in degrees
    pub elevation_threshold: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self { distance_threshold: 0.4, elevation_threshold: 15.0 }
    }
}

impl From<&LayeredConfig> for TrackerConfig {
    fn from(config: &LayeredConfig) -> Self {
        Self {
            distance_threshold: config.distance_threshold.value,
            elevation_threshold: config.elevation_threshold.value,
        }
    }
}

/// Resolves camera positions to the checkpoint being aimed at.
///
/// Resolution is a distance gate, then ring selection by height, then an
/// azimuth snap to the nearest checkpoint of that ring, then an elevation
/// gate against the snapped checkpoint. Constant time per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProximityTracker {
    config: TrackerConfig,
}

impl ProximityTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Index of the checkpoint the camera is aiming at, if any
    pub fn find_nearest(&self, field: &CheckpointField, camera: Vec3) -> Option<usize> {
        let anchor = field.anchor();
        let rel = camera - anchor;

        if rel.norm() > self.config.distance_threshold {
            return None;
        }

        let ring = nearest_ring(field.rings(), camera.y)?;

        let interval = 360.0 / ring.count as f32;
        let azimuth = azimuth_degrees(&rel);
        let slot = (azimuth / interval).round() as usize % ring.count;
        let candidate = ring.base + slot;

        let checkpoint = field.get(candidate)?;
        let mismatch = (elevation_degrees(&rel) - elevation_degrees(&(checkpoint.position - anchor))).abs();
        if mismatch > self.config.elevation_threshold {
            return None;
        }

        Some(candidate)
    }

    /// Find the nearest checkpoint and refresh every status in the field
    pub fn track(&self, field: &mut CheckpointField, camera: Vec3) -> Option<usize> {
        let nearest = self.find_nearest(field, camera);
        field.update_points(nearest);
        nearest
    }
}

fn nearest_ring(rings: &[RingLayout], camera_height: f32) -> Option<&RingLayout> {
    rings.iter().min_by(|a, b| {
        let da = (camera_height - a.world_height).abs();
        let db = (camera_height - b.world_height).abs();
        da.total_cmp(&db)
    })
}

/// Azimuth around the vertical axis in `[0, 360)`
fn azimuth_degrees(rel: &Vec3) -> f32 {
    let angle = rel.z.atan2(rel.x).to_degrees();
    if angle < 0.0 {
        angle + 360.0
    } else {
        angle
    }
}

/// Angle above the anchor's horizontal plane
fn elevation_degrees(rel: &Vec3) -> f32 {
    let horizontal = (rel.x * rel.x + rel.z * rel.z).sqrt();
    rel.y.atan2(horizontal).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSpec;
    use orbitcap_core::models::PointStatus;

    fn four_point_ring() -> CheckpointField {
        CheckpointField::build(Vec3::zeros(), FieldSpec::single_ring(4, 0.2)).unwrap()
    }

    #[test]
    fn test_reference_positions() {
        let tracker = ProximityTracker::default();
        let field = four_point_ring();

        assert_eq!(tracker.find_nearest(&field, Vec3::new(0.2, 0.0, 0.001)), Some(0));
        assert_eq!(tracker.find_nearest(&field, Vec3::new(-0.2, 0.0, 0.0)), Some(2));
        assert_eq!(tracker.find_nearest(&field, Vec3::new(0.0, 0.0, 5.0)), None);
    }

    #[test]
    fn test_azimuth_wraps_to_first_checkpoint() {
        let tracker = ProximityTracker::default();
        let field = four_point_ring();

        // 359° snaps back to index 0, not to a non-existent index 4
        let camera = Vec3::new(0.3 * 359f32.to_radians().cos(), 0.0, 0.3 * 359f32.to_radians().sin());
        assert_eq!(tracker.find_nearest(&field, camera), Some(0));
    }

    #[test]
    fn test_elevation_gate() {
        let tracker = ProximityTracker::default();
        let field = four_point_ring();

        // 10° above the ring plane passes, 30° does not
        let low = Vec3::new(0.3 * 10f32.to_radians().cos(), 0.3 * 10f32.to_radians().sin(), 0.0);
        let high = Vec3::new(0.3 * 30f32.to_radians().cos(), 0.3 * 30f32.to_radians().sin(), 0.0);

        assert_eq!(tracker.find_nearest(&field, low), Some(0));
        assert_eq!(tracker.find_nearest(&field, high), None);
    }

    #[test]
    fn test_custom_thresholds() {
        let tracker = ProximityTracker::new(TrackerConfig {
            distance_threshold: 1.0,
            elevation_threshold: 40.0,
        });
        let field = four_point_ring();

        let camera = Vec3::new(0.0, 0.4, 0.6);
        assert_eq!(tracker.find_nearest(&field, camera), Some(1));
    }

    #[test]
    fn test_dome_selects_ring_by_height() {
        let tracker = ProximityTracker::default();
        let field = CheckpointField::build(Vec3::zeros(), FieldSpec::dome(8, 0.15)).unwrap();

        // level with the lower ring, facing +x
        assert_eq!(tracker.find_nearest(&field, Vec3::new(0.3, 0.0, 0.0)), Some(0));

        // on the 30° band, facing +z
        let upper = Vec3::new(0.0, 0.3 * 0.5, 0.3 * 0.866);
        assert_eq!(tracker.find_nearest(&field, upper), Some(8 + 2));
    }

    #[test]
    fn test_dome_rejects_between_bands() {
        let tracker = ProximityTracker::default();
        let field = CheckpointField::build(Vec3::zeros(), FieldSpec::dome(8, 0.15)).unwrap();

        // 60° elevation is nearest the upper ring by height but far off its band
        let steep = Vec3::new(0.3 * 60f32.to_radians().cos(), 0.3 * 60f32.to_radians().sin(), 0.0);
        assert_eq!(tracker.find_nearest(&field, steep), None);
    }

    #[test]
    fn test_track_updates_statuses() {
        let tracker = ProximityTracker::default();
        let mut field = four_point_ring();

        assert_eq!(tracker.track(&mut field, Vec3::new(0.0, 0.0, 0.25)), Some(1));
        assert_eq!(field.status(1), Some(PointStatus::Pointed));

        assert_eq!(tracker.track(&mut field, Vec3::new(0.0, 0.0, 5.0)), None);
        assert_eq!(field.pointed(), None);
    }
}
