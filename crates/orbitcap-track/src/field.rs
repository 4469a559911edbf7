use orbitcap_core::config::LayeredConfig;
use orbitcap_core::error::{CaptureError, Result};
use orbitcap_core::models::{Checkpoint, MarkerColor, PointStatus, Ring, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// cos(30°): radius factor of the upper ring of a dome
const UPPER_RING_RADIUS_FACTOR: f32 = 0.866;

/// sin(30°): height factor of the upper ring of a dome
const UPPER_RING_HEIGHT_FACTOR: f32 = 0.5;

/// Geometry of one ring of checkpoints
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RingSpec {
    /// Number of checkpoints on the ring
    pub count: usize,

    /// Ring radius in metres
    pub radius: f32,

    /// Height above the anchor in metres
    pub height: f32,
}

/// Parameters of a checkpoint field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub rings: Vec<RingSpec>,

    /// Scale of the rendered markers. Only used by renderers.
    pub marker_scale: f32,
}

impl FieldSpec {
    /// A single ring level with the anchor
    pub fn single_ring(count: usize, radius: f32) -> Self {
        Self { rings: vec![RingSpec { count, radius, height: 0.0 }], marker_scale: 1.0 }
    }

    /// Two rings: one level with the anchor and one raised to a 30° band
    pub fn dome(count: usize, radius: f32) -> Self {
        Self {
            rings: vec![
                RingSpec { count, radius, height: 0.0 },
                RingSpec {
                    count,
                    radius: radius * UPPER_RING_RADIUS_FACTOR,
                    height: radius * UPPER_RING_HEIGHT_FACTOR,
                },
            ],
            marker_scale: 1.0,
        }
    }

    pub fn from_config(config: &LayeredConfig) -> Self {
        let count = config.points_per_ring.value;
        let radius = config.ring_radius.value;
        if config.ring_count.value >= 2 {
            Self::dome(count, radius)
        } else {
            Self::single_ring(count, radius)
        }
    }

    pub fn with_marker_scale(mut self, scale: f32) -> Self {
        self.marker_scale = scale;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.rings.is_empty() || self.rings.len() > 2 {
            return Err(CaptureError::InvalidField {
                reason: format!("expected 1 or 2 rings, got {}", self.rings.len()),
            });
        }
        for (i, ring) in self.rings.iter().enumerate() {
            if ring.count == 0 {
                return Err(CaptureError::InvalidField {
                    reason: format!("ring {} has no checkpoints", i),
                });
            }
            if !(ring.radius.is_finite() && ring.radius > 0.0) || !ring.height.is_finite() {
                return Err(CaptureError::InvalidField {
                    reason: format!("ring {} has invalid radius {} or height {}", i, ring.radius, ring.height),
                });
            }
        }
        Ok(())
    }
}

/// Placement of one ring inside a built field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingLayout {
    pub ring: Ring,

    /// Index of the ring's first checkpoint
    pub base: usize,

    pub count: usize,

    /// Absolute world-space height of the ring
    pub world_height: f32,
}

impl RingLayout {
    pub fn contains(&self, index: usize) -> bool {
        index >= self.base && index < self.base + self.count
    }
}

/// Ordered checkpoints around an anchor.
///
/// Indices are contiguous `0..len()` across all rings and fixed at
/// construction. Only statuses change afterwards.
#[derive(Debug, Clone)]
pub struct CheckpointField {
    anchor: Vec3,
    spec: FieldSpec,
    layouts: Vec<RingLayout>,
    checkpoints: Vec<Checkpoint>,
}

impl CheckpointField {
    /// Lay out every ring of `spec` around `anchor`
    pub fn build(anchor: Vec3, spec: FieldSpec) -> Result<Self> {
        spec.validate()?;

        let total = spec.rings.iter().map(|r| r.count).sum();
        let mut checkpoints = Vec::with_capacity(total);
        let mut layouts = Vec::with_capacity(spec.rings.len());

        for (ring_spec, ring) in spec.rings.iter().zip([Ring::First, Ring::Second]) {
            let base = checkpoints.len();
            let increment = 2.0 * PI / ring_spec.count as f32;

            for i in 0..ring_spec.count {
                let angle = increment * i as f32;
                let position = Vec3::new(
                    anchor.x + angle.cos() * ring_spec.radius,
                    anchor.y + ring_spec.height,
                    anchor.z + angle.sin() * ring_spec.radius,
                );
                checkpoints.push(Checkpoint::new(base + i, position, ring));
            }

            layouts.push(RingLayout {
                ring,
                base,
                count: ring_spec.count,
                world_height: anchor.y + ring_spec.height,
            });
        }

        tracing::debug!(
            anchor = ?anchor,
            rings = layouts.len(),
            checkpoints = checkpoints.len(),
            "Built checkpoint field"
        );

        Ok(Self { anchor, spec, layouts, checkpoints })
    }

    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    pub fn rings(&self) -> &[RingLayout] {
        &self.layouts
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn get(&self, index: usize) -> Option<&Checkpoint> {
        self.checkpoints.get(index)
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn status(&self, index: usize) -> Option<PointStatus> {
        self.checkpoints.get(index).map(|c| c.status)
    }

    pub fn statuses(&self) -> Vec<PointStatus> {
        self.checkpoints.iter().map(|c| c.status).collect()
    }

    pub fn colors(&self) -> Vec<MarkerColor> {
        self.checkpoints.iter().map(Checkpoint::color).collect()
    }

    pub fn captured_count(&self) -> usize {
        self.checkpoints.iter().filter(|c| c.is_captured()).count()
    }

    /// Index of the checkpoint currently marked `Pointed`
    pub fn pointed(&self) -> Option<usize> {
        self.checkpoints.iter().position(|c| c.status == PointStatus::Pointed)
    }

    /// Refresh statuses for the latest nearest-point result.
    ///
    /// Captured checkpoints keep their status; every other checkpoint becomes
    /// `Pointed` if it is `nearest` and `Initialized` otherwise.
    pub fn update_points(&mut self, nearest: Option<usize>) {
        for checkpoint in &mut self.checkpoints {
            if checkpoint.is_captured() {
                continue;
            }
            checkpoint.status = if Some(checkpoint.index) == nearest {
                PointStatus::Pointed
            } else {
                PointStatus::Initialized
            };
        }
    }

    /// Mark a checkpoint as captured. Returns whether it was newly captured.
    pub fn mark_captured(&mut self, index: usize) -> Result<bool> {
        let count = self.checkpoints.len();
        let checkpoint = self
            .checkpoints
            .get_mut(index)
            .ok_or(CaptureError::CheckpointOutOfRange { index, count })?;

        let newly = !checkpoint.is_captured();
        checkpoint.status = PointStatus::Captured;
        Ok(newly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_ring_positions() {
        let field = CheckpointField::build(Vec3::zeros(), FieldSpec::single_ring(4, 0.2)).unwrap();

        assert_eq!(field.len(), 4);
        let p0 = field.get(0).unwrap().position;
        let p1 = field.get(1).unwrap().position;
        let p2 = field.get(2).unwrap().position;

        assert!((p0 - Vec3::new(0.2, 0.0, 0.0)).norm() < 1e-6);
        assert!((p1 - Vec3::new(0.0, 0.0, 0.2)).norm() < 1e-6);
        assert!((p2 - Vec3::new(-0.2, 0.0, 0.0)).norm() < 1e-6);
        assert!(field.checkpoints().iter().all(|c| c.ring == Ring::First));
    }

    #[test]
    fn test_dome_rings_continue_indices() {
        let anchor = Vec3::new(1.0, 0.5, -2.0);
        let field = CheckpointField::build(anchor, FieldSpec::dome(6, 0.2)).unwrap();

        assert_eq!(field.len(), 12);
        assert_eq!(field.rings()[1].base, 6);
        assert_eq!(field.get(6).unwrap().ring, Ring::Second);
        assert_eq!(field.get(6).unwrap().index, 6);

        let upper = field.get(6).unwrap().position - anchor;
        assert!((upper.y - 0.1).abs() < 1e-6);
        assert!((upper.x - 0.2 * 0.866).abs() < 1e-6);
        assert!((field.rings()[1].world_height - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_specs() {
        assert!(CheckpointField::build(Vec3::zeros(), FieldSpec::single_ring(0, 0.2)).is_err());
        assert!(CheckpointField::build(Vec3::zeros(), FieldSpec::single_ring(4, -1.0)).is_err());

        let empty = FieldSpec { rings: vec![], marker_scale: 1.0 };
        assert!(CheckpointField::build(Vec3::zeros(), empty).is_err());

        let mut three = FieldSpec::dome(4, 0.2);
        three.rings.push(three.rings[0]);
        assert!(CheckpointField::build(Vec3::zeros(), three).is_err());
    }

    #[test]
    fn test_update_points_keeps_captured() {
        let mut field =
            CheckpointField::build(Vec3::zeros(), FieldSpec::single_ring(5, 0.15)).unwrap();

        field.update_points(Some(2));
        assert_eq!(field.pointed(), Some(2));

        assert!(field.mark_captured(2).unwrap());
        assert!(!field.mark_captured(2).unwrap());
        field.update_points(Some(2));
        assert_eq!(field.status(2), Some(PointStatus::Captured));
        assert_eq!(field.pointed(), None);

        field.update_points(Some(3));
        assert_eq!(field.pointed(), Some(3));
        assert_eq!(field.colors()[2], MarkerColor::Done);
        assert_eq!(field.colors()[3], MarkerColor::Aimed);
        assert_eq!(field.colors()[0], MarkerColor::Pending);

        field.update_points(None);
        assert_eq!(field.pointed(), None);
        assert_eq!(field.captured_count(), 1);
    }

    #[test]
    fn test_mark_captured_out_of_range() {
        let mut field =
            CheckpointField::build(Vec3::zeros(), FieldSpec::single_ring(3, 0.15)).unwrap();
        let err = field.mark_captured(3).unwrap_err();
        assert!(matches!(err, CaptureError::CheckpointOutOfRange { index: 3, count: 3 }));
    }
}
