use serde::{Deserialize, Serialize};

use super::geometry::Vec3;

/// Which ring of the capture dome a checkpoint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ring {
    First,
    Second,
}

/// Capture progress of a single checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointStatus {
    Initialized,
    Pointed,
    Captured,
}

/// Colour a renderer should use for a checkpoint marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    /// Not yet captured, not aimed at (red)
    Pending,
    /// Currently aimed at (yellow)
    Aimed,
    /// Captured (green)
    Done,
}

impl From<PointStatus> for MarkerColor {
    fn from(status: PointStatus) -> Self {
        match status {
            PointStatus::Initialized => MarkerColor::Pending,
            PointStatus::Pointed => MarkerColor::Aimed,
            PointStatus::Captured => MarkerColor::Done,
        }
    }
}

/// A labelled target position around the captured object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Contiguous index across all rings of the field
    pub index: usize,

    /// World-space position
    pub position: Vec3,

    /// Ring this checkpoint sits on
    pub ring: Ring,

    /// Current capture progress
    pub status: PointStatus,
}

impl Checkpoint {
    pub fn new(index: usize, position: Vec3, ring: Ring) -> Self {
        Self { index, position, ring, status: PointStatus::Initialized }
    }

    pub fn is_captured(&self) -> bool {
        self.status == PointStatus::Captured
    }

    pub fn color(&self) -> MarkerColor {
        self.status.into()
    }
}
