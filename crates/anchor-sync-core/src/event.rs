//! Anchor observations delivered by the tracking subsystem.

use anchor_sync_spatial::{PoseMatrix, Vector3D};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier the tracking subsystem assigns to a physical anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorId(pub Uuid);

impl AnchorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnchorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Orientation class of a detected surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneAlignment {
    Horizontal,
    Vertical,
}

/// Surface geometry reported with a plane anchor, in the anchor's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneGeometry {
    pub alignment: PlaneAlignment,
    pub center: Vector3D,
    /// Width (x) and depth (z) of the estimated surface
    pub extent: (f32, f32),
}

impl PlaneGeometry {
    pub fn horizontal(extent_x: f32, extent_z: f32) -> Self {
        Self {
            alignment: PlaneAlignment::Horizontal,
            center: Vector3D::ZERO,
            extent: (extent_x, extent_z),
        }
    }
}

/// What kind of physical thing an anchor tracks, with its kind-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorKind {
    /// A tracked human body
    Body,
    /// A detected surface
    Plane(PlaneGeometry),
    /// Anything else the tracking subsystem reports (images, faces, ...)
    Other { type_name: String },
}

impl AnchorKind {
    pub fn label(&self) -> &str {
        match self {
            AnchorKind::Body => "body",
            AnchorKind::Plane(_) => "plane",
            AnchorKind::Other { type_name } => type_name,
        }
    }
}

/// One anchor observation within a tracking frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorEvent {
    pub id: AnchorId,
    pub kind: AnchorKind,
    pub transform: PoseMatrix,
}

impl AnchorEvent {
    pub fn body(id: AnchorId, transform: PoseMatrix) -> Self {
        Self {
            id,
            kind: AnchorKind::Body,
            transform,
        }
    }

    pub fn plane(id: AnchorId, geometry: PlaneGeometry, transform: PoseMatrix) -> Self {
        Self {
            id,
            kind: AnchorKind::Plane(geometry),
            transform,
        }
    }

    pub fn other(id: AnchorId, type_name: impl Into<String>, transform: PoseMatrix) -> Self {
        Self {
            id,
            kind: AnchorKind::Other {
                type_name: type_name.into(),
            },
            transform,
        }
    }
}

/// The two inbound tracking callbacks, as one message type for the session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingCallback {
    AnchorsAdded(Vec<AnchorEvent>),
    AnchorsUpdated(Vec<AnchorEvent>),
}

impl TrackingCallback {
    pub fn events(&self) -> &[AnchorEvent] {
        match self {
            TrackingCallback::AnchorsAdded(batch) | TrackingCallback::AnchorsUpdated(batch) => batch,
        }
    }
}
