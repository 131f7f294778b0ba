//! Timed tracking frames read from TOML.
//!
//! ```toml
//! [[frame]]
//! at_ms = 0
//! event = "added"
//!
//! [[frame.anchor]]
//! id = "walker"
//! kind = "body"
//! position = [0.0, 0.0, -1.5]
//! yaw_deg = 15.0
//! ```
//!
//! Anchors are matched across frames by their `id` label. A `matrix` given
//! as four columns replaces `position`/`yaw_deg` verbatim.

use anchor_sync_core::{AnchorEvent, AnchorId, PlaneAlignment, PlaneGeometry, TrackingCallback};
use anchor_sync_spatial::{PoseMatrix, Quaternion, Vector3D};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// A callback and the offset from session start at which it is delivered.
#[derive(Debug, Clone)]
pub struct TimedFrame {
    pub at: Duration,
    pub callback: TrackingCallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameEvent {
    Added,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptedKind {
    Body,
    Plane,
    VerticalPlane,
    Image,
    Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptedAnchor {
    pub id: String,
    pub kind: ScriptedKind,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub yaw_deg: f32,
    #[serde(default)]
    pub matrix: Option<[[f32; 4]; 4]>,
    #[serde(default = "default_extent")]
    pub extent: [f32; 2],
}

fn default_extent() -> [f32; 2] {
    [1.0, 1.0]
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptedFrame {
    pub at_ms: u64,
    pub event: FrameEvent,
    #[serde(default)]
    pub anchor: Vec<ScriptedAnchor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub frame: Vec<ScriptedFrame>,
}

impl Script {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("parsing script {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Resolve labels to anchor ids and order frames by time
    pub fn into_frames(self) -> Vec<TimedFrame> {
        let mut ids: HashMap<String, AnchorId> = HashMap::new();
        let mut frames: Vec<TimedFrame> = self
            .frame
            .into_iter()
            .map(|frame| {
                let events = frame
                    .anchor
                    .into_iter()
                    .map(|anchor| {
                        let id = *ids.entry(anchor.id.clone()).or_insert_with(AnchorId::new);
                        to_event(id, anchor)
                    })
                    .collect();
                TimedFrame {
                    at: Duration::from_millis(frame.at_ms),
                    callback: match frame.event {
                        FrameEvent::Added => TrackingCallback::AnchorsAdded(events),
                        FrameEvent::Updated => TrackingCallback::AnchorsUpdated(events),
                    },
                }
            })
            .collect();
        frames.sort_by_key(|f| f.at);
        frames
    }
}

fn to_event(id: AnchorId, anchor: ScriptedAnchor) -> AnchorEvent {
    let transform = match anchor.matrix {
        Some(columns) => PoseMatrix::from_columns(columns),
        None => PoseMatrix::from_rotation_translation(
            Quaternion::from_axis_angle(Vector3D::UP, anchor.yaw_deg.to_radians()),
            Vector3D::from_array(anchor.position),
        ),
    };
    let [width, depth] = anchor.extent;

    match anchor.kind {
        ScriptedKind::Body => AnchorEvent::body(id, transform),
        ScriptedKind::Plane => {
            AnchorEvent::plane(id, PlaneGeometry::horizontal(width, depth), transform)
        }
        ScriptedKind::VerticalPlane => AnchorEvent::plane(
            id,
            PlaneGeometry {
                alignment: PlaneAlignment::Vertical,
                center: Vector3D::ZERO,
                extent: (width, depth),
            },
            transform,
        ),
        ScriptedKind::Image => AnchorEvent::other(id, "image", transform),
        ScriptedKind::Object => AnchorEvent::other(id, "object", transform),
    }
}
