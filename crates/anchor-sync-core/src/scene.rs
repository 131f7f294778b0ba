//! Scene-graph handles and the outbound scene interface.

use anchor_sync_spatial::{Quaternion, Vector3D};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

static NEXT_ENTITY: AtomicU64 = AtomicU64::new(1);

/// Handle to an entity living in the host scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Allocate a process-unique entity handle
    pub fn allocate() -> Self {
        Self(NEXT_ENTITY.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Outbound calls into the live scene.
pub trait SceneGraph: Send {
    /// Register an anchor so the renderer starts drawing its subtree
    fn add_anchor(&mut self, anchor: EntityId, name: &str);

    /// Remove an anchor and everything parented under it
    fn remove_anchor(&mut self, anchor: EntityId);

    /// Re-parent `child` under `parent`
    fn set_parent(&mut self, child: EntityId, parent: EntityId);

    /// Set the local scale of an entity
    fn set_scale(&mut self, entity: EntityId, scale: Vector3D);
}

/// Semantic role of an anchor node; exactly one node exists per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorRole {
    /// Follows the tracked body
    Character,
    /// Follows the reference surface
    Reality,
}

/// Local scene node mirroring a tracked anchor's pose.
///
/// Deliberately not `Clone`: the composition root owns each node and hands
/// out references only.
#[derive(Debug)]
pub struct AnchorNode {
    entity: EntityId,
    role: AnchorRole,
    name: String,
    position: Vector3D,
    orientation: Quaternion,
    pose_updates: u64,
}

impl AnchorNode {
    pub fn new(role: AnchorRole, name: impl Into<String>) -> Self {
        Self {
            entity: EntityId::allocate(),
            role,
            name: name.into(),
            position: Vector3D::ZERO,
            orientation: Quaternion::IDENTITY,
            pose_updates: 0,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn role(&self) -> AnchorRole {
        self.role
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vector3D {
        self.position
    }

    pub fn orientation(&self) -> Quaternion {
        self.orientation
    }

    /// Whether a pose of the matching kind has been written at least once
    pub fn has_pose(&self) -> bool {
        self.pose_updates > 0
    }

    pub fn pose_updates(&self) -> u64 {
        self.pose_updates
    }

    pub fn set_pose(&mut self, position: Vector3D, orientation: Quaternion) {
        self.position = position;
        self.orientation = orientation;
        self.pose_updates += 1;
    }

    /// Move the node without touching its orientation
    pub fn set_position(&mut self, position: Vector3D) {
        self.position = position;
        self.pose_updates += 1;
    }
}

#[derive(Debug, Default)]
struct SceneState {
    anchors: Vec<(EntityId, String)>,
    parents: HashMap<EntityId, EntityId>,
    reparents: Vec<(EntityId, EntityId)>,
    scales: HashMap<EntityId, Vector3D>,
}

/// A headless scene that records every outbound call.
///
/// Clones share the same underlying state, so a caller can keep a handle
/// for inspection after passing one into a session.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScene {
    state: Arc<Mutex<SceneState>>,
}

impl InMemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SceneState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Names of registered anchors, in registration order
    pub fn anchor_names(&self) -> Vec<String> {
        self.lock().anchors.iter().map(|(_, name)| name.clone()).collect()
    }

    pub fn contains_anchor(&self, anchor: EntityId) -> bool {
        self.lock().anchors.iter().any(|(id, _)| *id == anchor)
    }

    pub fn parent_of(&self, child: EntityId) -> Option<EntityId> {
        self.lock().parents.get(&child).copied()
    }

    /// How many times `child` has been re-parented
    pub fn reparent_count(&self, child: EntityId) -> usize {
        self.lock()
            .reparents
            .iter()
            .filter(|(c, _)| *c == child)
            .count()
    }

    /// Last scale applied to `entity`, if any
    pub fn scale_of(&self, entity: EntityId) -> Option<Vector3D> {
        self.lock().scales.get(&entity).copied()
    }
}

impl SceneGraph for InMemoryScene {
    fn add_anchor(&mut self, anchor: EntityId, name: &str) {
        let mut state = self.lock();
        if !state.anchors.iter().any(|(id, _)| *id == anchor) {
            state.anchors.push((anchor, name.to_string()));
        }
    }

    fn remove_anchor(&mut self, anchor: EntityId) {
        let mut state = self.lock();
        state.anchors.retain(|(id, _)| *id != anchor);
        state.parents.retain(|_, parent| *parent != anchor);
    }

    fn set_parent(&mut self, child: EntityId, parent: EntityId) {
        let mut state = self.lock();
        state.parents.insert(child, parent);
        state.reparents.push((child, parent));
    }

    fn set_scale(&mut self, entity: EntityId, scale: Vector3D) {
        self.lock().scales.insert(entity, scale);
    }
}
