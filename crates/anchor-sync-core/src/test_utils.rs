//! In-process stand-ins for the host, asset and scene-description
//! collaborators, plus event builders. Used by the tests in this crate and
//! by downstream integration tests.

use anchor_sync_spatial::{PoseMatrix, Quaternion, Vector3D};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::composition::{AuthoredProp, SceneDescription};
use crate::error::{AssetError, Result};
use crate::event::{AnchorEvent, AnchorId, PlaneGeometry};
use crate::loader::{AssetSource, LoadedEntity, Skeleton};
use crate::scene::EntityId;
use crate::session::{SessionHost, TrackingConfiguration};

/// Body anchor update at `position` facing `rotation`
pub fn body_event(id: AnchorId, position: Vector3D, rotation: Quaternion) -> AnchorEvent {
    AnchorEvent::body(id, PoseMatrix::from_rotation_translation(rotation, position))
}

/// Horizontal 1m x 1m plane at `position`
pub fn plane_event(id: AnchorId, position: Vector3D, rotation: Quaternion) -> AnchorEvent {
    AnchorEvent::plane(
        id,
        PlaneGeometry::horizontal(1.0, 1.0),
        PoseMatrix::from_rotation_translation(rotation, position),
    )
}

/// Scene description with a single authored prop.
#[derive(Debug, Clone)]
pub struct StaticSceneDescription {
    prop: AuthoredProp,
}

impl StaticSceneDescription {
    pub fn new(prop: AuthoredProp) -> Self {
        Self { prop }
    }

    /// A box authored under its own default anchor
    pub fn boxed_prop() -> Self {
        Self::new(AuthoredProp {
            entity: EntityId::allocate(),
            name: "box".to_string(),
            default_anchor: Some(EntityId::allocate()),
        })
    }
}

impl SceneDescription for StaticSceneDescription {
    fn load_prop(&self) -> Result<AuthoredProp> {
        Ok(self.prop.clone())
    }
}

#[derive(Debug, Clone)]
enum ScriptedResult {
    Rigged,
    StaticMesh,
    Fail(AssetError),
}

/// Asset source that waits a fixed delay, then yields a scripted result.
#[derive(Debug, Clone)]
pub struct ScriptedAssetSource {
    delay: Duration,
    result: ScriptedResult,
    calls: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
}

impl ScriptedAssetSource {
    fn with(delay: Duration, result: ScriptedResult) -> Self {
        Self {
            delay,
            result,
            calls: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Succeeds with a skeleton-bearing entity
    pub fn rigged(delay: Duration) -> Self {
        Self::with(delay, ScriptedResult::Rigged)
    }

    /// Succeeds with an entity that has no skeleton
    pub fn static_mesh(delay: Duration) -> Self {
        Self::with(delay, ScriptedResult::StaticMesh)
    }

    pub fn failing(delay: Duration, error: AssetError) -> Self {
        Self::with(delay, ScriptedResult::Fail(error))
    }

    /// Loads started
    pub fn load_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Loads that ran to the end of their delay
    pub fn completed_loads(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetSource for ScriptedAssetSource {
    async fn load_entity(&self, name: &str) -> std::result::Result<LoadedEntity, AssetError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);

        let skeleton = match &self.result {
            ScriptedResult::Rigged => Some(Skeleton {
                joint_names: ["root", "hips_joint", "spine_1_joint", "head_joint"]
                    .iter()
                    .map(|j| j.to_string())
                    .collect(),
            }),
            ScriptedResult::StaticMesh => None,
            ScriptedResult::Fail(err) => return Err(err.clone()),
        };

        Ok(LoadedEntity {
            entity: EntityId::allocate(),
            name: name.to_string(),
            skeleton,
        })
    }
}

#[derive(Debug, Default)]
struct HostState {
    runs: Vec<TrackingConfiguration>,
    pauses: usize,
    idle_timer_disabled: bool,
}

/// Host that records every call. Clones share state.
#[derive(Debug, Clone)]
pub struct MockHost {
    body_tracking: bool,
    state: Arc<Mutex<HostState>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            body_tracking: true,
            state: Arc::default(),
        }
    }

    /// A device without body tracking
    pub fn unsupported() -> Self {
        Self {
            body_tracking: false,
            ..Self::new()
        }
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn run_count(&self) -> usize {
        self.lock().runs.len()
    }

    pub fn last_configuration(&self) -> Option<TrackingConfiguration> {
        self.lock().runs.last().cloned()
    }

    pub fn pause_count(&self) -> usize {
        self.lock().pauses
    }

    pub fn idle_timer_disabled(&self) -> bool {
        self.lock().idle_timer_disabled
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHost for MockHost {
    fn supports_body_tracking(&self) -> bool {
        self.body_tracking
    }

    fn run(&mut self, configuration: &TrackingConfiguration) {
        self.lock().runs.push(configuration.clone());
    }

    fn pause(&mut self) {
        self.lock().pauses += 1;
    }

    fn set_idle_timer_disabled(&mut self, disabled: bool) {
        self.lock().idle_timer_disabled = disabled;
    }
}
