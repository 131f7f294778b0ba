//! One-shot asynchronous loading of the rigged character.
//!
//! [`AssetLoader::load_character`] spawns the load on the runtime and returns
//! a [`LoadTicket`]. The ticket yields exactly one outcome and is released
//! afterwards; dropping an unfinished ticket aborts the load task.

use anchor_sync_spatial::Vector3D;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::task::AbortHandle;
use tracing::debug;

use crate::error::AssetError;
use crate::scene::EntityId;

/// Joint hierarchy that lets body tracking drive an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    pub joint_names: Vec<String>,
}

impl Skeleton {
    pub fn joint_count(&self) -> usize {
        self.joint_names.len()
    }
}

/// Raw entity as produced by an asset source.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedEntity {
    pub entity: EntityId,
    pub name: String,
    pub skeleton: Option<Skeleton>,
}

/// A loaded entity whose skeleton can follow a tracked body.
#[derive(Debug, Clone, PartialEq)]
pub struct RiggedCharacter {
    entity: EntityId,
    name: String,
    skeleton: Skeleton,
    scale: Vector3D,
}

impl RiggedCharacter {
    /// Accept a loaded entity only if it carries a non-empty skeleton
    pub fn from_loaded(loaded: LoadedEntity, scale: Vector3D) -> Result<Self, AssetError> {
        match loaded.skeleton {
            Some(skeleton) if skeleton.joint_count() > 0 => Ok(Self {
                entity: loaded.entity,
                name: loaded.name,
                skeleton,
                scale,
            }),
            _ => Err(AssetError::NotRigCapable(loaded.name)),
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn scale(&self) -> Vector3D {
        self.scale
    }
}

/// Asset subsystem: resolves a name to an entity, off the tracking path.
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn load_entity(&self, name: &str) -> Result<LoadedEntity, AssetError>;
}

pub type LoadOutcome = Result<RiggedCharacter, AssetError>;

/// Issues character loads against an [`AssetSource`].
#[derive(Clone)]
pub struct AssetLoader {
    source: Arc<dyn AssetSource>,
}

impl AssetLoader {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self { source }
    }

    /// Start loading `name` in the background. Must be called from within a
    /// Tokio runtime. No retry is attempted on failure.
    pub fn load_character(&self, name: &str, scale: Vector3D) -> LoadTicket {
        let (tx, rx) = oneshot::channel();
        let source = Arc::clone(&self.source);
        let asset = name.to_string();

        let task = tokio::spawn({
            let asset = asset.clone();
            async move {
                debug!("Loading character asset '{}'", asset);
                let outcome = source
                    .load_entity(&asset)
                    .await
                    .and_then(|loaded| RiggedCharacter::from_loaded(loaded, scale));
                // The ticket may already be gone; nothing to deliver then.
                let _ = tx.send(outcome);
            }
        });

        LoadTicket {
            asset,
            completion: Some(rx),
            task: task.abort_handle(),
        }
    }
}

/// Handle to a single in-flight character load.
#[derive(Debug)]
pub struct LoadTicket {
    asset: String,
    completion: Option<oneshot::Receiver<LoadOutcome>>,
    task: AbortHandle,
}

impl LoadTicket {
    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// True until the outcome has been taken (or the ticket cancelled)
    pub fn is_pending(&self) -> bool {
        self.completion.is_some()
    }

    /// Wait for the outcome. Resolves once; afterwards it never resolves
    /// again, so it is safe to keep in a `select!` guarded by [`is_pending`].
    ///
    /// Cancel safe: dropping the future before it resolves loses nothing.
    ///
    /// [`is_pending`]: LoadTicket::is_pending
    pub async fn completed(&mut self) -> LoadOutcome {
        let Some(rx) = self.completion.as_mut() else {
            return std::future::pending::<LoadOutcome>().await;
        };
        let outcome = rx.await.unwrap_or(Err(AssetError::Cancelled));
        self.release();
        outcome
    }

    /// Non-blocking check for the outcome
    pub fn try_completed(&mut self) -> Option<LoadOutcome> {
        let rx = self.completion.as_mut()?;
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => Err(AssetError::Cancelled),
        };
        self.release();
        Some(outcome)
    }

    /// Abort the load; no outcome will be delivered
    pub fn cancel(&mut self) {
        if self.is_pending() {
            debug!("Cancelling load of '{}'", self.asset);
        }
        self.release();
    }

    fn release(&mut self) {
        self.completion = None;
        self.task.abort();
    }
}

impl Drop for LoadTicket {
    fn drop(&mut self) {
        self.task.abort();
    }
}
