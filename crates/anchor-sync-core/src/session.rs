//! Explicit per-session state: construction on start, teardown on end.

use anchor_sync_spatial::{Quaternion, Vector3D};
use serde::Serialize;
use tracing::{info, warn};

use crate::attachment::{AttachOutcome, AttachmentStateMachine, LinkState};
use crate::composition::{SceneDescription, SceneRoot};
use crate::config::{PlaneDetection, SessionConfig};
use crate::dispatcher::{AnchorDispatcher, BatchReport, DispatchStats};
use crate::error::{AssetError, Result, SessionError};
use crate::event::{AnchorEvent, TrackingCallback};
use crate::loader::{AssetLoader, LoadOutcome, LoadTicket};
use crate::scene::{EntityId, SceneGraph};

/// Tracking configuration handed to the host when the session runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingConfiguration {
    pub body_tracking: bool,
    pub plane_detection: PlaneDetection,
    pub automatic_skeleton_scale_estimation: bool,
}

impl From<&SessionConfig> for TrackingConfiguration {
    fn from(config: &SessionConfig) -> Self {
        Self {
            body_tracking: true,
            plane_detection: config.tracking.plane_detection,
            automatic_skeleton_scale_estimation: config.tracking.automatic_skeleton_scale_estimation,
        }
    }
}

/// The platform tracking session and device hooks.
pub trait SessionHost: Send {
    fn supports_body_tracking(&self) -> bool;

    fn run(&mut self, configuration: &TrackingConfiguration);

    fn pause(&mut self);

    /// Suppress (or restore) automatic screen locking
    fn set_idle_timer_disabled(&mut self, disabled: bool);
}

/// Where the character load stands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssetStatus {
    Loading,
    Loaded { entity: EntityId },
    Failed { reason: String },
}

/// Point-in-time view of a session, also returned as the teardown summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub character_position: Vector3D,
    pub character_orientation: Quaternion,
    pub character_pose_updates: u64,
    pub reality_position: Vector3D,
    pub character_link: LinkState,
    pub prop_link: LinkState,
    pub asset: AssetStatus,
    pub stats: DispatchStats,
    pub batches: u64,
}

/// All mutable state of one tracking session.
pub struct SessionContext {
    config: SessionConfig,
    host: Box<dyn SessionHost>,
    scene: Box<dyn SceneGraph>,
    root: SceneRoot,
    dispatcher: AnchorDispatcher,
    attachments: AttachmentStateMachine,
    asset: AssetStatus,
    batches: u64,
}

impl SessionContext {
    /// Start a session.
    ///
    /// Fails before any tracking begins if the configuration is invalid, the
    /// device cannot track bodies, or the authored scene cannot be loaded.
    /// On success the character load is already in flight.
    pub fn start(
        config: SessionConfig,
        mut host: Box<dyn SessionHost>,
        mut scene: Box<dyn SceneGraph>,
        description: &dyn SceneDescription,
        loader: &AssetLoader,
    ) -> Result<(Self, LoadTicket)> {
        config.validate()?;

        if !host.supports_body_tracking() {
            return Err(SessionError::UnsupportedCapability(
                "body tracking is not supported on this device".to_string(),
            ));
        }

        if config.session.disable_idle_timer {
            host.set_idle_timer_disabled(true);
        }

        let root = match SceneRoot::compose(&config.anchors, description, scene.as_mut()) {
            Ok(root) => root,
            Err(err) => {
                if config.session.disable_idle_timer {
                    host.set_idle_timer_disabled(false);
                }
                return Err(err);
            }
        };

        let mut attachments = AttachmentStateMachine::new(
            root.character().entity(),
            root.reality().entity(),
            root.prop().entity,
        );
        attachments.attach_prop(scene.as_mut());

        let tracking = TrackingConfiguration::from(&config);
        host.run(&tracking);
        info!(
            "Tracking session running (planes: {:?}, skeleton scale estimation: {})",
            tracking.plane_detection, tracking.automatic_skeleton_scale_estimation
        );

        let ticket =
            loader.load_character(&config.character.asset, config.character.scale_vector());

        let dispatcher = AnchorDispatcher::new(
            config.tracking.plane_policy,
            config.character.offset_vector(),
        );

        Ok((
            Self {
                config,
                host,
                scene,
                root,
                dispatcher,
                attachments,
                asset: AssetStatus::Loading,
                batches: 0,
            },
            ticket,
        ))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn root(&self) -> &SceneRoot {
        &self.root
    }

    pub fn attachments(&self) -> &AttachmentStateMachine {
        &self.attachments
    }

    pub fn asset_status(&self) -> &AssetStatus {
        &self.asset
    }

    pub fn anchors_added(&mut self, batch: &[AnchorEvent]) -> BatchReport {
        self.batches += 1;
        self.dispatcher.anchors_added(batch)
    }

    pub fn anchors_updated(&mut self, batch: &[AnchorEvent]) -> BatchReport {
        self.batches += 1;
        self.dispatcher.anchors_updated(
            batch,
            &mut self.root,
            &mut self.attachments,
            self.scene.as_mut(),
        )
    }

    pub fn handle(&mut self, callback: &TrackingCallback) -> BatchReport {
        match callback {
            TrackingCallback::AnchorsAdded(batch) => self.anchors_added(batch),
            TrackingCallback::AnchorsUpdated(batch) => self.anchors_updated(batch),
        }
    }

    /// Apply the one-shot loader outcome. A failure is logged and the
    /// session carries on without a character.
    pub fn asset_completed(&mut self, outcome: LoadOutcome) -> Option<AttachOutcome> {
        match outcome {
            Ok(character) => {
                info!(
                    "Loaded character '{}' ({} joints)",
                    character.name(),
                    character.skeleton().joint_count()
                );
                self.asset = AssetStatus::Loaded {
                    entity: character.entity(),
                };
                Some(self.attachments.character_loaded(character, self.scene.as_mut()))
            }
            Err(reason) => {
                let err = SessionError::AssetLoadFailure {
                    asset: self.config.character.asset.clone(),
                    reason: reason.clone(),
                };
                warn!("{}; continuing without character", err);
                self.asset = AssetStatus::Failed {
                    reason: reason.to_string(),
                };
                None
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let character = self.root.character();
        SessionSnapshot {
            character_position: character.position(),
            character_orientation: character.orientation(),
            character_pose_updates: character.pose_updates(),
            reality_position: self.root.reality().position(),
            character_link: self.attachments.character_link().state(),
            prop_link: self.attachments.prop_link().state(),
            asset: self.asset.clone(),
            stats: self.dispatcher.stats(),
            batches: self.batches,
        }
    }

    /// End the session: pause tracking, restore the idle timer and remove
    /// the anchors from the scene.
    pub fn teardown(self) -> SessionSnapshot {
        let mut summary = self.snapshot();
        if matches!(summary.asset, AssetStatus::Loading) {
            summary.asset = AssetStatus::Failed {
                reason: AssetError::Cancelled.to_string(),
            };
        }

        let Self {
            config,
            mut host,
            mut scene,
            root,
            ..
        } = self;

        host.pause();
        if config.session.disable_idle_timer {
            host.set_idle_timer_disabled(false);
        }
        root.dismantle(scene.as_mut());
        info!("Tracking session ended after {} batches", summary.batches);
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::AnchorId;
    use crate::scene::InMemoryScene;
    use crate::test_utils::{body_event, MockHost, ScriptedAssetSource, StaticSceneDescription};
    use std::sync::Arc;
    use std::time::Duration;

    fn start_with(
        host: &MockHost,
        scene: &InMemoryScene,
        source: ScriptedAssetSource,
    ) -> Result<(SessionContext, LoadTicket)> {
        SessionContext::start(
            SessionConfig::default(),
            Box::new(host.clone()),
            Box::new(scene.clone()),
            &StaticSceneDescription::boxed_prop(),
            &AssetLoader::new(Arc::new(source)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_device_is_fatal_before_tracking() {
        let host = MockHost::unsupported();
        let scene = InMemoryScene::new();
        let source = ScriptedAssetSource::rigged(Duration::ZERO);

        let err = start_with(&host, &scene, source.clone()).err().unwrap();

        assert!(matches!(err, SessionError::UnsupportedCapability(_)));
        assert_eq!(host.run_count(), 0);
        assert!(scene.anchor_names().is_empty());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(source.load_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_composes_scene_and_runs_host() {
        let host = MockHost::new();
        let scene = InMemoryScene::new();
        let (ctx, ticket) = start_with(&host, &scene, ScriptedAssetSource::rigged(Duration::ZERO)).unwrap();

        assert_eq!(host.run_count(), 1);
        assert!(host.idle_timer_disabled());
        let tracking = host.last_configuration().unwrap();
        assert!(tracking.body_tracking);
        assert_eq!(tracking.plane_detection, PlaneDetection::Horizontal);
        assert_eq!(ticket.asset(), "models/robot");

        let prop = ctx.root().prop().entity;
        assert_eq!(scene.parent_of(prop), Some(ctx.root().reality().entity()));
        assert!(ctx.snapshot().prop_link.is_attached());
        assert_eq!(ctx.snapshot().asset, AssetStatus::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_failure_keeps_body_tracking() {
        let host = MockHost::new();
        let scene = InMemoryScene::new();
        let (mut ctx, mut ticket) = start_with(
            &host,
            &scene,
            ScriptedAssetSource::failing(Duration::ZERO, AssetError::Io("disk".into())),
        )
        .unwrap();

        assert_eq!(ctx.asset_completed(ticket.completed().await), None);
        assert!(matches!(ctx.asset_status(), AssetStatus::Failed { .. }));

        let id = AnchorId::new();
        ctx.anchors_updated(&[body_event(id, Vector3D::new(0.0, 0.0, -1.0), Quaternion::IDENTITY)]);
        ctx.anchors_updated(&[body_event(id, Vector3D::new(0.0, 0.0, -2.0), Quaternion::IDENTITY)]);

        let snapshot = ctx.snapshot();
        assert_eq!(snapshot.character_position, Vector3D::new(0.0, 0.0, -2.0));
        assert_eq!(snapshot.character_pose_updates, 2);
        assert_eq!(snapshot.character_link, LinkState::Detached);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_scale_is_applied_to_loaded_character() {
        let scene = InMemoryScene::new();
        let mut config = SessionConfig::default();
        config.character.scale = [2.0, 2.0, 2.0];
        let (mut ctx, mut ticket) = SessionContext::start(
            config,
            Box::new(MockHost::new()),
            Box::new(scene.clone()),
            &StaticSceneDescription::boxed_prop(),
            &AssetLoader::new(Arc::new(ScriptedAssetSource::rigged(Duration::from_millis(50)))),
        )
        .unwrap();

        assert_eq!(
            ctx.asset_completed(ticket.completed().await),
            Some(AttachOutcome::AwaitingAnchor)
        );

        let AssetStatus::Loaded { entity } = ctx.asset_status().clone() else {
            panic!("character should be loaded");
        };
        assert_eq!(scene.scale_of(entity), Some(Vector3D::new(2.0, 2.0, 2.0)));
        assert_eq!(ctx.attachments().character().map(|c| c.scale()), Some(Vector3D::new(2.0, 2.0, 2.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_restores_host_and_scene() {
        let host = MockHost::new();
        let scene = InMemoryScene::new();
        let (ctx, ticket) = start_with(&host, &scene, ScriptedAssetSource::rigged(Duration::from_secs(1))).unwrap();
        drop(ticket);

        let summary = ctx.teardown();

        assert_eq!(host.pause_count(), 1);
        assert!(!host.idle_timer_disabled());
        assert!(scene.anchor_names().is_empty());
        assert!(matches!(summary.asset, AssetStatus::Failed { .. }));
    }
}
