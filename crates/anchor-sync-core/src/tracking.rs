//! The session loop: tracking callbacks and the loader outcome, on one task.
//!
//! The loader completes elsewhere and its outcome is cross-posted here, so
//! every write to the [`SessionContext`] happens on this loop.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Result, SessionError};
use crate::event::{AnchorEvent, TrackingCallback};
use crate::loader::LoadTicket;
use crate::session::{SessionContext, SessionSnapshot};

/// Sending half used by the tracking subsystem. Dropping every feed ends
/// the session.
#[derive(Debug, Clone)]
pub struct TrackingFeed {
    tx: mpsc::Sender<TrackingCallback>,
}

impl TrackingFeed {
    pub async fn anchors_added(&self, batch: Vec<AnchorEvent>) -> Result<()> {
        self.send(TrackingCallback::AnchorsAdded(batch)).await
    }

    pub async fn anchors_updated(&self, batch: Vec<AnchorEvent>) -> Result<()> {
        self.send(TrackingCallback::AnchorsUpdated(batch)).await
    }

    pub async fn send(&self, callback: TrackingCallback) -> Result<()> {
        self.tx
            .send(callback)
            .await
            .map_err(|_| SessionError::SessionClosed)
    }
}

pub struct TrackingLoop {
    ctx: SessionContext,
    ticket: LoadTicket,
    callbacks: mpsc::Receiver<TrackingCallback>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl TrackingLoop {
    /// Wrap a started session. Returns the loop, the feed for tracking
    /// callbacks, and a watch channel carrying the latest snapshot.
    pub fn new(
        ctx: SessionContext,
        ticket: LoadTicket,
    ) -> (Self, TrackingFeed, watch::Receiver<SessionSnapshot>) {
        let (tx, callbacks) = mpsc::channel(ctx.config().session.frame_channel_capacity);
        let (snapshots, snapshot_rx) = watch::channel(ctx.snapshot());
        (
            Self {
                ctx,
                ticket,
                callbacks,
                snapshots,
            },
            TrackingFeed { tx },
            snapshot_rx,
        )
    }

    /// Run on a fresh task
    pub fn spawn(self) -> JoinHandle<SessionSnapshot> {
        tokio::spawn(self.run())
    }

    /// Process until every feed is dropped, then tear the session down.
    pub async fn run(mut self) -> SessionSnapshot {
        loop {
            tokio::select! {
                biased;

                outcome = self.ticket.completed(), if self.ticket.is_pending() => {
                    self.ctx.asset_completed(outcome);
                }
                callback = self.callbacks.recv() => {
                    let Some(callback) = callback else {
                        debug!("Tracking feed closed");
                        break;
                    };
                    let report = self.ctx.handle(&callback);
                    if !report.errors.is_empty() {
                        warn!(
                            "{} of {} anchors dropped from batch",
                            report.errors.len(),
                            callback.events().len()
                        );
                    }
                }
            }
            self.snapshots.send_replace(self.ctx.snapshot());
        }

        let Self {
            ctx,
            mut ticket,
            snapshots,
            ..
        } = self;
        ticket.cancel();
        let summary = ctx.teardown();
        snapshots.send_replace(summary.clone());
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::LinkState;
    use crate::config::SessionConfig;
    use crate::event::AnchorId;
    use crate::loader::AssetLoader;
    use crate::scene::InMemoryScene;
    use crate::test_utils::{body_event, MockHost, ScriptedAssetSource, StaticSceneDescription};
    use anchor_sync_spatial::{Quaternion, Vector3D};
    use std::sync::Arc;
    use std::time::Duration;

    fn started() -> (TrackingLoop, TrackingFeed, watch::Receiver<SessionSnapshot>) {
        let (ctx, ticket) = SessionContext::start(
            SessionConfig::default(),
            Box::new(MockHost::new()),
            Box::new(InMemoryScene::new()),
            &StaticSceneDescription::boxed_prop(),
            &AssetLoader::new(Arc::new(ScriptedAssetSource::rigged(Duration::ZERO))),
        )
        .unwrap();
        TrackingLoop::new(ctx, ticket)
    }

    #[tokio::test(start_paused = true)]
    async fn test_closing_feed_returns_summary() {
        let (session, feed, snapshots) = started();
        let handle = session.spawn();

        feed.anchors_updated(vec![body_event(
            AnchorId::new(),
            Vector3D::new(0.0, 0.0, -1.5),
            Quaternion::IDENTITY,
        )])
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(snapshots.borrow().character_link, LinkState::Attached);

        drop(feed);
        let summary = handle.await.unwrap();
        assert_eq!(summary.character_link, LinkState::Attached);
        assert_eq!(summary.character_position, Vector3D::new(0.0, 0.0, -1.5));
        assert_eq!(summary.batches, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_errors_after_session_ends() {
        let (session, feed, _snapshots) = started();
        let handle = session.spawn();
        handle.abort();
        let _ = handle.await;

        let result = feed.anchors_added(Vec::new()).await;
        assert!(matches!(result, Err(SessionError::SessionClosed)));
    }
}
