//! Drives an anchor-sync session on the desktop.
//!
//! The simulator stands in for the device: it plays a tracking feed into a
//! [`TrackingLoop`] on its real-time schedule, lets the character load with a
//! configurable latency, and returns the session summary once the feed ends.

pub mod feed;
pub mod platform;
pub mod script;

use anchor_sync_core::{
    AssetLoader, InMemoryScene, SessionConfig, SessionContext, SessionSnapshot, TrackingLoop,
};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::platform::{AuthoredScene, SimulatedAssetSource, SimulatedHost};
use crate::script::TimedFrame;

#[derive(Debug, Clone)]
pub struct SimOptions {
    pub asset_delay: Duration,
    pub fail_asset: bool,
    pub body_tracking: bool,
    /// Time to keep the session open after the last frame
    pub linger: Duration,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            asset_delay: Duration::from_millis(500),
            fail_asset: false,
            body_tracking: true,
            linger: Duration::from_millis(100),
        }
    }
}

/// Play `frames` through a fresh session and return its teardown summary.
///
/// Errors only for failures that prevent the session from starting.
pub async fn run(
    config: SessionConfig,
    options: SimOptions,
    frames: Vec<TimedFrame>,
) -> Result<SessionSnapshot> {
    let source = if options.fail_asset {
        SimulatedAssetSource::missing(options.asset_delay)
    } else {
        SimulatedAssetSource::new(options.asset_delay)
    };
    let scene = InMemoryScene::new();

    let (ctx, ticket) = SessionContext::start(
        config,
        Box::new(SimulatedHost::new(options.body_tracking)),
        Box::new(scene.clone()),
        &AuthoredScene::toy_box(),
        &AssetLoader::new(Arc::new(source)),
    )?;
    info!("Scene anchors: {:?}", scene.anchor_names());

    let (session, feed, snapshots) = TrackingLoop::new(ctx, ticket);
    let handle = session.spawn();

    let start = Instant::now();
    let total = frames.len();
    for frame in frames {
        sleep_until(start + frame.at).await;
        feed.send(frame.callback).await?;
    }
    debug!("Delivered {} frames", total);

    sleep_until(Instant::now() + options.linger).await;
    {
        let latest = snapshots.borrow();
        debug!(
            "Before teardown: character link {:?}, asset {:?}",
            latest.character_link, latest.asset
        );
    }

    drop(feed);
    Ok(handle.await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{walking_feed, WalkOptions};
    use anchor_sync_core::{AssetStatus, LinkState, SessionError};

    fn short_walk() -> Vec<TimedFrame> {
        walking_feed(WalkOptions {
            frames: 60,
            ..WalkOptions::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_walk_attaches_character() {
        let summary = run(SessionConfig::default(), SimOptions::default(), short_walk())
            .await
            .unwrap();

        assert_eq!(summary.character_link, LinkState::Attached);
        assert_eq!(summary.prop_link, LinkState::Attached);
        assert!(matches!(summary.asset, AssetStatus::Loaded { .. }));
        assert_eq!(summary.stats.body_updates, 60);
        assert!(summary.stats.ignored > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_asset_is_not_fatal() {
        let options = SimOptions {
            fail_asset: true,
            ..SimOptions::default()
        };
        let summary = run(SessionConfig::default(), options, short_walk())
            .await
            .unwrap();

        assert_eq!(summary.character_link, LinkState::Detached);
        assert!(matches!(summary.asset, AssetStatus::Failed { .. }));
        assert_eq!(summary.stats.body_updates, 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_body_tracking_is_fatal() {
        let options = SimOptions {
            body_tracking: false,
            ..SimOptions::default()
        };
        let err = run(SessionConfig::default(), options, short_walk())
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<SessionError>(),
            Some(SessionError::UnsupportedCapability(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_asset_is_cancelled_at_teardown() {
        let options = SimOptions {
            asset_delay: Duration::from_secs(30),
            ..SimOptions::default()
        };
        let summary = run(SessionConfig::default(), options, short_walk())
            .await
            .unwrap();

        assert_eq!(summary.character_link, LinkState::Detached);
        assert_eq!(
            summary.asset,
            AssetStatus::Failed {
                reason: anchor_sync_core::AssetError::Cancelled.to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_bundled_script() {
        let frames = crate::script::Script::from_toml_str(include_str!(
            "../scripts/body_before_asset.toml"
        ))
        .unwrap()
        .into_frames();

        let summary = run(SessionConfig::default(), SimOptions::default(), frames)
            .await
            .unwrap();

        assert_eq!(summary.character_link, LinkState::Attached);
        assert_eq!(summary.reality_position, anchor_sync_spatial::Vector3D::new(1.0, 0.0, 2.0));
        assert_eq!(summary.character_position, anchor_sync_spatial::Vector3D::new(0.7, 0.0, -2.3));
        assert_eq!(summary.stats.body_updates, 4);
        assert_eq!(summary.stats.ignored, 1);
    }
}
