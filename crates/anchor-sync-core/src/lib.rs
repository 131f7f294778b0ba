//! anchor-sync-core: keeps a body-tracked character and a surface-placed
//! prop aligned with the anchors reported by an AR tracking session.
//!
//! - **Loader**: one-shot, non-blocking load of the rigged character
//! - **Dispatcher**: classifies added/updated anchors and writes node poses
//! - **Attachment**: re-parents each visual exactly once, whichever of
//!   "anchor seen" and "asset loaded" happens first
//! - **Composition**: owns the character and reality anchor nodes
//! - **Session / tracking loop**: explicit per-session context driven from a
//!   single task, with the loader outcome cross-posted onto it
//!
//! # Usage
//!
//! ```ignore
//! use anchor_sync_core::{AssetLoader, SessionConfig, SessionContext, TrackingLoop};
//!
//! let loader = AssetLoader::new(asset_source);
//! let (ctx, ticket) = SessionContext::start(config, host, scene, &description, &loader)?;
//! let (session, feed, snapshots) = TrackingLoop::new(ctx, ticket);
//! let handle = session.spawn();
//!
//! feed.anchors_added(batch).await?;
//! ```

pub mod attachment;
pub mod composition;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod loader;
pub mod scene;
pub mod session;
pub mod test_utils;
pub mod tracking;

pub use attachment::{AttachOutcome, AttachmentLink, AttachmentStateMachine, LinkKind, LinkState};
pub use composition::{AuthoredProp, SceneDescription, SceneRoot};
pub use config::{PlaneDetection, PlanePolicy, SessionConfig};
pub use dispatcher::{AnchorDispatcher, BatchReport, DispatchStats};
pub use error::{AssetError, Result, SessionError};
pub use event::{AnchorEvent, AnchorId, AnchorKind, PlaneAlignment, PlaneGeometry, TrackingCallback};
pub use loader::{AssetLoader, AssetSource, LoadOutcome, LoadTicket, LoadedEntity, RiggedCharacter, Skeleton};
pub use scene::{AnchorNode, AnchorRole, EntityId, InMemoryScene, SceneGraph};
pub use session::{AssetStatus, SessionContext, SessionHost, SessionSnapshot, TrackingConfiguration};
pub use tracking::{TrackingFeed, TrackingLoop};
