//! anchor-sync: keeps a body-tracked character and a surface-placed prop
//! aligned with the anchors of an AR tracking session.
//!
//! This crate re-exports the workspace:
//! - [`spatial`]: vectors, quaternions and 4x4 pose decomposition
//! - the session engine from `anchor-sync-core`

pub use anchor_sync_core::*;
pub use anchor_sync_spatial as spatial;
