//! anchor-sync-spatial: geometric primitives for anchor synchronization
//!
//! Uses a right-handed coordinate system, matching the tracking subsystem:
//! - X: Right (+) / Left (-)
//! - Y: Up (+) / Down (-)
//! - Z: Toward the viewer (+) / Away (-)
//!
//! Poses arrive as column-major 4x4 affine matrices ([`PoseMatrix`]) and are
//! split into the position + orientation pair the scene graph stores
//! ([`decompose`]).

mod matrix;
mod quaternion;
mod transform;
mod vector3d;

pub use matrix::{Matrix3, PoseError, PoseMatrix};
pub use quaternion::Quaternion;
pub use transform::{decompose, Transform};
pub use vector3d::Vector3D;
