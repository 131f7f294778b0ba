//! Local scene-graph transform and pose decomposition

use super::{PoseMatrix, Quaternion, Vector3D};

/// Split a pose into the position + orientation pair stored on scene nodes.
///
/// Position is the translation column; orientation comes from the upper-left
/// rotation block. The caller is expected to hand in a rigid transform
/// (see [`PoseMatrix::validate`]).
pub fn decompose(pose: &PoseMatrix) -> (Vector3D, Quaternion) {
    let position = pose.translation();
    let orientation = Quaternion::from_rotation_matrix(&pose.rotation_block());
    (position, orientation)
}

/// A complete 3D transform (position + rotation + scale)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub position: Vector3D,
    pub rotation: Quaternion,
    pub scale: Vector3D,
}

impl Transform {
    /// Identity transform (origin, no rotation, unit scale)
    pub fn identity() -> Self {
        Self {
            position: Vector3D::ZERO,
            rotation: Quaternion::IDENTITY,
            scale: Vector3D::ONE,
        }
    }

    pub fn from_position_rotation(position: Vector3D, rotation: Quaternion) -> Self {
        Self {
            position,
            rotation,
            scale: Vector3D::ONE,
        }
    }

    /// Rigid part of a pose matrix; scale is left at one
    pub fn from_pose(pose: &PoseMatrix) -> Self {
        let (position, rotation) = decompose(pose);
        Self::from_position_rotation(position, rotation)
    }

    /// Rigid pose matrix (scale is not baked in)
    pub fn to_pose(&self) -> PoseMatrix {
        PoseMatrix::from_rotation_translation(self.rotation, self.position)
    }

    /// Transform a point from local space to world space
    pub fn transform_point(&self, local: Vector3D) -> Vector3D {
        let scaled = Vector3D::new(
            local.x * self.scale.x,
            local.y * self.scale.y,
            local.z * self.scale.z,
        );
        self.position + self.rotation.rotate_vector(scaled)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_decompose_identity() {
        let (position, orientation) = decompose(&PoseMatrix::IDENTITY);
        assert_eq!(position, Vector3D::ZERO);
        assert_eq!(orientation, Quaternion::IDENTITY);
    }

    #[test]
    fn test_decompose_reproduces_rotation_block() {
        let rotations = [
            Quaternion::from_axis_angle(Vector3D::UP, PI / 6.0),
            Quaternion::from_axis_angle(Vector3D::RIGHT, -PI / 2.0),
            Quaternion::from_axis_angle(Vector3D::new(0.0, 1.0, 1.0), PI),
            Quaternion::from_axis_angle(Vector3D::new(2.0, -1.0, 0.5), 0.0001),
        ];

        for (i, q) in rotations.iter().enumerate() {
            let translation = Vector3D::new(i as f32, -0.5, 2.0);
            let pose = PoseMatrix::from_rotation_translation(*q, translation);
            let (position, orientation) = decompose(&pose);

            assert_eq!(position, translation);
            let rebuilt = orientation.to_rotation_matrix();
            let original = pose.rotation_block();
            for row in 0..3 {
                for col in 0..3 {
                    assert!((rebuilt.get(row, col) - original.get(row, col)).abs() < 1e-4);
                }
            }
        }
    }

    #[test]
    fn test_transform_point() {
        let mut t = Transform::identity();
        t.position = Vector3D::new(10.0, 0.0, 0.0);
        t.rotation = Quaternion::from_axis_angle(Vector3D::UP, PI / 2.0);

        let world = t.transform_point(Vector3D::BACK);
        assert!((world.x - 11.0).abs() < 1e-4);
        assert!(world.z.abs() < 1e-4);
    }

    #[test]
    fn test_pose_round_trip() {
        let t = Transform::from_position_rotation(
            Vector3D::new(1.0, 2.0, 3.0),
            Quaternion::from_axis_angle(Vector3D::UP, 0.75),
        );
        let back = Transform::from_pose(&t.to_pose());
        assert!((back.position - t.position).magnitude() < 1e-5);
        assert!(back.rotation.angle_to(&t.rotation) < 1e-3);
    }
}
