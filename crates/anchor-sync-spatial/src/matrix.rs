//! Column-major pose matrices as delivered by the tracking subsystem

use super::{Quaternion, Vector3D};
use std::fmt;

/// Allowed drift of the rotation block from orthonormal.
const ORTHONORMAL_TOLERANCE: f32 = 1e-3;
/// Allowed drift of the bottom row from `(0, 0, 0, 1)`.
const AFFINE_TOLERANCE: f32 = 1e-4;

/// A 3x3 matrix stored column-major
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix3 {
    pub cols: [[f32; 3]; 3],
}

impl Matrix3 {
    pub const IDENTITY: Self = Self {
        cols: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Build from row-major nested arrays (reads naturally in source)
    pub fn from_rows(rows: [[f32; 3]; 3]) -> Self {
        let mut cols = [[0.0; 3]; 3];
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                cols[c][r] = *value;
            }
        }
        Self { cols }
    }

    /// Entry at `(row, col)`
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.cols[col][row]
    }

    pub fn column(&self, col: usize) -> Vector3D {
        Vector3D::from_array(self.cols[col])
    }

    pub fn determinant(&self) -> f32 {
        self.column(0).dot(&self.column(1).cross(&self.column(2)))
    }
}

/// Why a pose matrix cannot be turned into a scene transform
#[derive(Debug, Clone, PartialEq)]
pub enum PoseError {
    /// A component is NaN or infinite
    NonFinite,
    /// Bottom row is not `(0, 0, 0, 1)`
    NotAffine,
    /// Rotation block is singular, reflected, or not orthonormal
    DegenerateRotation { determinant: f32 },
}

impl fmt::Display for PoseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoseError::NonFinite => write!(f, "pose contains non-finite components"),
            PoseError::NotAffine => write!(f, "pose bottom row is not (0, 0, 0, 1)"),
            PoseError::DegenerateRotation { determinant } => write!(
                f,
                "pose rotation block is not a proper rotation (determinant {:.4})",
                determinant
            ),
        }
    }
}

impl std::error::Error for PoseError {}

/// A 4x4 affine pose (rotation + translation), column-major.
///
/// `columns[3]` holds the translation, mirroring how the tracking subsystem
/// lays out anchor transforms.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoseMatrix {
    pub columns: [[f32; 4]; 4],
}

impl PoseMatrix {
    pub const IDENTITY: Self = Self {
        columns: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn from_columns(columns: [[f32; 4]; 4]) -> Self {
        Self { columns }
    }

    /// Pure translation
    pub fn from_translation(translation: Vector3D) -> Self {
        Self::from_rotation_translation(Quaternion::IDENTITY, translation)
    }

    /// Compose a pose from an orientation and a translation
    pub fn from_rotation_translation(rotation: Quaternion, translation: Vector3D) -> Self {
        let r = rotation.normalize().to_rotation_matrix();
        let mut columns = Self::IDENTITY.columns;
        for (c, column) in columns.iter_mut().take(3).enumerate() {
            column[..3].copy_from_slice(&r.cols[c]);
        }
        columns[3] = [translation.x, translation.y, translation.z, 1.0];
        Self { columns }
    }

    /// Translation column
    pub fn translation(&self) -> Vector3D {
        let t = self.columns[3];
        Vector3D::new(t[0], t[1], t[2])
    }

    /// Upper-left 3x3 block
    pub fn rotation_block(&self) -> Matrix3 {
        let mut cols = [[0.0; 3]; 3];
        for (c, col) in cols.iter_mut().enumerate() {
            col.copy_from_slice(&self.columns[c][..3]);
        }
        Matrix3 { cols }
    }

    /// Check the matrix is a finite rigid transform
    pub fn validate(&self) -> Result<(), PoseError> {
        if self.columns.iter().flatten().any(|v| !v.is_finite()) {
            return Err(PoseError::NonFinite);
        }

        let bottom = [
            self.columns[0][3],
            self.columns[1][3],
            self.columns[2][3],
            self.columns[3][3] - 1.0,
        ];
        if bottom.iter().any(|v| v.abs() > AFFINE_TOLERANCE) {
            return Err(PoseError::NotAffine);
        }

        let block = self.rotation_block();
        let determinant = block.determinant();
        for i in 0..3 {
            for j in i..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                let actual = block.column(i).dot(&block.column(j));
                if (actual - expected).abs() > ORTHONORMAL_TOLERANCE {
                    return Err(PoseError::DegenerateRotation { determinant });
                }
            }
        }
        if determinant <= 0.0 {
            return Err(PoseError::DegenerateRotation { determinant });
        }

        Ok(())
    }
}

impl Default for PoseMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_translation_column() {
        let pose = PoseMatrix::from_translation(Vector3D::new(1.0, 0.0, 2.0));
        assert_eq!(pose.translation(), Vector3D::new(1.0, 0.0, 2.0));
        assert_eq!(pose.rotation_block(), Matrix3::IDENTITY);
        assert!(pose.validate().is_ok());
    }

    #[test]
    fn test_from_rows_is_column_major() {
        let m = Matrix3::from_rows([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        assert_eq!(m.get(0, 1), 2.0);
        assert_eq!(m.cols[1], [2.0, 5.0, 8.0]);
    }

    #[test]
    fn test_rotated_pose_validates() {
        let q = Quaternion::from_axis_angle(Vector3D::new(0.3, 1.0, -0.4), 2.0);
        let pose = PoseMatrix::from_rotation_translation(q, Vector3D::new(-3.0, 1.5, 0.25));
        assert!(pose.validate().is_ok());
        assert!((pose.rotation_block().determinant() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut pose = PoseMatrix::IDENTITY;
        pose.columns[3][1] = f32::NAN;
        assert_eq!(pose.validate(), Err(PoseError::NonFinite));
    }

    #[test]
    fn test_rejects_projective_row() {
        let mut pose = PoseMatrix::IDENTITY;
        pose.columns[0][3] = 0.5;
        assert_eq!(pose.validate(), Err(PoseError::NotAffine));
    }

    #[test]
    fn test_rejects_collapsed_and_mirrored_rotation() {
        let mut collapsed = PoseMatrix::IDENTITY;
        collapsed.columns[2] = [0.0, 0.0, 0.0, 0.0];
        assert!(matches!(
            collapsed.validate(),
            Err(PoseError::DegenerateRotation { .. })
        ));

        let mut mirrored = PoseMatrix::from_rotation_translation(
            Quaternion::from_axis_angle(Vector3D::UP, PI / 3.0),
            Vector3D::ZERO,
        );
        for v in mirrored.columns[0].iter_mut().take(3) {
            *v = -*v;
        }
        assert!(matches!(
            mirrored.validate(),
            Err(PoseError::DegenerateRotation { determinant }) if determinant < 0.0
        ));
    }
}
