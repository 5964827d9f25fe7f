/// Axis conversion and scale applied to imported geometry
use std::fmt;
use std::str::FromStr;

use nalgebra::{Matrix3, Matrix4, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::TransformError;

/// One of the six signed coordinate axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    #[serde(rename = "X")]
    X,
    #[serde(rename = "Y")]
    Y,
    #[serde(rename = "Z")]
    Z,
    #[serde(rename = "-X")]
    NegX,
    #[serde(rename = "-Y")]
    NegY,
    #[serde(rename = "-Z")]
    NegZ,
}

impl Axis {
    pub const ALL: [Axis; 6] = [Axis::X, Axis::Y, Axis::Z, Axis::NegX, Axis::NegY, Axis::NegZ];

    pub fn vector(self) -> Vector3<f32> {
        match self {
            Axis::X => Vector3::x(),
            Axis::Y => Vector3::y(),
            Axis::Z => Vector3::z(),
            Axis::NegX => -Vector3::x(),
            Axis::NegY => -Vector3::y(),
            Axis::NegZ => -Vector3::z(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
            Axis::NegX => "-X",
            Axis::NegY => "-Y",
            Axis::NegZ => "-Z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Axis {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Axis::ALL
            .into_iter()
            .find(|axis| axis.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TransformError::UnknownAxis(s.to_string()))
    }
}

/// Forward axis, up axis and uniform scale of the exporting tool
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    pub up: Axis,
    pub forward: Axis,
    pub scale: f32,
}

impl TransformConfig {
    pub fn new(up: Axis, forward: Axis, scale: f32) -> Self {
        Self { up, forward, scale }
    }

    /// The matrix baked into every mesh of one import pass
    pub fn matrix(&self) -> Result<Matrix4<f32>, TransformError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(TransformError::InvalidScale(self.scale));
        }
        let conversion = Transform::axis_conversion(self.forward, self.up)?;
        Ok(conversion.to_homogeneous() * Transform::scale_matrix(self.scale))
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            up: Axis::Y,
            forward: Axis::Z,
            scale: 0.001,
        }
    }
}

/// Transform builder for import matrices
pub struct Transform;

impl Transform {
    /// Rotation taking `forward` onto +Y and `up` onto +Z.
    ///
    /// The right-hand axis `forward x up` lands on +X, so the result is
    /// always a proper rotation.
    pub fn axis_conversion(forward: Axis, up: Axis) -> Result<Matrix3<f32>, TransformError> {
        let f = forward.vector();
        let u = up.vector();
        let right = f.cross(&u);
        if right.norm_squared() < f32::EPSILON {
            return Err(TransformError::ParallelAxes { forward, up });
        }

        // Rows are the source basis, so multiplying projects onto it.
        Ok(Matrix3::from_rows(&[
            right.transpose(),
            f.transpose(),
            u.transpose(),
        ]))
    }

    /// Create a uniform scale matrix
    pub fn scale_matrix(scale: f32) -> Matrix4<f32> {
        Matrix4::new_scaling(scale)
    }
}
