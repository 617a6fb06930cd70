use glam::{DMat3, DMat4, DVec3};

use crate::error::{Result, RigError};
use crate::transform::affine::{build_scale, build_translation};

/// Maximum deviation from orthonormality accepted by [rotation_matrix_to_euler_degrees]
pub const ROTATION_TOLERANCE: f64 = 1e-6;

/// Below this magnitude of `sqrt(r00^2 + r10^2)` the rotation is treated as gimbal locked
const SINGULAR_THRESHOLD: f64 = 1e-6;

/// Translation, rotation, and scale matrices recovered from an affine transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposed {
    pub translation: DMat4,
    pub rotation: DMat4,
    pub scale: DMat4,
}

impl Decomposed {
    pub fn translation_vector(&self) -> DVec3 {
        self.translation.w_axis.truncate()
    }

    pub fn scale_vector(&self) -> DVec3 {
        DVec3::new(self.scale.x_axis.x, self.scale.y_axis.y, self.scale.z_axis.z)
    }

    /// Recompose as `translation * rotation * scale`
    pub fn recompose(&self) -> DMat4 {
        self.translation * self.rotation * self.scale
    }
}

/// Split `m` into translation, rotation, and scale matrices.
///
/// Scale is the length of each basis column, so a zero length axis can't be
/// normalized and is reported as [RigError::DegenerateScale].
pub fn decompose(m: &DMat4) -> Result<Decomposed> {
    let translation = m.w_axis.truncate();

    let x_axis = m.x_axis.truncate();
    let y_axis = m.y_axis.truncate();
    let z_axis = m.z_axis.truncate();
    let scale = DVec3::new(x_axis.length(), y_axis.length(), z_axis.length());

    if !scale.is_finite() || scale.min_element() <= f64::EPSILON {
        return Err(RigError::DegenerateScale {
            scale: scale.to_array(),
        });
    }

    let rotation = DMat3::from_cols(x_axis / scale.x, y_axis / scale.y, z_axis / scale.z);

    Ok(Decomposed {
        translation: build_translation(translation),
        rotation: DMat4::from_mat3(rotation),
        scale: build_scale(scale),
    })
}

/// Check that `r` is orthonormal with a positive unit determinant
pub fn validate_rotation(r: &DMat3) -> Result<()> {
    let should_be_identity = r.transpose() * *r;
    let deviation = (should_be_identity - DMat3::IDENTITY)
        .to_cols_array()
        .iter()
        .map(|v| v * v)
        .sum::<f64>()
        .sqrt();
    let determinant = r.determinant();

    if deviation.is_nan()
        || deviation >= ROTATION_TOLERANCE
        || (determinant - 1.0).abs() >= ROTATION_TOLERANCE
    {
        return Err(RigError::DegenerateRotation {
            deviation,
            determinant,
        });
    }
    Ok(())
}

/// Euler angles in degrees such that `build_rotation(angles)` reproduces `r`.
pub fn rotation_matrix_to_euler_degrees(r: &DMat3) -> Result<DVec3> {
    validate_rotation(r)?;

    // r[row][col] in the usual notation; glam stores columns.
    let r00 = r.x_axis.x;
    let r10 = r.x_axis.y;
    let r20 = r.x_axis.z;
    let r11 = r.y_axis.y;
    let r21 = r.y_axis.z;
    let r12 = r.z_axis.y;
    let r22 = r.z_axis.z;

    let sy = (r00 * r00 + r10 * r10).sqrt();

    let (x, y, z) = if sy >= SINGULAR_THRESHOLD {
        (r21.atan2(r22), (-r20).atan2(sy), r10.atan2(r00))
    } else {
        ((-r12).atan2(r11), (-r20).atan2(sy), 0.0)
    };

    Ok(DVec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees()))
}

/// [rotation_matrix_to_euler_degrees] on the upper-left 3x3 block of a homogeneous matrix
pub fn rotation_mat4_to_euler_degrees(m: &DMat4) -> Result<DVec3> {
    rotation_matrix_to_euler_degrees(&DMat3::from_mat4(*m))
}
