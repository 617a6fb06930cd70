use glam::{DMat4, DVec3};

/// Homogeneous translation matrix with `v` in the last column
pub fn build_translation(v: DVec3) -> DMat4 {
    DMat4::from_translation(v)
}

/// Homogeneous scale matrix with `v` on the diagonal
pub fn build_scale(v: DVec3) -> DMat4 {
    DMat4::from_scale(v)
}

/// Rotation from Euler angles in degrees.
///
/// The X rotation is applied first, then Y, then Z, so the resulting matrix is `Rz * Ry * Rx`.
pub fn build_rotation(degrees: DVec3) -> DMat4 {
    let radians = DVec3::new(
        degrees.x.to_radians(),
        degrees.y.to_radians(),
        degrees.z.to_radians(),
    );
    DMat4::from_rotation_z(radians.z)
        * DMat4::from_rotation_y(radians.y)
        * DMat4::from_rotation_x(radians.x)
}

/// `translate * rotate * scale`, the pose convention shared by joints and custom shapes
pub fn compose_trs(translation: DVec3, rotation_degrees: DVec3, scale: DVec3) -> DMat4 {
    build_translation(translation) * build_rotation(rotation_degrees) * build_scale(scale)
}
