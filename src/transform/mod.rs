//! Builders and decomposition for 4x4 homogeneous transforms.
//!
//! All matrices are column-major [glam::DMat4] values so the translation is stored in `w_axis`.
pub mod affine;
pub mod decompose;

pub use affine::{build_rotation, build_scale, build_translation, compose_trs};
pub use decompose::{
    decompose, rotation_mat4_to_euler_degrees, rotation_matrix_to_euler_degrees,
    validate_rotation, Decomposed,
};
