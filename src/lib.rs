//! Joint transform resolution for rigged avatar skeletons.
//!
//! A [JointHierarchy] composes each joint's local pose with its ancestors into a world
//! transform, checks the result against the recorded bind pose, and caches it. Custom
//! shapes are local offsets layered on top of those world transforms and can be loaded
//! from and exported back to JSON.
pub mod convert;
pub mod error;
pub mod export;
pub mod logging;
pub mod rig;
pub mod transform;

pub use convert::rig::{parse_rig_file, parse_rig_str, Rig, RigDocument};
pub use convert::shapes::{load_shapes, load_shapes_file, parse_shapes_str, ShapeRecord};
pub use error::{NameKind, Result, RigError};
pub use export::shapes::{
    export_shapes, export_shapes_to_file, export_shapes_to_json, ShapeExportConfig,
};
pub use rig::{ControllerIndex, ControllerRecord, Joint, JointHierarchy, JointRecord};
