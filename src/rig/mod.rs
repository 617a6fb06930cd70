pub mod controller;
pub mod hierarchy;
pub mod joint;

pub use controller::{ControllerIndex, ControllerRecord, EXPRESSION_TAG};
pub use hierarchy::{JointHierarchy, WORLD_POSITION_TOLERANCE};
pub use joint::{short_name, Joint, JointRecord, ParentField};
