pub mod rig;
pub mod shapes;
