pub mod collider;
pub mod entity;
pub mod kinematics;
pub mod sprite;
pub mod tile;
