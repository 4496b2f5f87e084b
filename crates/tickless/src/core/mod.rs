pub mod grid;
pub mod scene;
pub mod scheduler;
pub mod segments;
pub mod time;
pub mod world;
