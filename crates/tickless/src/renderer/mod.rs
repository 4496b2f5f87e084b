pub mod instance;
pub mod traits;

// Re-export key types for convenient access
pub use instance::{DebugLine, RenderBuffer, RenderInstance};
pub use traits::{Rect, Renderer};
