//! Request handlers.

pub mod health;
pub mod render;
pub mod timeline;

pub use health::*;
pub use render::*;
pub use timeline::*;
