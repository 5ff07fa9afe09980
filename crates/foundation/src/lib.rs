pub mod color;
pub mod geometry;
pub mod time;

// Foundation crate: small, well-tested primitives only.
pub use color::*;
pub use geometry::*;
pub use time::*;
