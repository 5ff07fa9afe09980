//! Contract between the dashboard core and the vector-map rendering surface.
//!
//! The surface is an external, stateful engine: every mutation is imperative,
//! order-sensitive, and may fail when an id is unknown. The core only talks
//! to it through [`RenderingSurface`] and never lets a [`SurfaceError`]
//! escape a component boundary.

pub mod error;
pub mod expr;
pub mod recording;
pub mod surface;

pub use error::*;
pub use expr::*;
pub use recording::*;
pub use surface::*;
