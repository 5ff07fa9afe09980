pub mod descriptor;
pub mod extrusion;
pub mod filter;
pub mod ids;
pub mod ramp;
pub mod reconciler;

pub use descriptor::*;
pub use extrusion::*;
pub use filter::*;
pub use ramp::*;
pub use reconciler::*;
