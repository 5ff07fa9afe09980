pub mod coverage;
pub mod geojson;
pub mod icon;
pub mod poi;

pub use coverage::*;
pub use geojson::*;
pub use icon::*;
pub use poi::*;
