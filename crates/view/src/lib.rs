pub mod mode;
pub mod popup;
pub mod pulse;
pub mod view_state;

pub use mode::*;
pub use popup::*;
pub use pulse::*;
pub use view_state::*;
