pub mod debounce;
pub mod frame;
pub mod ticker;
pub mod timer_queue;

pub use debounce::*;
pub use frame::*;
pub use ticker::*;
pub use timer_queue::*;
