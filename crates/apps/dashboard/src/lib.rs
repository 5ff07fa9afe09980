pub mod bootstrap;
pub mod config;
pub mod controller;
pub mod interaction;

pub use bootstrap::*;
pub use config::*;
pub use controller::*;
pub use interaction::*;
