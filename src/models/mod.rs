pub mod config;
pub mod event;
pub mod profile;
pub mod proxy;
pub mod stats;
pub mod tool;

pub use config::*;
pub use event::CoreEvent;
pub use profile::*;
pub use proxy::*;
pub use stats::*;
pub use tool::*;
