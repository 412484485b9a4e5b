//! System-level modules
//!
//! - Lifecycle management (backend initialization)
//! - Logging

pub mod lifetime;
pub mod logging;

pub use lifetime::startup::{Backends, init_db};
pub use logging::init_logging;
