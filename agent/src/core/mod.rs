//! Crate-wide infrastructure: constants and logging

pub mod constants;
pub mod logging;

pub use logging::init_logging;
