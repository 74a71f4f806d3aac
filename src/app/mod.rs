//! Application module
//!
//! Command-line level concerns: process settings, logging setup and
//! turning errors into exit codes.

pub mod config;
pub mod error_handling;
pub mod logging;

pub use config::AppConfig;
pub use error_handling::{handle_fatal_error, report_error};
pub use logging::init_logging;
