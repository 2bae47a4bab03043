//! Utility functions

pub mod log_gate;
mod sanitize;

pub use log_gate::{ConsoleGate, set_bar_active};
pub use sanitize::sanitize_filename;
