//! Logging utilities for output and progress tracking
//!
//! This module provides utilities for logging, console output, and progress tracking.

pub mod console;
pub mod log;
pub mod progress;

pub use self::log::{Benchmark, log_operation_complete, log_operation_start, log_warning};
pub use self::progress::{create_spinner, finish_and_clear};
