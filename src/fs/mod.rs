//! Filesystem utilities.
//!
//! # Logging
//!
//! The `logger` submodule provides a logger that writes to standard error
//! and, optionally, to a log file. A file is useful when the robot runs
//! headless and the console is not being watched.
//!
//! # Example
//!
//! ```no_run
//! use log::{LevelFilter, info};
//! use skittish::fs::logger;
//!
//! // Initialize the logger at program start
//! logger::init(LevelFilter::Debug, None).expect("Failed to initialize logger");
//!
//! // Now you can use standard logging macros
//! info!("Robot initialized successfully");
//! ```

/// Console and file logging.
///
/// Provides a logger implementation that writes to both the console
/// and an optional file.
pub mod logger;
