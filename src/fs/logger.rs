//! Console and file logger.
//!
//! This module implements the [`log`] crate's logging facade, writing log
//! messages to standard error and, optionally, to a file.
//!
//! # Usage
//!
//! Initialize the logger once at the start of your program:
//!
//! ```no_run
//! use log::{LevelFilter, info, warn};
//! use skittish::fs::logger;
//!
//! logger::init(LevelFilter::Debug, Some("skittish.log".as_ref())).expect("Logger init failed");
//!
//! info!("Program started");
//! warn!("Ultrasonic sensor silent for 100 readings");
//! ```
//!
//! # Log Output
//!
//! Each log entry includes:
//! - Log level (TRACE, DEBUG, INFO, WARN, ERROR)
//! - Timestamp (time since the logger was initialized)
//! - Target (module path)
//! - Message
//!
//! Example output:
//! ```text
//! INFO [830ms] skittish::behavior::controller - Hiding: object at 30.0 cm
//! WARN [5s 12ms] skittish::peripherals::servo - Servo Duty Error: PWM error on line 17: busy
//! ```

use std::{
    fs::{File, OpenOptions},
    io::{self, LineWriter, Write},
    path::Path,
    sync::{Mutex, OnceLock},
    time::{Duration, Instant},
};

use humantime::{FormattedDuration, format_duration};
use log::{LevelFilter, Metadata, Record, SetLoggerError};
use thiserror::Error;

/// Errors from [`init`].
#[derive(Debug, Error)]
pub enum LoggerError {
    /// The log file could not be created or truncated.
    #[error("cannot open log file {path}: {source}")]
    File {
        /// Path that was opened.
        path:   String,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Another logger was installed first.
    #[error(transparent)]
    AlreadySet(#[from] SetLoggerError),
}

/// A dual-output logger.
///
/// Writes log messages to standard error and, when a path was given to
/// [`init`], to that file. The file is created or truncated on init and
/// written through one whole line at a time.
pub struct SkittishLogger {
    started:     Instant,
    file_writer: Mutex<Option<LineWriter<File>>>,
}

impl SkittishLogger {
    fn new(file: Option<File>) -> Self {
        Self {
            started:     Instant::now(),
            file_writer: Mutex::new(file.map(LineWriter::new)),
        }
    }

    fn uptime(&self) -> FormattedDuration {
        format_duration(truncate_to_millis(self.started.elapsed()))
    }
}

fn truncate_to_millis(d: Duration) -> Duration { Duration::from_millis(d.as_millis() as u64) }

/// One formatted log line, newline included.
fn format_line(record: &Record, uptime: impl std::fmt::Display) -> String {
    format!(
        "{} [{}] {} - {}\n",
        record.level(),
        uptime,
        record.target(),
        record.args()
    )
}

impl log::Log for SkittishLogger {
    fn enabled(&self, metadata: &Metadata) -> bool { metadata.level() <= log::max_level() }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let log_line = format_line(record, self.uptime());

            eprint!("{}", log_line);

            if let Ok(mut writer_guard) = self.file_writer.lock() {
                if let Some(ref mut writer) = *writer_guard {
                    let _ = writer.write_all(log_line.as_bytes());
                }
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut writer_guard) = self.file_writer.lock() {
            if let Some(ref mut writer) = *writer_guard {
                let _ = writer.flush();
            }
        }
    }
}

static LOGGER: OnceLock<SkittishLogger> = OnceLock::new();

/// Initializes the global logger.
///
/// # Arguments
///
/// * `level` - The minimum log level to record.
/// * `file` - Optional path of a log file, truncated on open.
///
/// # Errors
///
/// Returns [`LoggerError::File`] if the log file cannot be opened, or
/// [`LoggerError::AlreadySet`] if a logger has already been set.
pub fn init(level: LevelFilter, file: Option<&Path>) -> Result<(), LoggerError> {
    let file = file
        .map(|path| {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .map_err(|source| LoggerError::File {
                    path: path.display().to_string(),
                    source,
                })
        })
        .transpose()?;
    let logger = LOGGER.get_or_init(|| SkittishLogger::new(file));
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}
