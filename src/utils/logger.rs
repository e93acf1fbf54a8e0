//! Logger utility for application-wide logging
//!
//! This module provides a logger implementation for the standard log
//! crate that prints to stderr and can also append to a log file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use log::{Log, Record, Metadata, LevelFilter};

/// Custom logger implementation
pub struct Logger {
    /// File handle for log output
    file: Mutex<Option<File>>,
    /// Most verbose level that is written
    level: LevelFilter,
}

impl Logger {
    /// Creates a logger that only prints to stderr
    pub fn console(level: LevelFilter) -> Self {
        Logger { file: Mutex::new(None), level }
    }

    /// Creates a new logger instance that also appends to `log_file`
    ///
    /// # Arguments
    ///
    /// * `log_file` - Path to the log file
    /// * `level` - Most verbose level that is written
    ///
    /// # Returns
    ///
    /// A new Logger instance or an error if the file cannot be opened
    pub fn with_file(log_file: impl AsRef<Path>, level: LevelFilter) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(log_file.as_ref())?;
        Ok(Logger {
            file: Mutex::new(Some(file)),
            level,
        })
    }

    /// Writes one line to the log file, if there is one
    ///
    /// # Arguments
    ///
    /// * `message` - The message to log
    pub fn log_line(&self, message: &str) -> io::Result<()> {
        let mut guard = self.file.lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        if let Some(file) = guard.as_mut() {
            writeln!(file, "{}", message)?;
            file.flush()?;
        }
        Ok(())
    }

    /// Installs `logger` as the global logger
    ///
    /// Only the first call has an effect.
    pub fn init_global_logger(logger: Logger) {
        let level = logger.level;
        if log::set_boxed_logger(Box::new(logger)).is_err() {
            eprintln!("Warning: Global logger was already initialized");
            return;
        }
        log::set_max_level(level);
    }

    /// Level for a count of `-v` flags, or errors only when `quiet`
    pub fn level_for(verbosity: u8, quiet: bool) -> LevelFilter {
        if quiet {
            return LevelFilter::Error;
        }
        match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

// Implement the Log trait to make our Logger work with the log crate
impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("[{}] {}", record.level(), record.args());
            let _ = self.log_line(&message);

            // Also print to console
            eprintln!("{}", message);
        }
    }

    fn flush(&self) {
        // Already flushing in log_line
    }
}
