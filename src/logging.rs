/*!
 * Console logger.
 *
 * Colored, timestamped lines on stderr. Embedding applications that install
 * their own `log` backend simply skip `EngineLogger::init`.
 */

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;

use crate::app_config::LogLevel;

// @struct: stderr logger with ANSI colors per level
pub struct EngineLogger {
    level: LevelFilter,
}

impl EngineLogger {
    // @creates: New logger with specified level
    pub fn new(level: LevelFilter) -> Self {
        EngineLogger { level }
    }

    // @initializes: Global logger
    pub fn init(level: LogLevel) -> Result<(), SetLoggerError> {
        let filter = level.to_level_filter();
        log::set_boxed_logger(Box::new(EngineLogger::new(filter)))?;
        log::set_max_level(filter);
        Ok(())
    }

    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }

    /// Format one record the way it is printed, without colors
    pub fn format_plain(record: &Record) -> String {
        format!("{:<5} [{}] {}", record.level(), record.target(), record.args())
    }
}

impl Log for EngineLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                Self::format_plain(record)
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}
