use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::errors::{AppError, AppResult};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// `timestamp - LEVEL - message`
pub fn format_record(record: &Record) -> String {
    format!(
        "{} - {} - {}",
        Local::now().format(TIMESTAMP_FORMAT),
        record.level(),
        record.args()
    )
}

/// Console output through env_logger plus a file that only keeps errors.
pub struct DualLogger {
    console: env_logger::Logger,
    file: Mutex<File>,
}

impl DualLogger {
    pub fn new(console: env_logger::Logger, file: File) -> Self {
        Self {
            console,
            file: Mutex::new(file),
        }
    }

    fn max_level(&self) -> LevelFilter {
        self.console.filter().max(LevelFilter::Error)
    }
}

impl Log for DualLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Error || self.console.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if self.console.matches(record) {
            self.console.log(record);
        }

        if record.level() <= Level::Error {
            match self.file.lock() {
                Ok(mut file) => {
                    if let Err(e) = writeln!(file, "{}", format_record(record)) {
                        eprintln!("Failed to write log file entry: {}", e);
                    }
                }
                Err(e) => eprintln!("Failed to acquire log file lock: {}", e),
            }
        }
    }

    fn flush(&self) {
        self.console.flush();
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

/// Console logger honoring `RUST_LOG`, `info` when unset.
pub fn console_logger() -> env_logger::Logger {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format(|buf, record| writeln!(buf, "{}", format_record(record)))
        .build()
}

/// Install the process-wide logger. Errors are appended to `log_path`.
pub fn init(log_path: &Path) -> AppResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let logger = DualLogger::new(console_logger(), file);
    let max_level = logger.max_level();

    log::set_boxed_logger(Box::new(logger))
        .map_err(|e| AppError::Config(format!("Logger already initialized: {}", e)))?;
    log::set_max_level(max_level);

    Ok(())
}
