//! Append-only daily text log shared by every component.

use crate::constants::{LOG_FILE_FORMAT, LOG_TIMESTAMP_FORMAT};
use chrono::Local;
use parking_lot::Mutex;
use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Error template written to the log file. Kept verbatim for format compatibility.
const ERROR_TEMPLATE_PREFIX: &str = "Ошибка";

/// Numeric codes that identify which component failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Capture = 1,
    QuotaEnforcement = 2,
    SizeMeasurement = 3,
    Settings = 4,
}

impl ErrorCode {
    pub fn value(self) -> u16 {
        self as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Info => "[INFO]",
            Level::Error => "[ERROR]",
        }
    }
}

/// Whether a log call reached the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutcome {
    Written,
    Dropped,
}

#[derive(Debug)]
pub struct EventLog {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl EventLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        EventLog {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn info(&self, message: impl AsRef<str>) -> LogOutcome {
        let message = message.as_ref();
        log::info!("{message}");
        self.add(Level::Info, message)
    }

    pub fn error(&self, code: ErrorCode, message: impl AsRef<str>) -> LogOutcome {
        let message = format_error(code, message.as_ref());
        log::error!("{message}");
        self.add(Level::Error, &message)
    }

    fn add(&self, level: Level, message: &str) -> LogOutcome {
        let _guard = self.lock.lock();
        match self.append(level, message) {
            Ok(()) => LogOutcome::Written,
            Err(_) => LogOutcome::Dropped,
        }
    }

    fn append(&self, level: Level, message: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let now = Local::now();
        let path = self.dir.join(now.format(LOG_FILE_FORMAT).to_string());
        let line = format!(
            "{} {} {}\r\n",
            now.format(LOG_TIMESTAMP_FORMAT),
            level.tag(),
            message
        );
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())
    }
}

fn format_error(code: ErrorCode, text: &str) -> String {
    format!("{ERROR_TEMPLATE_PREFIX} {:04}: {text}", code.value())
}

/// Directory of the running executable, or the working directory when that
/// cannot be determined.
pub fn process_base_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
impl EventLog {
    /// Every daily file in the log directory, oldest first, concatenated.
    pub(crate) fn contents(&self) -> String {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)
            .map(|entries| entries.filter_map(Result::ok).map(|e| e.path()).collect())
            .unwrap_or_default();
        files.sort();
        files
            .iter()
            .filter_map(|path| fs::read_to_string(path).ok())
            .collect()
    }
}
