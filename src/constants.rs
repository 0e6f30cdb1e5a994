//! Centralized constants for format strings, defaults and units.

/// Capture file name pattern (yyyy_MM_dd__HH_mm_ss.png).
pub const CAPTURE_FILE_FORMAT: &str = "%Y_%m_%d__%H_%M_%S.png";

/// Daily log file name pattern (yyyyMMdd.txt).
pub const LOG_FILE_FORMAT: &str = "%Y%m%d.txt";

/// Timestamp at the start of every log line.
pub const LOG_TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Name of the log directory beside the executable.
pub const LOG_DIR_NAME: &str = "log";

/// Settings file looked up beside the executable.
pub const SETTINGS_FILE_NAME: &str = "screenshoter.toml";

/// Seconds between capture cycles when unset or non-positive.
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Storage quota in megabytes when unset or non-positive.
pub const DEFAULT_LIMIT_MB: u64 = 20;

/// Storage directory when unset or empty.
#[cfg(windows)]
pub const DEFAULT_STORAGE_PATH: &str = r"C:\temp";
#[cfg(not(windows))]
pub const DEFAULT_STORAGE_PATH: &str = "/tmp";

pub const BYTES_PER_KB: u64 = 1024;
pub const BYTES_PER_MB: u64 = 1024 * 1024;
pub const KB_PER_MB: u64 = 1024;
