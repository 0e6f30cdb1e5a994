use crate::constants::{
    DEFAULT_INTERVAL_SECS, DEFAULT_LIMIT_MB, DEFAULT_STORAGE_PATH, LOG_DIR_NAME,
    SETTINGS_FILE_NAME,
};
use crate::event_log::{process_base_dir, EventLog};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use toml::{Table, Value};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid value for '{key}' in settings file {path}: expected {expected}, found {found}")]
    InvalidValue {
        path: String,
        key: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

/// Settings as written by the user, before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSettings {
    pub interval: Option<i64>,
    pub limit: Option<i64>,
    pub path: Option<String>,
    pub log_dir: Option<PathBuf>,
}

/// Settings file contents plus every key that had to be ignored.
#[derive(Debug, Default)]
pub struct FileSettings {
    pub raw: RawSettings,
    pub problems: Vec<SettingsError>,
}

impl FileSettings {
    /// Read each known key on its own. A key of the wrong type is reported
    /// and treated as absent; the other keys keep their values.
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self, SettingsError> {
        let table = content
            .parse::<Table>()
            .map_err(|source| SettingsError::Parse {
                path: origin.display().to_string(),
                source,
            })?;

        let mut reader = KeyReader {
            table: &table,
            origin,
            problems: Vec::new(),
        };
        let raw = RawSettings {
            interval: reader.take("interval", "an integer", Value::as_integer),
            limit: reader.take("limit", "an integer", Value::as_integer),
            path: reader.take("path", "a string", |v| v.as_str().map(str::to_string)),
            log_dir: reader.take("log_dir", "a string", |v| v.as_str().map(PathBuf::from)),
        };
        Ok(FileSettings {
            raw,
            problems: reader.problems,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    /// Load the settings file, if there is one. An explicit path must exist;
    /// the default locations are skipped when absent.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_locations().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }
}

struct KeyReader<'a> {
    table: &'a Table,
    origin: &'a Path,
    problems: Vec<SettingsError>,
}

impl KeyReader<'_> {
    fn take<T>(
        &mut self,
        key: &'static str,
        expected: &'static str,
        convert: impl Fn(&Value) -> Option<T>,
    ) -> Option<T> {
        let value = self.table.get(key)?;
        let converted = convert(value);
        if converted.is_none() {
            self.problems.push(SettingsError::InvalidValue {
                path: self.origin.display().to_string(),
                key,
                expected,
                found: value.type_str(),
            });
        }
        converted
    }
}

impl RawSettings {
    /// Values set in `overrides` replace the ones in `self`.
    pub fn merge(self, overrides: RawSettings) -> Self {
        RawSettings {
            interval: overrides.interval.or(self.interval),
            limit: overrides.limit.or(self.limit),
            path: overrides.path.or(self.path),
            log_dir: overrides.log_dir.or(self.log_dir),
        }
    }

    /// Log directory requested by the user, or `log` beside the executable.
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| process_base_dir().join(LOG_DIR_NAME))
    }
}

/// Settings file merged with command line overrides, plus the problems found
/// in the file so they can be logged once the log directory is known. A file
/// that cannot be read or parsed contributes nothing.
pub fn gather(explicit: Option<&Path>, overrides: RawSettings) -> (RawSettings, Vec<SettingsError>) {
    let file = FileSettings::discover(explicit).unwrap_or_else(|err| FileSettings {
        raw: RawSettings::default(),
        problems: vec![err],
    });
    (file.raw.merge(overrides), file.problems)
}

fn default_locations() -> Vec<PathBuf> {
    let mut paths = vec![process_base_dir().join(SETTINGS_FILE_NAME)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("screenshoter").join("config.toml"));
    }
    paths
}

/// Resolved settings, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub interval_secs: u64,
    pub limit_mb: u64,
    pub storage_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            interval_secs: DEFAULT_INTERVAL_SECS,
            limit_mb: DEFAULT_LIMIT_MB,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
        }
    }
}

impl Settings {
    /// Apply defaults to missing, non-positive or empty values and log the result.
    pub fn resolve(raw: &RawSettings, log: &EventLog) -> Self {
        let defaults = Settings::default();

        let interval_secs = positive(raw.interval).unwrap_or(defaults.interval_secs);
        log.info(format!("set interval = {interval_secs} sec"));

        let limit_mb = positive(raw.limit).unwrap_or(defaults.limit_mb);
        log.info(format!("set storage = {limit_mb} Mb"));

        let storage_path = raw
            .path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.storage_path);
        log.info(format!("set path = {}", storage_path.display()));

        Settings {
            interval_secs,
            limit_mb,
            storage_path,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn positive(value: Option<i64>) -> Option<u64> {
    value.filter(|v| *v > 0).map(|v| v as u64)
}
