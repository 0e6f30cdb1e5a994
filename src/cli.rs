use crate::settings::RawSettings;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file to read instead of the default locations.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seconds between captures; non-positive values fall back to the default.
    #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
    pub interval: Option<i64>,

    /// Storage quota in megabytes; non-positive values fall back to the default.
    #[arg(long, value_name = "MB", allow_negative_numbers = true)]
    pub limit: Option<i64>,

    /// Directory where captures are stored.
    #[arg(long, value_name = "DIR")]
    pub path: Option<String>,

    /// Directory for the daily log files.
    #[arg(long = "log-dir", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Run a single capture cycle and exit.
    #[arg(long)]
    pub once: bool,

    /// Echo log entries to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Settings given on the command line, applied over the settings file.
    pub fn overrides(&self) -> RawSettings {
        RawSettings {
            interval: self.interval,
            limit: self.limit,
            path: self.path.clone(),
            log_dir: self.log_dir.clone(),
        }
    }
}
