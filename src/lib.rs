pub mod capture;
pub mod cli;
pub mod constants;
pub mod event_log;
pub mod quota;
pub mod scheduler;
pub mod settings;

use capture::PrimaryDisplay;
use clap::Parser;
use cli::Cli;
use event_log::{ErrorCode, EventLog};
use scheduler::Scheduler;
use settings::Settings;
use std::sync::Arc;

pub fn run() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "info" } else { "off" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    // The file is read before the log exists because it may move the log directory.
    let (raw, problems) = settings::gather(cli.config.as_deref(), cli.overrides());
    let log = Arc::new(EventLog::new(raw.log_dir()));
    log.info("started");
    for err in problems {
        log.error(ErrorCode::Settings, err.to_string());
    }

    let settings = Settings::resolve(&raw, &log);
    let scheduler = Scheduler::new(settings, Box::new(PrimaryDisplay), log);

    if cli.once {
        scheduler.run_cycles(1);
        return;
    }
    scheduler.run()
}
