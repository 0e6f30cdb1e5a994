use crate::capture::{Capturer, ScreenSource};
use crate::event_log::EventLog;
use crate::quota::{enforce_quota, QuotaReport};
use crate::settings::Settings;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

/// Result of one enforce-quota then capture cycle.
#[derive(Debug)]
pub struct CycleOutcome {
    pub quota: QuotaReport,
    pub capture: Option<PathBuf>,
}

pub struct Scheduler {
    settings: Settings,
    capturer: Capturer,
    log: Arc<EventLog>,
}

impl Scheduler {
    pub fn new(settings: Settings, source: Box<dyn ScreenSource>, log: Arc<EventLog>) -> Self {
        Scheduler {
            capturer: Capturer::new(source, Arc::clone(&log)),
            settings,
            log,
        }
    }

    pub fn run_cycle(&self) -> CycleOutcome {
        let quota = enforce_quota(&self.settings.storage_path, self.settings.limit_mb, &self.log);
        let capture = self.capturer.capture(&self.settings.storage_path);
        CycleOutcome { quota, capture }
    }

    /// Run `count` cycles, sleeping the configured interval between them.
    pub fn run_cycles(&self, count: usize) -> Vec<CycleOutcome> {
        let mut outcomes = Vec::with_capacity(count);
        for idx in 0..count {
            if idx > 0 {
                thread::sleep(self.settings.interval());
            }
            outcomes.push(self.run_cycle());
        }
        outcomes
    }

    /// Capture forever. Only process termination ends the loop.
    pub fn run(&self) -> ! {
        loop {
            self.run_cycle();
            thread::sleep(self.settings.interval());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureError;
    use crate::constants::BYTES_PER_MB;
    use assert_fs::prelude::*;
    use image::RgbaImage;
    use std::fs::{self, File};

    struct TinyFrame;

    impl ScreenSource for TinyFrame {
        fn grab(&self) -> Result<RgbaImage, CaptureError> {
            Ok(RgbaImage::new(4, 4))
        }
    }

    fn scheduler_for(storage: PathBuf, limit_mb: u64, log: Arc<EventLog>) -> Scheduler {
        let settings = Settings {
            interval_secs: 1,
            limit_mb,
            storage_path: storage,
        };
        Scheduler::new(settings, Box::new(TinyFrame), log)
    }

    #[test]
    fn cycle_enforces_quota_before_capturing() {
        let temp = assert_fs::TempDir::new().unwrap();
        let storage = temp.child("shots");
        storage.create_dir_all().unwrap();
        let old = storage.child("2020_01_01__00_00_00.png");
        File::create(old.path())
            .unwrap()
            .set_len(3 * BYTES_PER_MB)
            .unwrap();
        let log = Arc::new(EventLog::new(temp.path().join("log")));

        let scheduler = scheduler_for(storage.path().to_path_buf(), 1, log);
        let outcome = scheduler.run_cycle();

        assert_eq!(outcome.quota.removed, vec![old.path().to_path_buf()]);
        let written = outcome.capture.expect("capture written");
        assert!(written.exists());
        assert_eq!(fs::read_dir(storage.path()).unwrap().count(), 1);
    }

    #[test]
    fn failed_steps_do_not_stop_the_cycle() {
        let temp = assert_fs::TempDir::new().unwrap();
        let log = Arc::new(EventLog::new(temp.path().join("log")));
        let scheduler = scheduler_for(temp.path().join("missing"), 20, Arc::clone(&log));

        let outcome = scheduler.run_cycle();

        assert!(outcome.quota.removed.is_empty());
        assert!(outcome.capture.is_none());
        let text = log.contents();
        assert!(text.contains("Ошибка 0003:"));
        assert!(text.contains("Ошибка 0001:"));
    }

    #[test]
    fn runs_the_requested_number_of_cycles() {
        let temp = assert_fs::TempDir::new().unwrap();
        let log = Arc::new(EventLog::new(temp.path().join("log")));
        let scheduler = scheduler_for(temp.path().to_path_buf(), 20, log);

        let outcomes = scheduler.run_cycles(2);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.capture.is_some()));
    }
}
