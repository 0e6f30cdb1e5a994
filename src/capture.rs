use crate::constants::CAPTURE_FILE_FORMAT;
use crate::event_log::{ErrorCode, EventLog};
use chrono::{DateTime, Local, TimeZone};
use image::{ImageFormat, RgbaImage};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("No display available")]
    NoDisplay,
    #[error("Display capture failed: {0}")]
    Display(String),
    #[error("Captured frame does not match display bounds {width}x{height}")]
    Buffer { width: u32, height: u32 },
    #[error("Screen capture is not supported in this build")]
    Unsupported,
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of a single frame of the screen.
pub trait ScreenSource {
    fn grab(&self) -> Result<RgbaImage, CaptureError>;
}

/// The primary monitor, or the first monitor when none is flagged primary.
#[derive(Debug, Default)]
pub struct PrimaryDisplay;

#[cfg(feature = "xcap")]
impl ScreenSource for PrimaryDisplay {
    fn grab(&self) -> Result<RgbaImage, CaptureError> {
        let monitors =
            xcap::Monitor::all().map_err(|err| CaptureError::Display(err.to_string()))?;
        let monitor = monitors
            .iter()
            .find(|monitor| monitor.is_primary())
            .or_else(|| monitors.first())
            .ok_or(CaptureError::NoDisplay)?;

        let frame = monitor
            .capture_image()
            .map_err(|err| CaptureError::Display(err.to_string()))?;
        let (width, height) = (frame.width(), frame.height());
        RgbaImage::from_raw(width, height, frame.into_raw())
            .ok_or(CaptureError::Buffer { width, height })
    }
}

#[cfg(not(feature = "xcap"))]
impl ScreenSource for PrimaryDisplay {
    fn grab(&self) -> Result<RgbaImage, CaptureError> {
        Err(CaptureError::Unsupported)
    }
}

pub fn capture_file_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(CAPTURE_FILE_FORMAT).to_string()
}

pub struct Capturer {
    source: Box<dyn ScreenSource>,
    log: Arc<EventLog>,
}

impl Capturer {
    pub fn new(source: Box<dyn ScreenSource>, log: Arc<EventLog>) -> Self {
        Capturer { source, log }
    }

    /// Grab one frame and store it in `dir`. Failures are logged, never returned.
    pub fn capture(&self, dir: &Path) -> Option<PathBuf> {
        match self.try_capture(dir, &Local::now()) {
            Ok(path) => Some(path),
            Err(err) => {
                self.log.error(ErrorCode::Capture, err.to_string());
                None
            }
        }
    }

    fn try_capture(&self, dir: &Path, at: &DateTime<Local>) -> Result<PathBuf, CaptureError> {
        let frame = self.source.grab()?;
        let mut png = Vec::new();
        frame.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let path = dir.join(capture_file_name(at));
        atomic_write(&path, &png)?;
        Ok(path)
    }
}

/// Write the whole file under a temporary name, then rename it into place, so a
/// half-written capture never shows up in the storage directory.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.flush()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use std::fs;

    struct SolidFrame {
        width: u32,
        height: u32,
    }

    impl ScreenSource for SolidFrame {
        fn grab(&self) -> Result<RgbaImage, CaptureError> {
            Ok(RgbaImage::from_pixel(
                self.width,
                self.height,
                image::Rgba([10, 20, 30, 255]),
            ))
        }
    }

    struct NoScreen;

    impl ScreenSource for NoScreen {
        fn grab(&self) -> Result<RgbaImage, CaptureError> {
            Err(CaptureError::NoDisplay)
        }
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
            .and_utc()
    }

    fn matches_capture_pattern(name: &str) -> bool {
        let bytes = name.as_bytes();
        let digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
        name.len() == "yyyy_MM_dd__HH_mm_ss.png".len()
            && digits(0..4)
            && bytes[4] == b'_'
            && digits(5..7)
            && bytes[7] == b'_'
            && digits(8..10)
            && &name[10..12] == "__"
            && digits(12..14)
            && bytes[14] == b'_'
            && digits(15..17)
            && bytes[17] == b'_'
            && digits(18..20)
            && name.ends_with(".png")
    }

    #[test]
    fn file_name_uses_zero_padded_fields() {
        let name = capture_file_name(&utc(2024, 3, 5, 7, 8, 9));
        assert_eq!(name, "2024_03_05__07_08_09.png");
        assert!(matches_capture_pattern(&name));
        assert!(matches_capture_pattern(&capture_file_name(&Local::now())));
    }

    #[test]
    fn file_names_sort_with_time() {
        let instants = [
            utc(2023, 12, 31, 23, 59, 59),
            utc(2024, 1, 1, 0, 0, 0),
            utc(2024, 1, 1, 0, 0, 0),
            utc(2024, 1, 1, 9, 30, 0),
            utc(2024, 10, 2, 8, 0, 1),
        ];
        let names: Vec<_> = instants.iter().map(capture_file_name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn writes_png_sized_to_the_frame() {
        let temp = assert_fs::TempDir::new().unwrap();
        let log = Arc::new(EventLog::new(temp.path().join("log")));
        let capturer = Capturer::new(
            Box::new(SolidFrame {
                width: 64,
                height: 48,
            }),
            log,
        );

        let path = capturer.capture(temp.path()).expect("capture written");
        assert!(matches_capture_pattern(
            &path.file_name().unwrap().to_string_lossy()
        ));

        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));

        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().is_file())
            .collect();
        assert_eq!(leftovers.len(), 1, "temporary file left behind");
    }

    #[test]
    fn failure_is_logged_with_code_1() {
        let temp = assert_fs::TempDir::new().unwrap();
        let log = Arc::new(EventLog::new(temp.path().join("log")));
        let capturer = Capturer::new(Box::new(NoScreen), Arc::clone(&log));

        assert!(capturer.capture(temp.path()).is_none());

        let text = log.contents();
        assert!(text.contains("[ERROR] Ошибка 0001: No display available"));
    }

    #[test]
    fn missing_storage_directory_is_a_capture_failure() {
        let temp = assert_fs::TempDir::new().unwrap();
        let log = Arc::new(EventLog::new(temp.path().join("log")));
        let capturer = Capturer::new(
            Box::new(SolidFrame {
                width: 2,
                height: 2,
            }),
            Arc::clone(&log),
        );

        assert!(capturer.capture(&temp.path().join("gone")).is_none());
        let text = log.contents();
        assert!(text.contains("Ошибка 0001: I/O error"));
    }
}
