use crate::constants::{BYTES_PER_KB, BYTES_PER_MB, KB_PER_MB};
use crate::event_log::{ErrorCode, EventLog};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    #[error("Failed to read directory {path}: {source}")]
    ReadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to delete {path}: {source}")]
    Delete {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A regular file found directly inside the storage directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub created: SystemTime,
    pub size_bytes: u64,
}

impl StoredFile {
    pub fn size_kb(&self) -> i64 {
        (self.size_bytes / BYTES_PER_KB) as i64
    }
}

/// What one enforcement pass found and removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaReport {
    pub measured_mb: u64,
    pub removed: Vec<PathBuf>,
}

/// Total size of the regular files directly in `dir`, in whole megabytes.
///
/// When the directory cannot be enumerated the failure is logged and `limit_mb`
/// is returned, which makes the caller treat the directory as exactly full.
pub fn measure_megabytes(dir: &Path, limit_mb: u64, log: &EventLog) -> u64 {
    match total_bytes(dir) {
        Ok(bytes) => bytes / BYTES_PER_MB,
        Err(err) => {
            log.error(ErrorCode::SizeMeasurement, err.to_string());
            limit_mb
        }
    }
}

/// Delete the oldest files in `dir` until it fits in `limit_mb`.
pub fn enforce_quota(dir: &Path, limit_mb: u64, log: &EventLog) -> QuotaReport {
    let measured_mb = measure_megabytes(dir, limit_mb, log);
    let mut report = QuotaReport {
        measured_mb,
        removed: Vec::new(),
    };
    if measured_mb <= limit_mb {
        return report;
    }

    let excess_kb = ((measured_mb - limit_mb) * KB_PER_MB) as i64;
    log.info(format!("clear = {excess_kb} Kb"));

    if let Err(err) = clear(dir, excess_kb, &mut report.removed) {
        log.error(ErrorCode::QuotaEnforcement, err.to_string());
    }
    report
}

/// The oldest-first prefix of `files` whose removal frees at least `excess_kb`.
///
/// `files` must already be ordered with [`sort_oldest_first`]. Sizes are counted
/// in whole kilobytes, so files under 1 KB free nothing towards the target.
pub fn plan_cleanup(files: &[StoredFile], excess_kb: i64) -> &[StoredFile] {
    let mut remaining = excess_kb;
    for (idx, file) in files.iter().enumerate() {
        remaining -= file.size_kb();
        if remaining <= 0 {
            return &files[..=idx];
        }
    }
    files
}

pub fn sort_oldest_first(files: &mut [StoredFile]) {
    files.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.path.cmp(&b.path)));
}

/// Regular files directly inside `dir`. Subdirectories are skipped.
pub fn list_files(dir: &Path) -> Result<Vec<StoredFile>, QuotaError> {
    let entries = fs::read_dir(dir).map_err(|source| QuotaError::ReadDir {
        path: dir.display().to_string(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let created = metadata.created().or_else(|_| metadata.modified())?;
        files.push(StoredFile {
            path: entry.path(),
            created,
            size_bytes: metadata.len(),
        });
    }
    Ok(files)
}

fn total_bytes(dir: &Path) -> Result<u64, QuotaError> {
    Ok(list_files(dir)?.iter().map(|f| f.size_bytes).sum())
}

fn clear(dir: &Path, excess_kb: i64, removed: &mut Vec<PathBuf>) -> Result<(), QuotaError> {
    let mut files = list_files(dir)?;
    sort_oldest_first(&mut files);

    for file in plan_cleanup(&files, excess_kb) {
        fs::remove_file(&file.path).map_err(|source| QuotaError::Delete {
            path: file.path.display().to_string(),
            source,
        })?;
        removed.push(file.path.clone());
    }
    Ok(())
}
