//! Storage layer for rollcall.
//!
//! This module provides the per-day CSV attendance log: creation with a
//! header, duplicate-checking reads, and append-if-absent writes.
//!
//! The functions here are not atomic across writers. Within one process all
//! writes go through [`crate::writer::LogWriter`], which owns the log.

pub mod schema;

use std::collections::{HashMap, HashSet};
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::attendance::{AppendOutcome, AttendanceEntry, AttendanceStatus};
use crate::error::{Error, Result};

pub use schema::{log_file_name, LOG_HEADER};

/// Create the log at `path` with a header row if it does not exist yet.
///
/// Missing parent directories are created. An existing file is left alone
/// unless it is empty, in which case the header is written to it.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be created.
pub fn ensure_created(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let (file, created) = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => (file, true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let len = std::fs::metadata(path)
                .map_err(|source| access_err(path, source))?
                .len();
            if len > 0 {
                return Ok(());
            }
            // An empty file has no header yet; rows appended to it would be
            // read back as the header.
            let file = OpenOptions::new()
                .append(true)
                .open(path)
                .map_err(|source| access_err(path, source))?;
            (file, false)
        }
        Err(source) => return Err(access_err(path, source)),
    };

    if let Err(e) = write_header(path, file) {
        if created {
            if let Err(remove) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %remove, "Could not remove incomplete log");
            }
        }
        return Err(e);
    }

    if created {
        info!(path = %path.display(), "Created daily attendance log");
    } else {
        warn!(path = %path.display(), "Wrote missing header to empty attendance log");
    }
    Ok(())
}

fn write_header(path: &Path, file: std::fs::File) -> Result<()> {
    let mut writer = csv::Writer::from_writer(file);
    writer
        .write_record(LOG_HEADER)
        .map_err(|source| format_err(path, source))?;
    writer.flush().map_err(|source| access_err(path, source))
}

/// Read every identifier already recorded in the log at `path`.
///
/// A missing file yields an empty set. Read errors are logged and also yield
/// an empty set; use [`try_read_recorded_ids`] to see them.
#[must_use]
pub fn read_recorded_ids(path: &Path) -> HashSet<String> {
    match try_read_recorded_ids(path) {
        Ok(ids) => ids,
        Err(e) => {
            error!(error = %e, "Could not read attendance log");
            HashSet::new()
        }
    }
}

/// Read every identifier already recorded in the log at `path`.
///
/// Only the `ID` column is interpreted, so a row with a damaged date or
/// status still counts as recorded.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, or a row has no
/// readable `ID`.
pub fn try_read_recorded_ids(path: &Path) -> Result<HashSet<String>> {
    Ok(read_recorded(path)?.into_keys().collect())
}

/// The columns needed to decide whether an identifier is already in a log.
#[derive(Debug, Deserialize)]
struct RecordedRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(
        rename = "Attendance",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    status: Option<AttendanceStatus>,
}

/// Read the recorded status of every identifier in the log at `path`.
///
/// A row whose status cannot be read is reported as present: the row exists,
/// so the identifier was seen.
fn read_recorded(path: &Path) -> Result<HashMap<String, AttendanceStatus>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| format_err(path, source))?;

    let mut recorded = HashMap::new();
    for row in reader.deserialize::<RecordedRow>() {
        let row = row.map_err(|source| format_err(path, source))?;
        let status = row.status.unwrap_or_else(|| {
            warn!(id = %row.id, path = %path.display(), "Unreadable status in attendance log");
            AttendanceStatus::Present
        });
        recorded.entry(row.id).or_insert(status);
    }
    Ok(recorded)
}

/// Read all entries of the log at `path`, in file order.
///
/// A missing file yields no entries.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn read_entries(path: &Path) -> Result<Vec<AttendanceEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| format_err(path, source))?;

    reader
        .deserialize::<AttendanceEntry>()
        .map(|row| row.map_err(|source| format_err(path, source)))
        .collect()
}

/// Append a row for `id` unless the log already has one.
///
/// The check re-reads the file on every call. The log is created first if
/// it does not exist.
///
/// # Errors
///
/// Returns an error if the log cannot be read or appended to. An unreadable
/// log is never appended to blindly.
pub fn append_if_absent(
    path: &Path,
    date: NaiveDate,
    id: &str,
    name: &str,
    status: AttendanceStatus,
) -> Result<AppendOutcome> {
    ensure_created(path)?;

    if let Some(existing) = read_recorded(path)?.get(id) {
        debug!(id, recorded = %existing, "Identifier already in log");
        return Ok(AppendOutcome::AlreadyRecorded(*existing));
    }

    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|source| access_err(path, source))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer
        .serialize(AttendanceEntry::new(date, id, name, status))
        .map_err(|source| format_err(path, source))?;
    writer.flush().map_err(|source| access_err(path, source))?;

    debug!(id, %status, path = %path.display(), "Appended attendance row");
    Ok(AppendOutcome::Recorded)
}

fn access_err(path: &Path, source: std::io::Error) -> Error {
    Error::LogAccess {
        path: path.to_path_buf(),
        source,
    }
}

fn format_err(path: &Path, source: csv::Error) -> Error {
    Error::LogFormat {
        path: path.to_path_buf(),
        source,
    }
}

/// The attendance log of one calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyLog {
    /// Date the log records.
    date: NaiveDate,
    /// Path to the CSV file.
    path: PathBuf,
}

impl DailyLog {
    /// Open (creating if needed) the log for `date` inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn open(dir: impl AsRef<Path>, date: NaiveDate) -> Result<Self> {
        let path = Self::path_for(dir, date);
        debug!(path = %path.display(), "Opening daily attendance log");
        ensure_created(&path)?;
        Ok(Self { date, path })
    }

    /// Path of the log for `date` inside `dir`, without touching the disk.
    #[must_use]
    pub fn path_for(dir: impl AsRef<Path>, date: NaiveDate) -> PathBuf {
        dir.as_ref().join(log_file_name(date))
    }

    /// Date the log records.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Path to the CSV file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identifiers already recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn recorded_ids(&self) -> Result<HashSet<String>> {
        try_read_recorded_ids(&self.path)
    }

    /// All entries in file order.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn entries(&self) -> Result<Vec<AttendanceEntry>> {
        read_entries(&self.path)
    }

    /// Append a row for `id` with this log's date unless one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or appended to.
    pub fn append_if_absent(
        &self,
        id: &str,
        name: &str,
        status: AttendanceStatus,
    ) -> Result<AppendOutcome> {
        append_if_absent(&self.path, self.date, id, name, status)
    }

    /// Summary counts for the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn stats(&self) -> Result<LogStats> {
        Ok(LogStats::from_entries(&self.entries()?))
    }
}

/// Summary counts for one daily log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogStats {
    /// Total number of rows.
    pub total: usize,
    /// Rows marked present.
    pub present: usize,
    /// Rows marked absent.
    pub absent: usize,
}

impl LogStats {
    /// Count the statuses in `entries`.
    #[must_use]
    pub fn from_entries(entries: &[AttendanceEntry]) -> Self {
        let present = entries
            .iter()
            .filter(|e| e.status == AttendanceStatus::Present)
            .count();
        Self {
            total: entries.len(),
            present,
            absent: entries.len() - present,
        }
    }
}
