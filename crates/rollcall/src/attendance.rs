//! Core attendance types for rollcall.
//!
//! This module defines the records written to the daily attendance log and
//! the outcomes reported back to the scan loop and the sweeper.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Whether a student was seen on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    /// The student's code was scanned.
    Present,
    /// The student had not been scanned when absences were marked.
    Absent,
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => write!(f, "Present"),
            Self::Absent => write!(f, "Absent"),
        }
    }
}

/// One row of a daily attendance log.
///
/// Field names match the CSV header `Date,ID,Name,Attendance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    /// Calendar date of the log this entry belongs to.
    #[serde(rename = "Date")]
    pub date: NaiveDate,

    /// Student identifier (the scanned payload).
    #[serde(rename = "ID")]
    pub id: String,

    /// Display name from the roster.
    #[serde(rename = "Name")]
    pub name: String,

    /// Recorded status.
    #[serde(rename = "Attendance")]
    pub status: AttendanceStatus,
}

impl AttendanceEntry {
    /// Create a new entry.
    #[must_use]
    pub fn new(
        date: NaiveDate,
        id: impl Into<String>,
        name: impl Into<String>,
        status: AttendanceStatus,
    ) -> Self {
        Self {
            date,
            id: id.into(),
            name: name.into(),
            status,
        }
    }
}

/// Result of an append-if-absent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// A new row was appended.
    Recorded,
    /// The identifier already had a row for the day, carrying this status.
    AlreadyRecorded(AttendanceStatus),
}

impl AppendOutcome {
    /// Whether a row was written.
    #[must_use]
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded)
    }
}

/// Counts produced by one absence sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    /// Students newly marked absent.
    pub marked_absent: usize,
    /// Students that already had a row for the day.
    pub already_recorded: usize,
}
