//! Absence sweep.
//!
//! Marks every roster member without a row in the day's log as absent.

use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use crate::attendance::{AppendOutcome, AttendanceStatus, SweepSummary};
use crate::error::Result;
use crate::roster::Roster;
use crate::storage::{self, DailyLog};

/// Append an `Absent` row for every roster member not yet in `log`.
///
/// Running it again appends nothing, since each append re-checks the log.
///
/// # Errors
///
/// Returns an error if the log cannot be read or appended to. Rows written
/// before the failure stay in the log.
pub fn sweep(roster: &Roster, log: &DailyLog) -> Result<SweepSummary> {
    sweep_path(roster, log.path(), log.date())
}

/// Path-based variant of [`sweep`].
///
/// # Errors
///
/// Returns an error if the log cannot be read or appended to.
pub fn sweep_path(roster: &Roster, log_path: &Path, date: NaiveDate) -> Result<SweepSummary> {
    let recorded = storage::try_read_recorded_ids(log_path)?;
    let mut summary = SweepSummary::default();

    for student in roster.iter() {
        if recorded.contains(&student.id) {
            summary.already_recorded += 1;
            continue;
        }
        match storage::append_if_absent(
            log_path,
            date,
            &student.id,
            &student.name,
            AttendanceStatus::Absent,
        )? {
            AppendOutcome::Recorded => summary.marked_absent += 1,
            AppendOutcome::AlreadyRecorded(_) => summary.already_recorded += 1,
        }
    }

    info!(
        %date,
        marked_absent = summary.marked_absent,
        already_recorded = summary.already_recorded,
        "Absences marked for students who did not scan"
    );
    Ok(summary)
}
