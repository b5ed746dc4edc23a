//! Single owner of the daily attendance log.
//!
//! Scan results and absence sweeps are sent as requests over a channel to one
//! [`LogWriter`] running on a dedicated thread. Requests are handled one at a
//! time, so the read-check-append sequence of [`crate::storage`] cannot
//! interleave between the scan loop and the scheduler.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::attendance::{AppendOutcome, AttendanceStatus, SweepSummary};
use crate::error::{Error, Result};
use crate::roster::Roster;
use crate::storage::DailyLog;
use crate::sweeper;

/// Number of requests that may queue before senders wait.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// A request handled by the [`LogWriter`].
#[derive(Debug)]
pub enum LogRequest {
    /// Append a row unless the identifier is already recorded for `date`.
    Record {
        /// Log date.
        date: NaiveDate,
        /// Student identifier.
        id: String,
        /// Student name.
        name: String,
        /// Status to record.
        status: AttendanceStatus,
        /// Receives the outcome.
        reply: oneshot::Sender<Result<AppendOutcome>>,
    },
    /// Mark every unrecorded roster member absent for `date`.
    Sweep {
        /// Log date.
        date: NaiveDate,
        /// Roster to sweep.
        roster: Arc<Roster>,
        /// Receives the summary.
        reply: oneshot::Sender<Result<SweepSummary>>,
    },
}

/// Owns the log directory and the currently open daily log.
#[derive(Debug)]
pub struct LogWriter {
    dir: PathBuf,
    current: Option<DailyLog>,
}

impl LogWriter {
    /// Create a writer for `dir` without touching the disk.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: None,
        }
    }

    /// Create a writer and open the log for `date` right away.
    ///
    /// # Errors
    ///
    /// Returns an error if the log directory or file cannot be created.
    pub fn open(dir: impl Into<PathBuf>, date: NaiveDate) -> Result<Self> {
        let mut writer = Self::new(dir);
        writer.log_for(date)?;
        Ok(writer)
    }

    /// The currently open log, if any.
    #[must_use]
    pub fn current(&self) -> Option<&DailyLog> {
        self.current.as_ref()
    }

    /// Run the writer on a blocking thread.
    ///
    /// The writer stops once every [`LogHandle`] has been dropped. Must be
    /// called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(self, capacity: usize) -> (LogHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let task = tokio::task::spawn_blocking(move || self.run(rx));
        (LogHandle { tx }, task)
    }

    /// Handle requests until the channel closes.
    pub fn run(mut self, mut rx: mpsc::Receiver<LogRequest>) {
        debug!(dir = %self.dir.display(), "Log writer started");
        while let Some(request) = rx.blocking_recv() {
            self.handle(request);
        }
        debug!("Log writer stopped");
    }

    /// Handle a single request and send its reply.
    pub fn handle(&mut self, request: LogRequest) {
        match request {
            LogRequest::Record {
                date,
                id,
                name,
                status,
                reply,
            } => {
                let result = self
                    .log_for(date)
                    .and_then(|log| log.append_if_absent(&id, &name, status));
                if let Err(e) = &result {
                    error!(error = %e, id = %id, "Failed to record attendance");
                }
                // The requester may have given up waiting
                let _ = reply.send(result);
            }
            LogRequest::Sweep {
                date,
                roster,
                reply,
            } => {
                let result = self
                    .log_for(date)
                    .and_then(|log| sweeper::sweep(&roster, log));
                if let Err(e) = &result {
                    error!(error = %e, %date, "Absence sweep failed");
                }
                let _ = reply.send(result);
            }
        }
    }

    /// The log for `date`, switching files when the date changes.
    fn log_for(&mut self, date: NaiveDate) -> Result<&DailyLog> {
        let stale = self.current.as_ref().map_or(true, |log| log.date() != date);
        if stale {
            let log = DailyLog::open(&self.dir, date)?;
            info!(path = %log.path().display(), "Writing to daily attendance log");
            self.current = Some(log);
        }
        self.current
            .as_ref()
            .ok_or_else(|| Error::internal("daily log missing after open"))
    }
}

/// Cloneable sender side of a running [`LogWriter`].
#[derive(Debug, Clone)]
pub struct LogHandle {
    tx: mpsc::Sender<LogRequest>,
}

impl LogHandle {
    /// Record `status` for `id` on `date` unless already recorded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriterClosed`] if the writer is gone, or the writer's
    /// own error if the log could not be updated.
    pub async fn record(
        &self,
        date: NaiveDate,
        id: &str,
        name: &str,
        status: AttendanceStatus,
    ) -> Result<AppendOutcome> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Self::record_request(date, id, name, status, reply))
            .await
            .map_err(|_| Error::WriterClosed)?;
        rx.await.map_err(|_| Error::WriterClosed)?
    }

    /// Blocking variant of [`LogHandle::record`] for non-async threads.
    ///
    /// # Errors
    ///
    /// Same as [`LogHandle::record`].
    pub fn blocking_record(
        &self,
        date: NaiveDate,
        id: &str,
        name: &str,
        status: AttendanceStatus,
    ) -> Result<AppendOutcome> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .blocking_send(Self::record_request(date, id, name, status, reply))
            .map_err(|_| Error::WriterClosed)?;
        rx.blocking_recv().map_err(|_| Error::WriterClosed)?
    }

    /// Mark every unrecorded roster member absent for `date`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriterClosed`] if the writer is gone, or the writer's
    /// own error if the log could not be updated.
    pub async fn sweep(&self, date: NaiveDate, roster: Arc<Roster>) -> Result<SweepSummary> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(LogRequest::Sweep {
                date,
                roster,
                reply,
            })
            .await
            .map_err(|_| Error::WriterClosed)?;
        rx.await.map_err(|_| Error::WriterClosed)?
    }

    #[cfg(test)]
    pub(crate) fn from_sender(tx: mpsc::Sender<LogRequest>) -> Self {
        Self { tx }
    }

    fn record_request(
        date: NaiveDate,
        id: &str,
        name: &str,
        status: AttendanceStatus,
        reply: oneshot::Sender<Result<AppendOutcome>>,
    ) -> LogRequest {
        LogRequest::Record {
            date,
            id: id.to_string(),
            name: name.to_string(),
            status,
            reply,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn test_open_creates_log() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LogWriter::open(dir.path(), day()).unwrap();

        let log = writer.current().unwrap();
        assert_eq!(log.date(), day());
        assert!(log.path().exists());
    }

    #[test]
    fn test_new_is_lazy() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LogWriter::new(dir.path().join("later"));

        assert!(writer.current().is_none());
        assert!(!dir.path().join("later").exists());
    }

    #[test]
    fn test_handle_record_replies() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = LogWriter::new(dir.path());
        let (reply, mut rx) = oneshot::channel();

        writer.handle(LogRequest::Record {
            date: day(),
            id: "S1".to_string(),
            name: "Alice".to_string(),
            status: AttendanceStatus::Present,
            reply,
        });

        let outcome = rx.try_recv().unwrap().unwrap();
        assert_eq!(outcome, AppendOutcome::Recorded);
    }

    #[test]
    fn test_date_change_rolls_over_to_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = LogWriter::open(dir.path(), day()).unwrap();
        let next_day = day().succ_opt().unwrap();

        let (reply, mut rx) = oneshot::channel();
        writer.handle(LogRequest::Record {
            date: next_day,
            id: "S1".to_string(),
            name: "Alice".to_string(),
            status: AttendanceStatus::Present,
            reply,
        });
        rx.try_recv().unwrap().unwrap();

        assert_eq!(writer.current().unwrap().date(), next_day);
        assert!(DailyLog::path_for(dir.path(), day()).exists());
        assert!(DailyLog::path_for(dir.path(), next_day).exists());
    }

    #[tokio::test]
    async fn test_record_through_handle() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, task) = LogWriter::new(dir.path()).spawn(DEFAULT_QUEUE_CAPACITY);

        let first = handle
            .record(day(), "S1", "Alice", AttendanceStatus::Present)
            .await
            .unwrap();
        let second = handle
            .record(day(), "S1", "Alice", AttendanceStatus::Present)
            .await
            .unwrap();

        assert_eq!(first, AppendOutcome::Recorded);
        assert_eq!(
            second,
            AppendOutcome::AlreadyRecorded(AttendanceStatus::Present)
        );

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_sweep_through_handle() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, task) = LogWriter::new(dir.path()).spawn(DEFAULT_QUEUE_CAPACITY);
        let roster = Arc::new(Roster::from_pairs([("S1", "Alice"), ("S2", "Bob")]));

        handle
            .record(day(), "S1", "Alice", AttendanceStatus::Present)
            .await
            .unwrap();
        let summary = handle.sweep(day(), roster).await.unwrap();

        assert_eq!(summary.marked_absent, 1);
        assert_eq!(summary.already_recorded, 1);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_writer_closed_after_task_ends() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = LogHandle { tx };

        let err = handle
            .record(day(), "S1", "Alice", AttendanceStatus::Present)
            .await
            .unwrap_err();
        assert!(err.is_writer_closed());
        drop(dir);
    }

    #[tokio::test]
    async fn test_record_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the log directory should be
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "x").unwrap();
        let (handle, task) = LogWriter::new(&blocker).spawn(DEFAULT_QUEUE_CAPACITY);

        let result = handle
            .record(day(), "S1", "Alice", AttendanceStatus::Present)
            .await;
        assert!(result.is_err());

        drop(handle);
        task.await.unwrap();
    }
}
