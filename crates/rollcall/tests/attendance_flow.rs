//! End-to-end attendance scenarios against real files.

use std::sync::Arc;

use chrono::NaiveDate;
use rollcall::scanner::{ScanLoop, ScanOutcome, ScanSettings};
use rollcall::storage::{self, DailyLog};
use rollcall::writer::DEFAULT_QUEUE_CAPACITY;
use rollcall::{
    sweeper, AppendOutcome, AttendanceStatus, LogWriter, Roster, ShutdownHandle, SweepSummary,
};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

fn write_roster(dir: &std::path::Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("students.csv");
    std::fs::write(&path, contents).unwrap();
    path
}

fn rows(log: &DailyLog) -> Vec<(String, String, AttendanceStatus)> {
    log.entries()
        .unwrap()
        .into_iter()
        .map(|e| (e.id, e.name, e.status))
        .collect()
}

#[test]
fn present_scan_then_sweep_marks_the_rest_absent() {
    let dir = tempfile::tempdir().unwrap();
    let roster = Roster::load(write_roster(dir.path(), "ID,Name\nS1,Alice\nS2,Bob\n")).unwrap();
    let log = DailyLog::open(dir.path(), day()).unwrap();

    let outcome = log
        .append_if_absent("S1", "Alice", AttendanceStatus::Present)
        .unwrap();
    assert_eq!(outcome, AppendOutcome::Recorded);

    let summary = sweeper::sweep(&roster, &log).unwrap();
    assert_eq!(
        summary,
        SweepSummary {
            marked_absent: 1,
            already_recorded: 1
        }
    );

    assert_eq!(
        rows(&log),
        vec![
            ("S1".to_string(), "Alice".to_string(), AttendanceStatus::Present),
            ("S2".to_string(), "Bob".to_string(), AttendanceStatus::Absent),
        ]
    );

    let raw = std::fs::read_to_string(log.path()).unwrap();
    assert_eq!(
        raw,
        "Date,ID,Name,Attendance\n\
         2024-03-04,S1,Alice,Present\n\
         2024-03-04,S2,Bob,Absent\n"
    );
}

#[test]
fn scan_after_sweep_keeps_absent_row() {
    let dir = tempfile::tempdir().unwrap();
    let roster = Roster::from_pairs([("S1", "Alice")]);
    let log = DailyLog::open(dir.path(), day()).unwrap();

    sweeper::sweep(&roster, &log).unwrap();
    let late = log
        .append_if_absent("S1", "Alice", AttendanceStatus::Present)
        .unwrap();

    assert_eq!(late, AppendOutcome::AlreadyRecorded(AttendanceStatus::Absent));
    assert_eq!(rows(&log).len(), 1);
}

#[tokio::test]
async fn unknown_id_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let roster = Roster::load(write_roster(dir.path(), "ID,Name\nS1,Alice\n")).unwrap();
    let (handle, writer) = LogWriter::open(dir.path(), day())
        .unwrap()
        .spawn(DEFAULT_QUEUE_CAPACITY);

    let mut scan = ScanLoop::new(
        Arc::new(roster),
        handle,
        ShutdownHandle::new(),
        ScanSettings::default(),
    )
    .with_clock(day);
    let outcome = tokio::task::spawn_blocking(move || scan.handle_payload("S9").unwrap())
        .await
        .unwrap();
    assert_eq!(outcome, ScanOutcome::UnknownId("S9".to_string()));

    writer.await.unwrap();
    let log = DailyLog::open(dir.path(), day()).unwrap();
    assert!(rows(&log).is_empty());
}

#[test]
fn missing_roster_falls_back_to_empty() {
    let dir = tempfile::tempdir().unwrap();
    let roster = Roster::load_or_empty(dir.path().join("nope.csv"));
    assert!(roster.is_empty());

    let log = DailyLog::open(dir.path(), day()).unwrap();
    let summary = sweeper::sweep(&roster, &log).unwrap();
    assert_eq!(summary, SweepSummary::default());
    assert_eq!(
        std::fs::read_to_string(log.path()).unwrap(),
        "Date,ID,Name,Attendance\n"
    );
}

#[test]
fn read_recorded_ids_on_missing_log_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = DailyLog::path_for(dir.path(), day());
    assert!(storage::read_recorded_ids(&path).is_empty());
    assert!(!path.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scans_of_one_id_write_one_row() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, writer) = LogWriter::new(dir.path()).spawn(DEFAULT_QUEUE_CAPACITY);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let handle = handle.clone();
            tokio::spawn(async move {
                handle
                    .record(day(), "S1", "Alice", AttendanceStatus::Present)
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut recorded = 0;
    for task in tasks {
        if task.await.unwrap().is_recorded() {
            recorded += 1;
        }
    }
    assert_eq!(recorded, 1);

    drop(handle);
    writer.await.unwrap();
    let log = DailyLog::open(dir.path(), day()).unwrap();
    assert_eq!(rows(&log).len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scans_of_different_ids_write_one_row_each() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, writer) = LogWriter::new(dir.path()).spawn(DEFAULT_QUEUE_CAPACITY);

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let handle = handle.clone();
            tokio::spawn(async move {
                let id = format!("S{i}");
                handle
                    .record(day(), &id, "Student", AttendanceStatus::Present)
                    .await
                    .unwrap()
            })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().is_recorded());
    }

    drop(handle);
    writer.await.unwrap();
    let log = DailyLog::open(dir.path(), day()).unwrap();
    let mut ids: Vec<_> = rows(&log).into_iter().map(|(id, _, _)| id).collect();
    ids.sort();
    assert_eq!(ids, (0..8).map(|i| format!("S{i}")).collect::<Vec<_>>());
}

#[tokio::test]
async fn sweep_and_scan_through_writer_never_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, writer) = LogWriter::new(dir.path()).spawn(DEFAULT_QUEUE_CAPACITY);
    let roster = Arc::new(Roster::from_pairs([("S1", "Alice"), ("S2", "Bob")]));

    let (scan, sweep) = tokio::join!(
        handle.record(day(), "S1", "Alice", AttendanceStatus::Present),
        handle.sweep(day(), Arc::clone(&roster)),
    );
    scan.unwrap();
    sweep.unwrap();
    let again = handle.sweep(day(), roster).await.unwrap();
    assert_eq!(again.marked_absent, 0);

    drop(handle);
    writer.await.unwrap();
    let log = DailyLog::open(dir.path(), day()).unwrap();
    let mut ids: Vec<_> = rows(&log).into_iter().map(|(id, _, _)| id).collect();
    ids.sort();
    assert_eq!(ids, vec!["S1", "S2"]);
}
