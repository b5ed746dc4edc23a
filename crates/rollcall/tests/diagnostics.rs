//! Operator-facing warnings and errors are emitted as log events.

use std::io;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

use rollcall::scanner::{ScanLoop, ScanOutcome, ScanSettings};
use rollcall::writer::DEFAULT_QUEUE_CAPACITY;
use rollcall::{LogWriter, Roster, ShutdownHandle};

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl<'a> MakeWriter<'a> for SharedBuffer {
    type Writer = BufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        BufferWriter(Arc::clone(&self.0))
    }
}

impl io::Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "lock poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with every event at `Level::WARN` or above captured.
fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
    let sink = SharedBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(sink.clone())
        .with_ansi(false)
        .with_max_level(Level::WARN)
        .finish();

    let value = tracing::subscriber::with_default(subscriber, f);
    (value, sink.contents())
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

#[tokio::test]
async fn unknown_id_logs_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, writer) = LogWriter::new(dir.path()).spawn(DEFAULT_QUEUE_CAPACITY);
    let mut scan = ScanLoop::new(
        Arc::new(Roster::from_pairs([("S1", "Alice")])),
        handle,
        ShutdownHandle::new(),
        ScanSettings::default(),
    )
    .with_clock(day);

    let (outcome, output) = tokio::task::spawn_blocking(move || {
        capture_warnings(|| scan.handle_payload("S9").unwrap())
    })
    .await
    .unwrap();

    assert_eq!(outcome, ScanOutcome::UnknownId("S9".to_string()));
    let line = output
        .lines()
        .find(|l| l.contains("Student ID not found in the roster"))
        .unwrap_or_else(|| panic!("no unknown-ID warning in {output:?}"));
    assert!(line.contains("WARN"));
    assert!(line.contains("S9"));

    writer.await.unwrap();
}

#[tokio::test]
async fn recorded_scan_logs_no_warning() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, writer) = LogWriter::new(dir.path()).spawn(DEFAULT_QUEUE_CAPACITY);
    let mut scan = ScanLoop::new(
        Arc::new(Roster::from_pairs([("S1", "Alice")])),
        handle,
        ShutdownHandle::new(),
        ScanSettings::default(),
    )
    .with_clock(day);

    let (outcome, output) = tokio::task::spawn_blocking(move || {
        capture_warnings(|| scan.handle_payload("S1").unwrap())
    })
    .await
    .unwrap();

    assert!(matches!(outcome, ScanOutcome::Recorded { .. }));
    assert!(output.is_empty(), "unexpected warnings: {output}");

    writer.await.unwrap();
}

#[test]
fn missing_roster_logs_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("students.csv");

    let (roster, output) = capture_warnings(|| Roster::load_or_empty(&path));

    assert!(roster.is_empty());
    let line = output
        .lines()
        .find(|l| l.contains("Could not load roster"))
        .unwrap_or_else(|| panic!("no roster error in {output:?}"));
    assert!(line.contains("ERROR"));
    assert!(line.contains("students.csv"));
}
