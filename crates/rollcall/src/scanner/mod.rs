//! Camera scan loop.
//!
//! The loop pulls frames from a [`FrameSource`], finds QR codes in them, and
//! sends a `Present` record to the log writer for every known identifier.
//! It runs on its own blocking thread until the shutdown handle fires or the
//! log writer goes away.

pub mod decode;
pub mod frame;
pub mod preview;

#[cfg(all(feature = "camera", target_os = "linux"))]
pub mod camera;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use image::GrayImage;
use tracing::{debug, info, trace, warn};

use crate::attendance::{AppendOutcome, AttendanceStatus};
use crate::config::Config;
use crate::error::Result;
use crate::roster::Roster;
use crate::shutdown::ShutdownHandle;
use crate::writer::LogHandle;

pub use decode::{Detection, QrDecoder};
pub use preview::{NoPreview, Preview, SnapshotPreview};

/// Something that yields grayscale frames.
///
/// Implementations own the underlying device and release it on drop.
pub trait FrameSource: Send {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Block until the next frame is available.
    ///
    /// # Errors
    ///
    /// Returns an error if no frame could be read. The loop logs it and
    /// tries again.
    fn next_frame(&mut self) -> Result<GrayImage>;
}

/// Timing knobs for the scan loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    /// Pause after a failed frame read.
    pub frame_retry: Duration,
    /// Ignore a payload seen again within this window.
    pub rescan_cooldown: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            frame_retry: Duration::from_millis(100),
            rescan_cooldown: Duration::from_secs(3),
        }
    }
}

impl From<&Config> for ScanSettings {
    fn from(config: &Config) -> Self {
        Self {
            frame_retry: config.frame_retry(),
            rescan_cooldown: config.rescan_cooldown(),
        }
    }
}

/// What happened to one decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A new `Present` row was written.
    Recorded {
        /// Student identifier.
        id: String,
        /// Student name.
        name: String,
    },
    /// The student already has a row for today.
    AlreadyRecorded {
        /// Student identifier.
        id: String,
        /// Student name.
        name: String,
        /// Status of the existing row.
        status: AttendanceStatus,
    },
    /// The payload is not in the roster.
    UnknownId(String),
    /// The payload was handled moments ago and was ignored.
    Debounced(String),
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Frames read successfully.
    pub frames: u64,
    /// Frame reads that failed.
    pub failed_frames: u64,
    /// New rows written.
    pub recorded: u64,
    /// Scans of students that were already recorded.
    pub duplicates: u64,
    /// Scans of identifiers missing from the roster.
    pub unknown: u64,
}

impl ScanStats {
    fn count(&mut self, outcome: &ScanOutcome) {
        match outcome {
            ScanOutcome::Recorded { .. } => self.recorded += 1,
            ScanOutcome::AlreadyRecorded { .. } => self.duplicates += 1,
            ScanOutcome::UnknownId(_) => self.unknown += 1,
            ScanOutcome::Debounced(_) => {}
        }
    }
}

/// Releases the frame source and closes the preview on every exit path.
struct Session {
    source: Box<dyn FrameSource>,
    preview: Box<dyn Preview>,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.preview.close();
        info!(source = self.source.name(), "Capture device released");
    }
}

/// The scan loop and its state.
#[derive(Debug)]
pub struct ScanLoop {
    roster: Arc<Roster>,
    log: LogHandle,
    decoder: QrDecoder,
    shutdown: ShutdownHandle,
    settings: ScanSettings,
    recent: HashMap<String, Instant>,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl ScanLoop {
    /// Create a scan loop recording into `log`.
    #[must_use]
    pub fn new(
        roster: Arc<Roster>,
        log: LogHandle,
        shutdown: ShutdownHandle,
        settings: ScanSettings,
    ) -> Self {
        Self {
            roster,
            log,
            decoder: QrDecoder::new(),
            shutdown,
            settings,
            recent: HashMap::new(),
            today: local_today,
        }
    }

    /// Use `today` instead of the local calendar date for new rows.
    #[must_use]
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Look up one decoded payload and record it.
    ///
    /// Must not be called from an async context, since it waits for the log
    /// writer's reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the log writer is gone or failed to write.
    pub fn handle_payload(&mut self, payload: &str) -> Result<ScanOutcome> {
        let id = payload.trim();

        let now = Instant::now();
        if let Some(seen) = self.recent.get(id) {
            if now.duration_since(*seen) < self.settings.rescan_cooldown {
                trace!(id, "Ignoring repeated scan");
                return Ok(ScanOutcome::Debounced(id.to_string()));
            }
        }
        let cooldown = self.settings.rescan_cooldown;
        self.recent.retain(|_, seen| now.duration_since(*seen) < cooldown);

        let Some(student) = self.roster.get(id) else {
            warn!(id, "Student ID not found in the roster");
            self.recent.insert(id.to_string(), now);
            return Ok(ScanOutcome::UnknownId(id.to_string()));
        };

        // A failed write is not remembered, so the next frame retries it.
        let outcome = self.log.blocking_record(
            (self.today)(),
            &student.id,
            &student.name,
            AttendanceStatus::Present,
        )?;
        self.recent.insert(id.to_string(), now);

        Ok(match outcome {
            AppendOutcome::Recorded => {
                info!(id = %student.id, name = %student.name, "Attendance recorded");
                ScanOutcome::Recorded {
                    id: student.id.clone(),
                    name: student.name.clone(),
                }
            }
            AppendOutcome::AlreadyRecorded(status) => {
                info!(
                    id = %student.id,
                    name = %student.name,
                    %status,
                    "Attendance already recorded"
                );
                ScanOutcome::AlreadyRecorded {
                    id: student.id.clone(),
                    name: student.name.clone(),
                    status,
                }
            }
        })
    }

    /// Scan frames until shutdown.
    ///
    /// `source` and `preview` are released when this returns, whatever the
    /// reason.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::WriterClosed`] if the log writer goes away.
    /// Failed writes are logged and scanning continues.
    pub fn run(
        mut self,
        source: Box<dyn FrameSource>,
        preview: Box<dyn Preview>,
    ) -> Result<ScanStats> {
        let mut session = Session { source, preview };
        let mut stats = ScanStats::default();
        info!(source = session.source.name(), "Scanning started");

        while !self.shutdown.should_stop() {
            let frame = match session.source.next_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    stats.failed_frames += 1;
                    warn!(error = %e, "Failed to read frame");
                    std::thread::sleep(self.settings.frame_retry);
                    continue;
                }
            };
            stats.frames += 1;

            let detections = self.decoder.detect(&frame);
            if let Err(e) = session.preview.show(&frame, &detections) {
                debug!(error = %e, "Preview update failed");
            }

            for payload in detections.iter().filter_map(|d| d.payload.as_deref()) {
                match self.handle_payload(payload) {
                    Ok(outcome) => stats.count(&outcome),
                    Err(e) if e.is_writer_closed() => return Err(e),
                    // The writer already logged the failure, keep scanning
                    Err(e) => debug!(error = %e, "Scan not recorded"),
                }
            }
        }

        info!(
            frames = stats.frames,
            failed_frames = stats.failed_frames,
            recorded = stats.recorded,
            duplicates = stats.duplicates,
            unknown = stats.unknown,
            "Scanning stopped"
        );
        Ok(stats)
    }
}
