//! The `run` command: scanning and the daily absence sweep together.
//!
//! Startup order is roster (fail soft), log directory (fail fast), camera
//! (fail fast). After that the log writer and the scan loop each get a
//! blocking thread, and the scheduler runs on the calling task until the
//! shutdown handle fires.

use std::io::BufRead;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{CameraConfig, Config};
use crate::error::{Error, Result};
use crate::roster::Roster;
use crate::scanner::{
    FrameSource, NoPreview, Preview, ScanLoop, ScanSettings, ScanStats, SnapshotPreview,
};
use crate::scheduler::{Scheduler, ABSENCE_SWEEP};
use crate::shutdown::ShutdownHandle;
use crate::writer::{LogHandle, LogWriter, DEFAULT_QUEUE_CAPACITY};

/// What a finished run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Frames read successfully.
    pub frames: u64,
    /// Students newly marked present.
    pub recorded: u64,
    /// Absence sweeps triggered by the scheduler.
    pub sweeps: u32,
}

/// Open the configured camera and run until shutdown.
///
/// # Errors
///
/// Returns an error if the log directory or camera cannot be opened, or if
/// the log writer stops while scanning.
pub async fn run(config: &Config) -> Result<RunSummary> {
    let today = Local::now().date_naive();
    let roster = Arc::new(Roster::load_or_empty(config.roster_path()));
    let writer = LogWriter::open(config.log_dir(), today)?;
    let source = open_camera(&config.camera)?;

    let shutdown = ShutdownHandle::new();
    spawn_ctrl_c_listener(shutdown.clone());
    spawn_quit_key_listener(config.camera.quit_key.clone(), shutdown.clone());
    info!(
        quit_key = %config.camera.quit_key,
        "Scanning, enter the quit key or press Ctrl-C to stop"
    );

    run_with(config, roster, writer, source, shutdown).await
}

/// Run with an already opened log writer and frame source.
///
/// Returns once `shutdown` fires or the scan loop ends on its own, after the
/// scan loop and the log writer have both finished.
///
/// # Errors
///
/// Returns an error if the sweep time is invalid or the log writer stops
/// while scanning.
pub async fn run_with(
    config: &Config,
    roster: Arc<Roster>,
    writer: LogWriter,
    source: Box<dyn FrameSource>,
    shutdown: ShutdownHandle,
) -> Result<RunSummary> {
    let sweep_time = config.sweep_time()?;
    let (log, writer_task) = writer.spawn(DEFAULT_QUEUE_CAPACITY);

    let scan = ScanLoop::new(
        Arc::clone(&roster),
        log.clone(),
        shutdown.clone(),
        ScanSettings::from(config),
    );
    let preview = preview_for(config);
    let scan_task = tokio::task::spawn_blocking({
        let shutdown = shutdown.clone();
        move || {
            let result = scan.run(source, preview);
            shutdown.stop("scan loop ended");
            result
        }
    });

    let mut scheduler = Scheduler::new();
    scheduler.register(
        ABSENCE_SWEEP,
        sweep_time,
        Local::now().naive_local(),
        config.schedule.catch_up_on_start,
    );

    let mut sweeps = 0;
    scheduler
        .run(
            config.tick_interval(),
            &shutdown,
            || Local::now().naive_local(),
            |_name, date| {
                sweeps += 1;
                run_sweep(log.clone(), Arc::clone(&roster), date)
            },
        )
        .await;

    drop(log);
    let stats: ScanStats = scan_task
        .await
        .map_err(|e| Error::internal(format!("scan loop panicked: {e}")))??;
    writer_task
        .await
        .map_err(|e| Error::internal(format!("log writer panicked: {e}")))?;

    let summary = RunSummary {
        frames: stats.frames,
        recorded: stats.recorded,
        sweeps,
    };
    info!(
        frames = summary.frames,
        recorded = summary.recorded,
        sweeps = summary.sweeps,
        "Attendance session finished"
    );
    Ok(summary)
}

async fn run_sweep(log: LogHandle, roster: Arc<Roster>, date: NaiveDate) {
    match log.sweep(date, roster).await {
        Ok(summary) => info!(
            %date,
            marked_absent = summary.marked_absent,
            "Scheduled absence sweep finished"
        ),
        Err(e) => error!(error = %e, %date, "Scheduled absence sweep failed"),
    }
}

fn preview_for(config: &Config) -> Box<dyn Preview> {
    match &config.camera.preview_path {
        Some(path) => Box::new(SnapshotPreview::new(path.clone())),
        None => Box::new(NoPreview),
    }
}

#[cfg(all(feature = "camera", target_os = "linux"))]
fn open_camera(config: &CameraConfig) -> Result<Box<dyn FrameSource>> {
    let camera = crate::scanner::camera::CameraSource::open(config)?;
    Ok(Box::new(camera))
}

#[cfg(not(all(feature = "camera", target_os = "linux")))]
fn open_camera(config: &CameraConfig) -> Result<Box<dyn FrameSource>> {
    Err(Error::camera_open(
        config.index,
        "camera support is not available in this build",
    ))
}

fn spawn_ctrl_c_listener(shutdown: ShutdownHandle) {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => shutdown.stop("ctrl-c"),
                Err(e) => warn!(error = %e, "Could not listen for Ctrl-C"),
            },
            () = shutdown.stopped() => {}
        }
    });
}

/// Stop when `quit_key` is entered on stdin.
///
/// Runs on a detached thread, since a blocked stdin read cannot be
/// cancelled and must not hold up runtime shutdown.
fn spawn_quit_key_listener(quit_key: String, shutdown: ShutdownHandle) {
    let spawned = std::thread::Builder::new()
        .name("quit-key".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) if is_quit(&line, &quit_key) => {
                        shutdown.stop("quit key");
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!(error = %e, "Stopped reading stdin");
                        return;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "Could not start quit key listener");
    }
}

fn is_quit(line: &str, quit_key: &str) -> bool {
    line.trim().eq_ignore_ascii_case(quit_key.trim())
}
