//! `rollcall` - QR-code attendance recorder
//!
//! This library provides the roster and daily log storage, the camera scan
//! loop, the scheduled absence sweep and QR code generation used by the
//! `rollcall` binary.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod app;
pub mod attendance;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod error;
pub mod logging;
pub mod roster;
pub mod scanner;
pub mod scheduler;
pub mod shutdown;
pub mod storage;
pub mod sweeper;
pub mod writer;

pub use attendance::{AppendOutcome, AttendanceEntry, AttendanceStatus, SweepSummary};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use roster::{Roster, Student};
pub use shutdown::ShutdownHandle;
pub use storage::{DailyLog, LogStats};
pub use writer::{LogHandle, LogWriter};
