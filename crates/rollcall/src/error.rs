//! Error types for rollcall.
//!
//! This module defines all error types used throughout the rollcall crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for rollcall operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Roster Errors ===
    /// The roster file could not be read or parsed.
    #[error("failed to read roster {path}: {source}")]
    RosterRead {
        /// Path to the roster file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: csv::Error,
    },

    // === Attendance Log Errors ===
    /// The daily log file could not be opened, created or appended to.
    #[error("failed to access attendance log {path}: {source}")]
    LogAccess {
        /// Path to the log file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The daily log file exists but its rows could not be read or written.
    #[error("malformed attendance log {path}: {source}")]
    LogFormat {
        /// Path to the log file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: csv::Error,
    },

    /// The log writer has shut down and no longer accepts requests.
    #[error("attendance log writer is not running")]
    WriterClosed,

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Camera Errors ===
    /// The capture device could not be opened or started.
    #[error("failed to open camera {index}: {message}")]
    CameraOpen {
        /// Index of the video device.
        index: u32,
        /// Description of what went wrong.
        message: String,
    },

    /// A single frame could not be read or converted.
    #[error("failed to capture frame: {0}")]
    FrameCapture(String),

    // === QR Code Errors ===
    /// A payload could not be encoded as a QR code.
    #[error("failed to encode QR code for '{id}': {message}")]
    QrEncode {
        /// The identifier being encoded.
        id: String,
        /// Description of what went wrong.
        message: String,
    },

    /// An image could not be written to disk.
    #[error("failed to write image {path}: {source}")]
    ImageWrite {
        /// Destination path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: image::ImageError,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for rollcall operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a camera open error.
    #[must_use]
    pub fn camera_open(index: u32, message: impl Into<String>) -> Self {
        Self::CameraOpen {
            index,
            message: message.into(),
        }
    }

    /// Create a frame capture error.
    #[must_use]
    pub fn frame_capture(message: impl Into<String>) -> Self {
        Self::FrameCapture(message.into())
    }

    /// Check if this error should abort startup rather than be retried.
    ///
    /// Camera, log directory and configuration failures cannot be recovered
    /// by polling again; everything else is handled per iteration.
    #[must_use]
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Self::CameraOpen { .. }
                | Self::DirectoryCreate { .. }
                | Self::ConfigLoad(_)
                | Self::ConfigValidation { .. }
        )
    }

    /// Check if the log writer has gone away.
    #[must_use]
    pub fn is_writer_closed(&self) -> bool {
        matches!(self, Self::WriterClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::WriterClosed;
        assert_eq!(err.to_string(), "attendance log writer is not running");

        let err = Error::frame_capture("device busy");
        assert_eq!(err.to_string(), "failed to capture frame: device busy");
    }

    #[test]
    fn test_camera_open_is_startup_fatal() {
        let err = Error::camera_open(0, "no such device");
        assert!(err.is_startup_fatal());
        assert!(err.to_string().contains("camera 0"));
        assert!(err.to_string().contains("no such device"));
    }

    #[test]
    fn test_directory_create_is_startup_fatal() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.is_startup_fatal());
        assert!(err.to_string().contains("/root/forbidden"));
    }

    #[test]
    fn test_per_iteration_errors_are_not_fatal() {
        assert!(!Error::frame_capture("timeout").is_startup_fatal());
        assert!(!Error::WriterClosed.is_startup_fatal());
        assert!(!Error::internal("oops").is_startup_fatal());
    }

    #[test]
    fn test_is_writer_closed() {
        assert!(Error::WriterClosed.is_writer_closed());
        assert!(!Error::internal("x").is_writer_closed());
    }

    #[test]
    fn test_internal_error() {
        let err = Error::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "invalid sweep_time".to_string(),
        };
        assert!(err.is_startup_fatal());
        assert!(err.to_string().contains("invalid sweep_time"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_log_access_error_display() {
        let err = Error::LogAccess {
            path: PathBuf::from("/tmp/daily_attendance_2024-01-15.csv"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("daily_attendance_2024-01-15.csv"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_qr_encode_error_display() {
        let err = Error::QrEncode {
            id: "S1".to_string(),
            message: "data too long".to_string(),
        };
        assert!(err.to_string().contains("'S1'"));
    }
}
