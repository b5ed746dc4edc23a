//! Linux-specific implementation for rollcall
//!
//! This crate opens a V4L2 video device and hands out raw frames. Pixel
//! decoding happens in the main crate.

#![cfg(target_os = "linux")]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::fmt;

use thiserror::Error;
use tracing::{debug, info};

/// Errors from the capture device.
#[derive(Debug, Error)]
pub enum CameraError {
    /// The device node could not be opened.
    #[error("cannot open {device}: {source}")]
    Open {
        /// Device path.
        device: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Streaming could not be started with the requested settings.
    #[error("cannot start {device}: {message}")]
    Start {
        /// Device path.
        device: String,
        /// Description of what went wrong.
        message: String,
    },

    /// A frame could not be dequeued.
    #[error("frame capture failed: {0}")]
    Capture(#[from] std::io::Error),
}

/// Requested capture settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraSettings {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format as a four character code.
    pub fourcc: [u8; 4],
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fourcc: *b"MJPG",
        }
    }
}

/// One undecoded frame.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format as a four character code.
    pub fourcc: [u8; 4],
    /// Frame bytes.
    pub data: Vec<u8>,
}

/// An open, streaming video device.
///
/// Streaming stops and the device is closed when the value is dropped.
pub struct Camera {
    device: String,
    inner: rscam::Camera,
}

impl fmt::Debug for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Camera")
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl Camera {
    /// Open `/dev/video<index>` and start streaming.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened or does not accept
    /// the requested settings.
    pub fn open(index: u32, settings: CameraSettings) -> Result<Self, CameraError> {
        let device = device_path(index);
        debug!(%device, ?settings, "Opening camera");

        let mut inner = rscam::new(&device).map_err(|source| CameraError::Open {
            device: device.clone(),
            source,
        })?;

        inner
            .start(&rscam::Config {
                interval: (1, 30),
                resolution: (settings.width, settings.height),
                format: &settings.fourcc,
                ..Default::default()
            })
            .map_err(|e| CameraError::Start {
                device: device.clone(),
                message: e.to_string(),
            })?;

        info!(%device, "Camera streaming");
        Ok(Self { device, inner })
    }

    /// Device path this camera was opened from.
    #[must_use]
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Block until the next frame is available.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to deliver a frame.
    pub fn capture(&self) -> Result<RawFrame, CameraError> {
        let frame = self.inner.capture()?;
        let (width, height) = frame.resolution;
        Ok(RawFrame {
            width,
            height,
            fourcc: frame.format,
            data: frame.to_vec(),
        })
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        debug!(device = %self.device, "Closing camera");
    }
}

/// Path of the video device with `index`.
#[must_use]
pub fn device_path(index: u32) -> String {
    format!("/dev/video{index}")
}
