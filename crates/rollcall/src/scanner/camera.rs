//! V4L2 camera as a [`FrameSource`].

use image::GrayImage;
use rollcall_linux::{Camera, CameraSettings};

use super::frame;
use super::FrameSource;
use crate::config::CameraConfig;
use crate::error::{Error, Result};

/// Frames from a local video device.
#[derive(Debug)]
pub struct CameraSource {
    camera: Camera,
}

impl CameraSource {
    /// Open the device described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CameraOpen`] if the device cannot be opened or
    /// started.
    pub fn open(config: &CameraConfig) -> Result<Self> {
        let fourcc = fourcc(&config.format)
            .ok_or_else(|| Error::camera_open(config.index, "format must be four ASCII bytes"))?;
        let settings = CameraSettings {
            width: config.width,
            height: config.height,
            fourcc,
        };

        let camera = Camera::open(config.index, settings)
            .map_err(|e| Error::camera_open(config.index, e.to_string()))?;
        Ok(Self { camera })
    }
}

impl FrameSource for CameraSource {
    fn name(&self) -> &'static str {
        "camera"
    }

    fn next_frame(&mut self) -> Result<GrayImage> {
        let raw = self
            .camera
            .capture()
            .map_err(|e| Error::frame_capture(format!("{}: {e}", self.camera.device())))?;
        frame::to_luma(raw.fourcc, raw.width, raw.height, &raw.data)
    }
}

fn fourcc(format: &str) -> Option<[u8; 4]> {
    format.as_bytes().try_into().ok()
}
