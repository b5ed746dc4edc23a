//! Conversion of raw camera buffers into luma frames.
//!
//! QR detection only needs brightness, so every supported pixel format is
//! reduced to an 8-bit grayscale image.

use image::{GrayImage, ImageFormat};

use crate::error::{Error, Result};

/// Motion-JPEG, one JPEG image per frame.
pub const FOURCC_MJPG: [u8; 4] = *b"MJPG";
/// Packed YUV 4:2:2, luma in every even byte.
pub const FOURCC_YUYV: [u8; 4] = *b"YUYV";
/// 8-bit grayscale.
pub const FOURCC_GREY: [u8; 4] = *b"GREY";

/// Decode a raw buffer in `fourcc` format into a grayscale frame.
///
/// # Errors
///
/// Returns an error for unsupported formats and for buffers that are too
/// short or cannot be decoded.
pub fn to_luma(fourcc: [u8; 4], width: u32, height: u32, data: &[u8]) -> Result<GrayImage> {
    match fourcc {
        FOURCC_MJPG => image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map(|image| image.to_luma8())
            .map_err(|e| Error::frame_capture(format!("invalid MJPG frame: {e}"))),
        FOURCC_YUYV => {
            let pixels = pixel_count(width, height)?;
            if data.len() < pixels * 2 {
                return Err(short_buffer("YUYV", data.len(), pixels * 2));
            }
            let luma = data.iter().step_by(2).take(pixels).copied().collect();
            GrayImage::from_raw(width, height, luma)
                .ok_or_else(|| Error::frame_capture("YUYV frame size mismatch"))
        }
        FOURCC_GREY => {
            let pixels = pixel_count(width, height)?;
            if data.len() < pixels {
                return Err(short_buffer("GREY", data.len(), pixels));
            }
            GrayImage::from_raw(width, height, data[..pixels].to_vec())
                .ok_or_else(|| Error::frame_capture("GREY frame size mismatch"))
        }
        other => Err(Error::frame_capture(format!(
            "unsupported pixel format {}",
            String::from_utf8_lossy(&other)
        ))),
    }
}

fn pixel_count(width: u32, height: u32) -> Result<usize> {
    usize::try_from(u64::from(width) * u64::from(height))
        .map_err(|_| Error::frame_capture("frame dimensions too large"))
}

fn short_buffer(format: &str, got: usize, want: usize) -> Error {
    Error::frame_capture(format!(
        "{format} buffer too short: {got} bytes, expected {want}"
    ))
}
