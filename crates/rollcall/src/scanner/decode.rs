//! QR detection on luma frames.

use image::GrayImage;
use tracing::{debug, trace};

/// A QR code found in a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Corners of the code in frame coordinates, in drawing order.
    pub corners: [(i32, i32); 4],
    /// Decoded payload, or `None` if the grid was found but not readable.
    pub payload: Option<String>,
}

/// Finds and decodes every QR code in a frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrDecoder;

impl QrDecoder {
    /// Create a decoder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Detect all codes in `frame`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn detect(&self, frame: &GrayImage) -> Vec<Detection> {
        let (width, height) = frame.dimensions();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            width as usize,
            height as usize,
            |x, y| frame.get_pixel(x as u32, y as u32).0[0],
        );

        let detections: Vec<Detection> = prepared
            .detect_grids()
            .into_iter()
            .map(|grid| {
                let corners = grid.bounds.map(|point| (point.x, point.y));
                let payload = match grid.decode() {
                    Ok((_meta, content)) => Some(content),
                    Err(e) => {
                        debug!(error = ?e, "QR grid found but could not be decoded");
                        None
                    }
                };
                Detection { corners, payload }
            })
            .collect();

        trace!(count = detections.len(), "Frame inspected");
        detections
    }
}
