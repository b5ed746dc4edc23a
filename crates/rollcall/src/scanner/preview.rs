//! Display surface for scanned frames.
//!
//! The overlay is cosmetic: it outlines detected codes and never affects
//! what gets recorded.

use std::path::PathBuf;

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use tracing::{debug, info};

use super::decode::Detection;
use crate::error::{Error, Result};

/// Outline color for detected codes.
const OVERLAY_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

/// Somewhere to show frames while scanning.
pub trait Preview: Send {
    /// Show `frame` with `detections` outlined.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be displayed.
    fn show(&mut self, frame: &GrayImage, detections: &[Detection]) -> Result<()>;

    /// Close the surface. Called once when scanning ends.
    fn close(&mut self);
}

/// Preview that shows nothing.
#[derive(Debug, Default)]
pub struct NoPreview;

impl Preview for NoPreview {
    fn show(&mut self, _frame: &GrayImage, _detections: &[Detection]) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) {}
}

/// Writes the latest frame containing a code to a PNG file.
#[derive(Debug)]
pub struct SnapshotPreview {
    path: PathBuf,
    written: u64,
}

impl SnapshotPreview {
    /// Create a preview writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            written: 0,
        }
    }

    /// Number of snapshots written so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl Preview for SnapshotPreview {
    fn show(&mut self, frame: &GrayImage, detections: &[Detection]) -> Result<()> {
        if detections.is_empty() {
            return Ok(());
        }
        annotate(frame, detections)
            .save(&self.path)
            .map_err(|source| Error::ImageWrite {
                path: self.path.clone(),
                source,
            })?;
        self.written += 1;
        Ok(())
    }

    fn close(&mut self) {
        info!(
            path = %self.path.display(),
            snapshots = self.written,
            "Preview closed"
        );
    }
}

/// Color copy of `frame` with every detection outlined.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn annotate(frame: &GrayImage, detections: &[Detection]) -> RgbImage {
    let mut canvas = DynamicImage::ImageLuma8(frame.clone()).to_rgb8();
    for detection in detections {
        let corners = detection.corners;
        for (i, &(x1, y1)) in corners.iter().enumerate() {
            let (x2, y2) = corners[(i + 1) % corners.len()];
            draw_line_segment_mut(
                &mut canvas,
                (x1 as f32, y1 as f32),
                (x2 as f32, y2 as f32),
                OVERLAY_COLOR,
            );
        }
    }
    debug!(outlined = detections.len(), "Frame annotated");
    canvas
}
