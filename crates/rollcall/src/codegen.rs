//! QR code image generation.
//!
//! Writes one `qr_<ID>.png` per roster identifier. The payload of each code
//! is the bare identifier, which is exactly what the scan loop looks up.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use image::{GrayImage, Luma};
use qrcode::{EcLevel, QrCode};
use regex::Regex;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::roster::Roster;

/// Default size of one QR module in pixels.
pub const DEFAULT_MODULE_SIZE: u32 = 10;

/// Identifiers that can be used verbatim inside a file name.
fn safe_id() -> &'static Regex {
    static SAFE_ID: OnceLock<Regex> = OnceLock::new();
    SAFE_ID.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("static regex is valid"))
}

/// Whether `id` can be written as `qr_<id>.png` without leaving the directory.
#[must_use]
pub fn is_file_safe(id: &str) -> bool {
    safe_id().is_match(id) && id != "." && id != ".."
}

/// File name used for the code of `id`.
#[must_use]
pub fn image_file_name(id: &str) -> String {
    format!("qr_{id}.png")
}

/// Render `id` as a QR code image.
///
/// Uses error correction level L, the smallest version that fits, and a
/// four-module quiet zone.
///
/// # Errors
///
/// Returns an error if the payload cannot be encoded.
pub fn render(id: &str, module_size: u32) -> Result<GrayImage> {
    let code = QrCode::with_error_correction_level(id.as_bytes(), EcLevel::L).map_err(|e| {
        Error::QrEncode {
            id: id.to_string(),
            message: e.to_string(),
        }
    })?;

    Ok(code
        .render::<Luma<u8>>()
        .quiet_zone(true)
        .module_dimensions(module_size, module_size)
        .build())
}

/// Generate codes for every student in the roster at `roster_path`.
///
/// # Errors
///
/// Returns an error if the roster cannot be read, the output directory
/// cannot be created, or an image cannot be written.
pub fn generate(
    roster_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>> {
    let roster = Roster::load(roster_path)?;
    generate_for(&roster, output_dir, DEFAULT_MODULE_SIZE)
}

/// Generate codes for every student in `roster`.
///
/// Identifiers that are not safe as file names are skipped with a warning.
/// Returns the paths written, in roster order.
///
/// # Errors
///
/// Returns an error if the output directory cannot be created or an image
/// cannot be written.
pub fn generate_for(
    roster: &Roster,
    output_dir: impl AsRef<Path>,
    module_size: u32,
) -> Result<Vec<PathBuf>> {
    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir).map_err(|source| Error::DirectoryCreate {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(roster.len());
    for student in roster.iter() {
        if !is_file_safe(&student.id) {
            warn!(id = %student.id, "Skipping ID that is not usable as a file name");
            continue;
        }

        let path = output_dir.join(image_file_name(&student.id));
        render(&student.id, module_size)?
            .save(&path)
            .map_err(|source| Error::ImageWrite {
                path: path.clone(),
                source,
            })?;

        info!(id = %student.id, path = %path.display(), "QR code generated");
        written.push(path);
    }

    Ok(written)
}
