use std::fs;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use thiserror::Error;

use crate::utils::decode_image;

pub const DEFAULT_MAX_SIZE_KB: u64 = 1000;
pub const START_QUALITY: u8 = 95;
pub const QUALITY_STEP: u8 = 5;
pub const MIN_QUALITY: u8 = 30;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to write normalized image: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub path: PathBuf,
    pub quality: u8,
    pub size_bytes: u64,
    pub attempts: u32,
}

/// Re-encodes `source` as an RGB JPEG at `dest`, lowering quality from 95 in
/// steps of 5 until the file fits in `max_size_kb` or quality reaches 30. An
/// over-budget result at quality 30 is accepted.
pub fn normalize(
    source: &Path,
    dest: &Path,
    max_size_kb: u64,
) -> Result<NormalizedImage, NormalizeError> {
    let rgb = decode_image(source)?.to_rgb8();

    let mut quality = START_QUALITY;
    let mut attempts = 0;
    let encoded = loop {
        attempts += 1;
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, quality).encode_image(&rgb)?;

        let size_kb = buf.len() as u64 / 1024;
        if size_kb <= max_size_kb || quality <= MIN_QUALITY {
            break buf;
        }
        quality -= QUALITY_STEP;
    };

    fs::write(dest, &encoded)?;
    log::debug!(
        "normalized {} -> {} ({} bytes, quality {}, {} attempts)",
        source.display(),
        dest.display(),
        encoded.len(),
        quality,
        attempts
    );

    Ok(NormalizedImage {
        path: dest.to_path_buf(),
        quality,
        size_bytes: encoded.len() as u64,
        attempts,
    })
}

/// Intermediate copy of an upload. Removed when dropped, whether or not the
/// conversion that consumed it succeeded.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
}

impl TempUpload {
    pub fn create(path: PathBuf, bytes: &[u8]) -> std::io::Result<Self> {
        fs::write(&path, bytes)?;
        Ok(TempUpload { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                log::warn!(
                    "failed to remove temporary upload {}: {}",
                    self.path.display(),
                    err
                );
            }
        }
    }
}
