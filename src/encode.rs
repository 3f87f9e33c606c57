//! Re-encodes oversized images until they fit a byte budget

use std::path::{Path, PathBuf};

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tracing::debug;

use crate::constants::{COMMON_WIDTHS, QUALITY_LADDER};
use crate::error::EncodeError;
use crate::search::{Attempt, first_accepted};

/// One point of the encode grid.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EncodeSetting {
    /// Target width in pixels, never above the source width
    pub width: u32,
    /// JPEG quality, 1-100
    pub quality: u8,
}

/// A successful re-encode.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Fitted {
    /// Setting that produced the output
    pub setting: EncodeSetting,
    /// Size of the file written back
    pub bytes: u64,
}

/// Widths to try for a source image, largest first.
///
/// The source width itself, then every common width below it.
pub fn width_ladder(source_width: u32) -> Vec<u32> {
    let mut widths: Vec<u32> = std::iter::once(source_width)
        .chain(COMMON_WIDTHS.iter().copied())
        .filter(|width| *width > 0 && *width <= source_width)
        .collect();
    widths.sort_unstable_by(|a, b| b.cmp(a));
    widths.dedup();
    widths
}

/// The full search order: width-major (widest first), quality-minor (best first).
pub fn encode_grid(source_width: u32) -> Vec<EncodeSetting> {
    width_ladder(source_width)
        .into_iter()
        .flat_map(|width| {
            QUALITY_LADDER
                .iter()
                .map(move |quality| EncodeSetting {
                    width,
                    quality: *quality,
                })
        })
        .collect()
}

/// Walks `grid` in order and returns the first setting whose output is within `budget`.
///
/// `encode` is called once per setting tried; encoder failures reject that setting.
pub fn fit_with<F>(
    grid: &[EncodeSetting],
    budget: u64,
    mut encode: F,
) -> Option<(EncodeSetting, Vec<u8>)>
where
    F: FnMut(EncodeSetting) -> Result<Vec<u8>, EncodeError>,
{
    first_accepted(grid.iter().copied(), |setting| match encode(setting) {
        Ok(bytes) if bytes.len() as u64 <= budget => Attempt::Accepted((setting, bytes)),
        Ok(bytes) => Attempt::Rejected(format!(
            "{}px q{} is {} bytes",
            setting.width,
            setting.quality,
            bytes.len()
        )),
        Err(err) => Attempt::Rejected(err.to_string()),
    })
}

/// Scales `image` to `width` keeping the aspect ratio (never upscaling) and encodes a JPEG.
pub fn encode_jpeg(image: &DynamicImage, setting: EncodeSetting) -> Result<Vec<u8>, EncodeError> {
    let resized;
    let source = if setting.width < image.width() {
        let height = ((f64::from(image.height()) * f64::from(setting.width)
            / f64::from(image.width()))
        .round() as u32)
            .max(1);
        resized = image.resize_exact(setting.width, height, FilterType::Lanczos3);
        &resized
    } else {
        image
    };

    let rgb = source.to_rgb8();
    let mut output = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut output, setting.quality);
    encoder.encode_image(&rgb).map_err(EncodeError::Encode)?;
    Ok(output)
}

/// Finds the least lossy encoding of `image` that fits in `budget`.
pub fn fit_image(image: &DynamicImage, budget: u64) -> Option<(EncodeSetting, Vec<u8>)> {
    let grid = encode_grid(image.width());
    fit_with(&grid, budget, |setting| encode_jpeg(image, setting))
}

fn fit_file_blocking(path: &Path, budget: u64) -> Result<Fitted, EncodeError> {
    let data = std::fs::read(path)?;
    let image = image::load_from_memory(&data).map_err(EncodeError::Decode)?;
    debug!(
        "Re-encoding {} ({}x{}, {} bytes) to fit {} bytes",
        path.display(),
        image.width(),
        image.height(),
        data.len(),
        budget
    );
    let (setting, bytes) =
        fit_image(&image, budget).ok_or(EncodeError::BudgetUnreachable { budget })?;
    std::fs::write(path, &bytes)?;
    Ok(Fitted {
        setting,
        bytes: bytes.len() as u64,
    })
}

/// Rewrites the file at `path` so it fits in `budget`, off the async runtime.
///
/// On error the file is left untouched; the caller decides whether to delete it.
pub async fn fit_file_to_budget(path: PathBuf, budget: u64) -> Result<Fitted, EncodeError> {
    tokio::task::spawn_blocking(move || fit_file_blocking(&path, budget))
        .await
        .map_err(|err| EncodeError::Worker(err.to_string()))?
}
