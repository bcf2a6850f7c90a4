//! Pixel comparison of an expected and an actual screenshot.

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView, Pixel, Rgba, RgbaImage};
use thiserror::Error;

use crate::schema::{ImageDiffResult, TestFile};

/// Result type for image comparison
pub type DiffResult<T> = Result<T, DiffError>;

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("Failed to read image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Image sizes differ: expected {expected:?}, actual {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn open(path: &Path) -> DiffResult<DynamicImage> {
    image::open(path).map_err(|source| DiffError::Image {
        path: path.to_path_buf(),
        source,
    })
}

fn test_file(path: &Path) -> TestFile {
    TestFile {
        relative_path: path.to_string_lossy().to_string(),
        absolute_path: fs::canonicalize(path)
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default(),
        public_url: String::new(),
    }
}

/// Per-pixel maximum channel difference, row-major
fn channel_deltas(expected: &RgbaImage, actual: &RgbaImage) -> Vec<u8> {
    expected
        .pixels()
        .zip(actual.pixels())
        .map(|(a, b)| {
            let (a, b) = (a.channels(), b.channels());
            (0..3)
                .map(|i| (i16::from(a[i]) - i16::from(b[i])).unsigned_abs() as u8)
                .max()
                .unwrap_or(0)
        })
        .collect()
}

/// Actual image with differing pixels blended toward red by their delta
fn write_overlay(actual: &RgbaImage, deltas: &[u8], path: &Path) -> DiffResult<()> {
    let mut out = actual.clone();
    for (pixel, delta) in out.pixels_mut().zip(deltas) {
        if *delta == 0 {
            continue;
        }
        // Differing pixels get at least half red so single-step changes stay visible
        let alpha = (f32::from(*delta) / 255.0).max(0.5);
        let base = pixel.0;
        *pixel = Rgba([
            ((1.0 - alpha) * f32::from(base[0]) + alpha * 255.0).round() as u8,
            ((1.0 - alpha) * f32::from(base[1])).round() as u8,
            ((1.0 - alpha) * f32::from(base[2])).round() as u8,
            base[3],
        ]);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| DiffError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    DynamicImage::ImageRgba8(out)
        .save(path)
        .map_err(|source| DiffError::Image {
            path: path.to_path_buf(),
            source,
        })
}

/// Compare two screenshots
///
/// A pixel differs when any RGB channel differs. `has_changed` is set when
/// the fraction of differing pixels exceeds `threshold`. When `diff_out` is
/// given, an overlay of the differences on the actual image is written there.
pub fn compare_images(
    expected: &Path,
    actual: &Path,
    diff_out: Option<&Path>,
    threshold: f64,
) -> DiffResult<ImageDiffResult> {
    let expected_image = open(expected)?;
    let actual_image = open(actual)?;
    if expected_image.dimensions() != actual_image.dimensions() {
        return Err(DiffError::DimensionMismatch {
            expected: expected_image.dimensions(),
            actual: actual_image.dimensions(),
        });
    }

    let expected_rgba = expected_image.to_rgba8();
    let actual_rgba = actual_image.to_rgba8();
    let deltas = channel_deltas(&expected_rgba, &actual_rgba);

    let total_pixels = deltas.len() as u64;
    let diff_pixel_count = deltas.iter().filter(|d| **d > 0).count() as u64;
    let diff_pixel_fraction = if total_pixels == 0 {
        0.0
    } else {
        diff_pixel_count as f64 / total_pixels as f64
    };

    let diff_image_file = match diff_out {
        Some(path) => {
            write_overlay(&actual_rgba, &deltas, path)?;
            Some(test_file(path))
        }
        None => None,
    };

    let result = ImageDiffResult {
        expected_image_file: Some(test_file(expected)),
        actual_image_file: Some(test_file(actual)),
        diff_image_file,
        diff_pixel_count,
        diff_pixel_fraction,
        has_changed: diff_pixel_fraction > threshold,
    };
    tracing::info!(
        expected = %expected.display(),
        actual = %actual.display(),
        diff_pixel_count,
        diff_pixel_fraction,
        has_changed = result.has_changed,
        "images compared"
    );
    Ok(result)
}
