//! Low-resolution page previews

use crate::{PdfDocument, PdfError, Result};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

impl From<image::ImageError> for PdfError {
    fn from(err: image::ImageError) -> Self {
        PdfError::ImageError(err.to_string())
    }
}

const PAPER: Rgb<u8> = Rgb([255, 255, 255]);
const EDGE: Rgb<u8> = Rgb([160, 160, 160]);
const SPINE: Rgb<u8> = Rgb([210, 210, 210]);

/// A PNG-encoded page preview
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePreview {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// PNG bytes
    pub png: Vec<u8>,
}

/// Fit a `width` x `height` box inside a square of `max_dimension` pixels,
/// preserving aspect ratio
///
/// # Returns
/// (width, height) in whole pixels, never smaller than 1
pub fn calculate_fit_dimensions(width: f64, height: f64, max_dimension: u32) -> (u32, u32) {
    if width <= 0.0 || height <= 0.0 {
        return (max_dimension.max(1), max_dimension.max(1));
    }

    let scale = max_dimension as f64 / width.max(height);
    let fitted_width = (width * scale).round().max(1.0) as u32;
    let fitted_height = (height * scale).round().max(1.0) as u32;
    (fitted_width, fitted_height)
}

/// Draw a page-frame preview: a blank sheet with the page's displayed aspect
/// ratio, an outline, and a marker along the edge that is the page's top
///
/// # Arguments
/// * `doc` - Source document
/// * `index` - Page index (0-based)
/// * `max_dimension` - Longest side of the preview in pixels
pub fn render_page_frame(doc: &PdfDocument, index: usize, max_dimension: u32) -> Result<PagePreview> {
    let rotation = doc.page_rotation(index)?;
    let size = doc.page_size(index)?.displayed(rotation);
    let (width, height) = calculate_fit_dimensions(size.width, size.height, max_dimension);

    let mut canvas = RgbImage::from_pixel(width, height, PAPER);

    // The top of the unrotated page ends up on a different edge after rotation
    let marker = (width.min(height) / 12).max(1);
    for y in 0..height {
        for x in 0..width {
            let on_marker = match rotation {
                90 => x >= width.saturating_sub(marker),
                180 => y >= height.saturating_sub(marker),
                270 => x < marker,
                _ => y < marker,
            };
            if on_marker {
                canvas.put_pixel(x, y, SPINE);
            }
        }
    }

    for x in 0..width {
        canvas.put_pixel(x, 0, EDGE);
        canvas.put_pixel(x, height - 1, EDGE);
    }
    for y in 0..height {
        canvas.put_pixel(0, y, EDGE);
        canvas.put_pixel(width - 1, y, EDGE);
    }

    let mut png = Cursor::new(Vec::new());
    canvas.write_to(&mut png, ImageFormat::Png)?;

    Ok(PagePreview {
        width,
        height,
        png: png.into_inner(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_portrait() {
        let (w, h) = calculate_fit_dimensions(612.0, 792.0, 200);
        assert_eq!(h, 200);
        assert_eq!(w, 155);
    }

    #[test]
    fn test_fit_landscape() {
        let (w, h) = calculate_fit_dimensions(792.0, 612.0, 200);
        assert_eq!(w, 200);
        assert_eq!(h, 155);
    }

    #[test]
    fn test_fit_degenerate_box() {
        assert_eq!(calculate_fit_dimensions(0.0, 100.0, 64), (64, 64));
    }

    #[test]
    fn test_fit_never_collapses_to_zero() {
        let (w, h) = calculate_fit_dimensions(10_000.0, 1.0, 100);
        assert_eq!(w, 100);
        assert_eq!(h, 1);
    }
}
