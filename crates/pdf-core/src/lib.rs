//! PDF Core - Low-level PDF page manipulation
//!
//! This crate provides functionality for:
//! - Opening and saving PDF documents
//! - Reading effective page attributes (MediaBox, Rotate) through the page tree
//! - Extracting an ordered subset of pages into a fresh document
//! - Setting page rotation
//! - Drawing low-resolution page-frame previews
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::PdfDocument;
//!
//! let source = PdfDocument::open("input.pdf")?;
//! // Pages 3, 1, 2 (0-based indices), in that order
//! let mut output = source.extract_pages(&[2, 0, 1])?;
//! output.set_page_rotation(0, 90)?;
//! output.save("output.pdf")?;
//! ```

mod document;
mod image;

pub use document::{PageSize, PdfDocument};
pub use image::{calculate_fit_dimensions, render_page_frame, PagePreview};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Invalid page index: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("Invalid rotation: {0} (must be a multiple of 90)")]
    InvalidRotation(i64),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Normalize a rotation in degrees to the range `0..360`
///
/// PDF only allows multiples of 90 for `/Rotate`; anything else is rejected.
pub fn normalize_rotation(degrees: i64) -> Result<i64> {
    if degrees % 90 != 0 {
        return Err(PdfError::InvalidRotation(degrees));
    }
    Ok(degrees.rem_euclid(360))
}
