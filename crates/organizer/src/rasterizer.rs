//! Page rasterizer interface and the built-in page-frame rasterizer

use crate::config::OrganizerConfig;
use crate::source::{DocumentId, SourceDocument};
use async_trait::async_trait;
use parking_lot::Mutex;
use pdf_core::{render_page_frame, PagePreview, PdfDocument};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default longest side of a thumbnail in pixels
pub const DEFAULT_THUMBNAIL_DIMENSION: u32 = 200;

/// A low-resolution PNG preview of one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl From<PagePreview> for Thumbnail {
    fn from(preview: PagePreview) -> Self {
        Self {
            width: preview.width,
            height: preview.height,
            png: preview.png,
        }
    }
}

/// Errors produced while rendering a preview
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Rasterizer unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to render page {page}: {reason}")]
    Render { page: usize, reason: String },

    #[error("Rendering page {page} timed out after {after:?}")]
    Timeout { page: usize, after: Duration },
}

/// Produces previews of individual pages
///
/// Implementations may be slow or fail for individual pages; callers bound each
/// call with a timeout and drop the future when it expires, so implementations
/// must release their per-page resources on drop.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Resolves once the rasterizer can accept work
    ///
    /// Awaited once per preparation before any page is rendered. An error here
    /// aborts the whole load.
    async fn ready(&self) -> Result<(), RasterError> {
        Ok(())
    }

    /// Render one page (0-based index) of `source`
    async fn render(
        &self,
        source: &SourceDocument,
        page_index: usize,
    ) -> Result<Thumbnail, RasterError>;
}

/// Placeholder rasterizer that draws page outlines, not page content
///
/// Each preview is a blank sheet at the page's displayed aspect ratio with a
/// marker on its top edge, so shape and orientation are visible but text and
/// images are not. Use a content renderer behind [`PageRasterizer`] for real
/// previews. Parsing and drawing run on tokio's blocking pool.
/// The most recently parsed document is kept so a batch parses its source once.
pub struct PageFrameRasterizer {
    max_dimension: u32,
    parsed: Arc<Mutex<Option<(DocumentId, Arc<PdfDocument>)>>>,
}

impl PageFrameRasterizer {
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
            parsed: Arc::new(Mutex::new(None)),
        }
    }

    /// Size previews by `thumbnail_max_dimension`
    pub fn from_config(config: &OrganizerConfig) -> Self {
        Self::new(config.thumbnail_max_dimension)
    }

    fn cached(&self, id: &DocumentId) -> Option<Arc<PdfDocument>> {
        self.parsed
            .lock()
            .as_ref()
            .filter(|(cached_id, _)| cached_id == id)
            .map(|(_, doc)| Arc::clone(doc))
    }
}

impl Default for PageFrameRasterizer {
    fn default() -> Self {
        Self::new(DEFAULT_THUMBNAIL_DIMENSION)
    }
}

#[async_trait]
impl PageRasterizer for PageFrameRasterizer {
    async fn render(
        &self,
        source: &SourceDocument,
        page_index: usize,
    ) -> Result<Thumbnail, RasterError> {
        let cached = self.cached(source.id());
        let source = source.clone();
        let parsed = Arc::clone(&self.parsed);
        let max_dimension = self.max_dimension;

        let rendered = tokio::task::spawn_blocking(move || -> pdf_core::Result<PagePreview> {
            let doc = match cached {
                Some(doc) => doc,
                None => {
                    let doc = Arc::new(PdfDocument::open_from_bytes(source.bytes())?);
                    *parsed.lock() = Some((source.id().clone(), Arc::clone(&doc)));
                    doc
                }
            };
            render_page_frame(&doc, page_index, max_dimension)
        })
        .await
        .map_err(|e| RasterError::Render {
            page: page_index,
            reason: e.to_string(),
        })?;

        rendered.map(Thumbnail::from).map_err(|e| RasterError::Render {
            page: page_index,
            reason: e.to_string(),
        })
    }
}
