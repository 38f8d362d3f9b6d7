//! Thumbnail preparation
//!
//! Pages are rendered in fixed-size chunks. Pages inside a chunk render
//! concurrently, chunks run one after another with a short pause in between,
//! so at most `chunk_size` renders are ever in flight. Every render is bounded
//! by a timeout, and a failed or timed-out page simply ends up without a
//! thumbnail.

use crate::config::OrganizerConfig;
use crate::rasterizer::{PageRasterizer, RasterError, Thumbnail};
use crate::source::{DocumentId, SourceDocument};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Preparation progress for the active document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "document", rename_all = "camelCase")]
pub enum PreparationState {
    #[default]
    NotStarted,
    InProgress(DocumentId),
    Done(DocumentId),
    Failed(DocumentId),
}

impl PreparationState {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, PreparationState::InProgress(_))
    }

    pub fn is_done(&self) -> bool {
        matches!(self, PreparationState::Done(_))
    }
}

/// Result of a `load_document` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum LoadOutcome {
    /// No document was supplied; the model was cleared
    Cleared,
    /// The model was built and published
    Prepared { pages: usize, thumbnails: usize },
    /// The same document is already being prepared by another call
    AlreadyInProgress,
    /// The same document was prepared before; nothing was done
    AlreadyPrepared,
    /// Another document replaced this one before it finished; results were dropped
    Superseded,
}

/// Render thumbnails for pages `0..page_count` of `source`
///
/// `is_current` is consulted before every chunk; once it returns `false` the
/// batch stops and `None` is returned. Otherwise the result has exactly
/// `page_count` slots in page order.
pub(crate) async fn rasterize_pages<R, F>(
    rasterizer: &R,
    source: &SourceDocument,
    page_count: usize,
    config: &OrganizerConfig,
    is_current: F,
) -> Option<Vec<Option<Arc<Thumbnail>>>>
where
    R: PageRasterizer + ?Sized,
    F: Fn() -> bool,
{
    let indices: Vec<usize> = (0..page_count).collect();
    let timeout = config.render_timeout();
    let mut thumbnails = Vec::with_capacity(page_count);

    for (chunk_number, chunk) in indices.chunks(config.chunk_size.max(1)).enumerate() {
        if chunk_number > 0 {
            tokio::time::sleep(config.chunk_delay()).await;
        }
        if !is_current() {
            debug!(
                document = %source.id(),
                rendered = thumbnails.len(),
                "preparation superseded, stopping"
            );
            return None;
        }

        let rendered = join_all(
            chunk
                .iter()
                .map(|&page_index| render_page(rasterizer, source, page_index, timeout)),
        )
        .await;
        thumbnails.extend(rendered);

        debug!(
            document = %source.id(),
            chunk = chunk_number,
            rendered = thumbnails.len(),
            total = page_count,
            "thumbnail chunk complete"
        );
    }

    Some(thumbnails)
}

/// Render one page under a time limit; failures are logged and become `None`
async fn render_page<R>(
    rasterizer: &R,
    source: &SourceDocument,
    page_index: usize,
    timeout: Duration,
) -> Option<Arc<Thumbnail>>
where
    R: PageRasterizer + ?Sized,
{
    // On timeout the render future is dropped here, releasing whatever it held
    let result = match tokio::time::timeout(timeout, rasterizer.render(source, page_index)).await
    {
        Ok(result) => result,
        Err(_) => Err(RasterError::Timeout {
            page: page_index,
            after: timeout,
        }),
    };

    match result {
        Ok(thumbnail) => Some(Arc::new(thumbnail)),
        Err(e) => {
            warn!(document = %source.id(), page = page_index, error = %e, "no thumbnail for page");
            None
        }
    }
}
