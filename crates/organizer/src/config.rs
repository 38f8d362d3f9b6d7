//! Engine configuration

use crate::rasterizer::DEFAULT_THUMBNAIL_DIMENSION;
use crate::{OrganizerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_PREVIEW_PAGE_CAP: usize = 20;
pub const DEFAULT_CHUNK_SIZE: usize = 3;
pub const DEFAULT_CHUNK_DELAY_MS: u64 = 50;
pub const DEFAULT_RENDER_TIMEOUT_MS: u64 = 5_000;

/// What a session produces when committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    /// Reorder/rotate/delete, then write every remaining page in display order
    #[default]
    Organize,
    /// Select pages, then write the selected ones in original order
    Extract,
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditMode::Organize => f.write_str("organize"),
            EditMode::Extract => f.write_str("extract"),
        }
    }
}

/// Organizer settings
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```json
/// { "mode": "extract", "previewPageCap": 50, "renderTimeoutMs": 2000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrganizerConfig {
    pub mode: EditMode,
    /// Only the first N pages get thumbnails; `null` renders every page.
    /// Pages past the cap are still part of the model.
    pub preview_page_cap: Option<usize>,
    /// Pages rendered concurrently per chunk
    pub chunk_size: usize,
    /// Pause between chunks
    pub chunk_delay_ms: u64,
    /// Time budget for a single page render
    pub render_timeout_ms: u64,
    /// Longest thumbnail side in pixels, for the built-in rasterizer
    pub thumbnail_max_dimension: u32,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            mode: EditMode::default(),
            preview_page_cap: Some(DEFAULT_PREVIEW_PAGE_CAP),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay_ms: DEFAULT_CHUNK_DELAY_MS,
            render_timeout_ms: DEFAULT_RENDER_TIMEOUT_MS,
            thumbnail_max_dimension: DEFAULT_THUMBNAIL_DIMENSION,
        }
    }
}

impl OrganizerConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| OrganizerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_mode(mut self, mode: EditMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(OrganizerError::Config(
                "chunkSize must be at least 1".to_string(),
            ));
        }
        if self.render_timeout_ms == 0 {
            return Err(OrganizerError::Config(
                "renderTimeoutMs must be greater than 0".to_string(),
            ));
        }
        if self.thumbnail_max_dimension == 0 {
            return Err(OrganizerError::Config(
                "thumbnailMaxDimension must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    /// How many of `total_pages` get a thumbnail
    pub fn pages_to_render(&self, total_pages: usize) -> usize {
        self.preview_page_cap
            .map_or(total_pages, |cap| cap.min(total_pages))
    }
}
