//! Organizer - page organize/extract engine
//!
//! This crate provides:
//! - An identity-stable, editable page model (rotate, delete, move, select)
//! - One-shot document preparation with chunked, time-boxed thumbnail rendering
//! - Commit of the edited model into a new document, built from the untouched
//!   original source
//!
//! Document parsing and serialization come from a [`DocumentCodec`]
//! ([`LopdfCodec`] for PDF), previews from a [`PageRasterizer`].
//! [`PageFrameRasterizer`] is a placeholder rasterizer: it draws page outlines
//! without page content. Plug in a real renderer for content previews.
//!
//! # Example
//!
//! ```ignore
//! use organizer::{EditMode, LopdfCodec, Organizer, OrganizerConfig, PageFrameRasterizer, SourceDocument};
//!
//! let config = OrganizerConfig::default().with_mode(EditMode::Extract);
//! let organizer = Organizer::new(LopdfCodec::new(), PageFrameRasterizer::default(), config)?;
//! organizer.load_document(Some(SourceDocument::from_path("report.pdf")?)).await?;
//!
//! organizer.toggle_selection(4)?;
//! organizer.toggle_selection(1)?;
//! let pdf_bytes = organizer.commit_extract()?; // pages 2 and 5, in that order
//! ```

pub mod codec;
pub mod commit;
pub mod config;
mod engine;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod rasterizer;
mod source;

pub use codec::{DocumentCodec, LopdfCodec};
pub use config::{EditMode, OrganizerConfig};
pub use engine::{Organizer, Snapshot};
pub use model::{
    EntryId, MoveDirection, Mutation, PageEntry, PageModel, Rotation, RotationDirection,
    SelectionMap,
};
pub use notify::{ChannelNotifier, Notification, Notifier, NotifyLevel, TracingNotifier};
pub use pipeline::{LoadOutcome, PreparationState};
pub use rasterizer::{PageFrameRasterizer, PageRasterizer, RasterError, Thumbnail};
pub use source::{DocumentId, SourceDocument};

use pdf_core::PdfError;
use thiserror::Error;

/// Errors that can occur while organizing pages
#[derive(Debug, Error)]
pub enum OrganizerError {
    #[error("No document loaded")]
    NoDocument,

    #[error("Document {0} is still being prepared")]
    NotReady(DocumentId),

    #[error("Cannot delete the last remaining page")]
    LastPage,

    #[error("There are no pages to save")]
    EmptyModel,

    #[error("No pages selected")]
    EmptySelection,

    #[error("{operation} is not available in {mode} mode")]
    WrongMode {
        operation: &'static str,
        mode: EditMode,
    },

    #[error("Failed to load {name} ({document}): {reason}")]
    Load {
        name: String,
        document: DocumentId,
        reason: String,
    },

    #[error("Failed to {operation} {document}: {source}")]
    Commit {
        operation: &'static str,
        document: DocumentId,
        source: PdfError,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl OrganizerError {
    /// Policy rejections leave state untouched and are reported as warnings
    pub fn is_policy_rejection(&self) -> bool {
        matches!(
            self,
            OrganizerError::LastPage | OrganizerError::EmptyModel | OrganizerError::EmptySelection
        )
    }
}

/// Result type for organizer operations
pub type Result<T> = std::result::Result<T, OrganizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = OrganizerError::WrongMode {
            operation: "commit_extract",
            mode: EditMode::Organize,
        };
        assert_eq!(
            err.to_string(),
            "commit_extract is not available in organize mode"
        );

        let id = DocumentId::from_bytes(b"x");
        let err = OrganizerError::Commit {
            operation: "organize",
            document: id.clone(),
            source: PdfError::SaveError("disk full".to_string()),
        };
        assert_eq!(
            err.to_string(),
            format!("Failed to organize {}: Failed to save PDF: disk full", id)
        );
    }

    #[test]
    fn test_policy_rejections() {
        assert!(OrganizerError::LastPage.is_policy_rejection());
        assert!(OrganizerError::EmptySelection.is_policy_rejection());
        assert!(!OrganizerError::NoDocument.is_policy_rejection());
    }
}
