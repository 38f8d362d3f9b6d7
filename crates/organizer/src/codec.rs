//! Document codec interface and its lopdf-backed implementation

use crate::model::Rotation;
use crate::source::{DocumentId, SourceDocument};
use parking_lot::Mutex;
use pdf_core::PdfDocument;
use std::sync::Arc;

/// Format-level primitives the engine needs from a document library
///
/// None of these may modify the source document.
pub trait DocumentCodec: Send + Sync {
    /// A freshly created output document
    type Output;

    /// Number of pages in the source; an error means the source is unreadable
    fn page_count(&self, source: &SourceDocument) -> pdf_core::Result<usize>;

    /// New document holding the given source pages (0-based) in the given order
    fn copy_pages(&self, source: &SourceDocument, indices: &[usize])
        -> pdf_core::Result<Self::Output>;

    /// Turn the page at `position` of `output` by `rotation`, relative to the
    /// orientation it was copied with
    fn set_rotation(
        &self,
        output: &mut Self::Output,
        position: usize,
        rotation: Rotation,
    ) -> pdf_core::Result<()>;

    /// Serialize the output document
    fn save(&self, output: Self::Output) -> pdf_core::Result<Vec<u8>>;
}

/// PDF codec built on `pdf_core`
///
/// The last parsed source is kept so page counting during preparation and the
/// later commit share one parse.
#[derive(Default)]
pub struct LopdfCodec {
    parsed: Mutex<Option<(DocumentId, Arc<PdfDocument>)>>,
}

impl LopdfCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(&self, source: &SourceDocument) -> pdf_core::Result<Arc<PdfDocument>> {
        if let Some((id, doc)) = self.parsed.lock().as_ref() {
            if id == source.id() {
                return Ok(Arc::clone(doc));
            }
        }

        let doc = Arc::new(PdfDocument::open_from_bytes(source.bytes())?);
        *self.parsed.lock() = Some((source.id().clone(), Arc::clone(&doc)));
        Ok(doc)
    }
}

impl DocumentCodec for LopdfCodec {
    type Output = PdfDocument;

    fn page_count(&self, source: &SourceDocument) -> pdf_core::Result<usize> {
        Ok(self.parse(source)?.page_count())
    }

    fn copy_pages(
        &self,
        source: &SourceDocument,
        indices: &[usize],
    ) -> pdf_core::Result<PdfDocument> {
        self.parse(source)?.extract_pages(indices)
    }

    fn set_rotation(
        &self,
        output: &mut PdfDocument,
        position: usize,
        rotation: Rotation,
    ) -> pdf_core::Result<()> {
        let current = output.page_rotation(position)?;
        output.set_page_rotation(position, current + rotation.degrees() as i64)
    }

    fn save(&self, mut output: PdfDocument) -> pdf_core::Result<Vec<u8>> {
        output.to_bytes()
    }
}
