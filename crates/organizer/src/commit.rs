//! Commit planning and replay
//!
//! A commit turns the page model into a list of steps (which original page goes
//! where, with which rotation) and replays them against the original source
//! through the codec. The source itself is never written to.

use crate::codec::DocumentCodec;
use crate::model::{PageModel, Rotation, SelectionMap};
use crate::source::SourceDocument;

/// One output page: copy `original_index`, then turn it by `rotation`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitStep {
    pub original_index: usize,
    pub rotation: Rotation,
}

/// Every entry in display order, with its rotation
pub fn organize_plan(model: &PageModel) -> Vec<CommitStep> {
    model
        .entries()
        .iter()
        .map(|entry| CommitStep {
            original_index: entry.original_index(),
            rotation: entry.rotation(),
        })
        .collect()
}

/// Selected pages in original document order, unrotated
pub fn extract_plan(selection: &SelectionMap) -> Vec<CommitStep> {
    selection
        .selected_indices()
        .into_iter()
        .map(|original_index| CommitStep {
            original_index,
            rotation: Rotation::R0,
        })
        .collect()
}

/// Build and serialize a new document from `plan`
///
/// Codec errors are returned untouched; nothing is retried.
pub fn replay<C>(codec: &C, source: &SourceDocument, plan: &[CommitStep]) -> pdf_core::Result<Vec<u8>>
where
    C: DocumentCodec + ?Sized,
{
    let indices: Vec<usize> = plan.iter().map(|step| step.original_index).collect();
    let mut output = codec.copy_pages(source, &indices)?;

    for (position, step) in plan.iter().enumerate() {
        if step.rotation != Rotation::R0 {
            codec.set_rotation(&mut output, position, step.rotation)?;
        }
    }

    codec.save(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntryId, MoveDirection, PageEntry, RotationDirection};
    use crate::source::DocumentId;
    use parking_lot::Mutex;
    use pdf_core::PdfError;
    use pretty_assertions::assert_eq;

    /// Records the calls it receives; output is the list of copied pages
    #[derive(Default)]
    struct RecordingCodec {
        rotations: Mutex<Vec<(usize, Rotation)>>,
        fail_save: bool,
    }

    impl DocumentCodec for RecordingCodec {
        type Output = Vec<usize>;

        fn page_count(&self, _source: &SourceDocument) -> pdf_core::Result<usize> {
            Ok(5)
        }

        fn copy_pages(
            &self,
            _source: &SourceDocument,
            indices: &[usize],
        ) -> pdf_core::Result<Vec<usize>> {
            Ok(indices.to_vec())
        }

        fn set_rotation(
            &self,
            _output: &mut Vec<usize>,
            position: usize,
            rotation: Rotation,
        ) -> pdf_core::Result<()> {
            self.rotations.lock().push((position, rotation));
            Ok(())
        }

        fn save(&self, output: Vec<usize>) -> pdf_core::Result<Vec<u8>> {
            if self.fail_save {
                return Err(PdfError::SaveError("disk full".to_string()));
            }
            Ok(output.into_iter().map(|i| i as u8).collect())
        }
    }

    fn source() -> SourceDocument {
        SourceDocument::new("plan.pdf", b"plan".to_vec())
    }

    #[test]
    fn test_organize_plan_follows_display_order() {
        let entries = (0..3)
            .map(|i| PageEntry::new(EntryId::new(i as u64), i))
            .collect();
        let mut model = PageModel::new(DocumentId::from_bytes(b"plan"), entries);
        model.move_entry(EntryId::new(2), MoveDirection::Up);
        model.rotate(EntryId::new(0), RotationDirection::CounterClockwise);

        let plan = organize_plan(&model);
        assert_eq!(
            plan,
            vec![
                CommitStep {
                    original_index: 0,
                    rotation: Rotation::R270
                },
                CommitStep {
                    original_index: 2,
                    rotation: Rotation::R0
                },
                CommitStep {
                    original_index: 1,
                    rotation: Rotation::R0
                },
            ]
        );

        let codec = RecordingCodec::default();
        let bytes = replay(&codec, &source(), &plan).unwrap();
        assert_eq!(bytes, vec![0, 2, 1]);
        // Unrotated pages are left alone
        assert_eq!(*codec.rotations.lock(), vec![(0, Rotation::R270)]);
    }

    #[test]
    fn test_extract_plan_sorts_selection() {
        let mut selection = SelectionMap::new(5);
        for index in [3, 0, 2] {
            selection.toggle(index);
        }

        let plan = extract_plan(&selection);
        let order: Vec<usize> = plan.iter().map(|s| s.original_index).collect();
        assert_eq!(order, vec![0, 2, 3]);
        assert!(plan.iter().all(|s| s.rotation == Rotation::R0));
    }

    #[test]
    fn test_replay_surfaces_codec_error() {
        let codec = RecordingCodec {
            fail_save: true,
            ..RecordingCodec::default()
        };
        let plan = [CommitStep {
            original_index: 0,
            rotation: Rotation::R0,
        }];

        let err = replay(&codec, &source(), &plan).unwrap_err();
        assert_eq!(err.to_string(), "Failed to save PDF: disk full");
    }
}
