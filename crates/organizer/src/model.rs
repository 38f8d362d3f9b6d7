//! Editable page model
//!
//! The page model is plain data: an ordered list of [`PageEntry`] values plus the
//! identity of the document they came from. Display order is the order of the
//! list and is unrelated to each entry's position in the original document.
//! Nothing here performs I/O.

use crate::rasterizer::Thumbnail;
use crate::source::DocumentId;
use crate::{OrganizerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Stable identity of a page entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(u64);

impl EntryId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page-{}", self.0)
    }
}

/// Direction of a quarter turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
}

/// Direction of a single-step move in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

/// Page rotation, always a multiple of 90 degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    #[serde(rename = "0")]
    R0,
    #[serde(rename = "90")]
    R90,
    #[serde(rename = "180")]
    R180,
    #[serde(rename = "270")]
    R270,
}

impl Rotation {
    /// Rotation in clockwise degrees
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Parse any multiple of 90 (negative values and full turns are normalized)
    pub fn from_degrees(degrees: i64) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::R0),
            90 => Some(Rotation::R90),
            180 => Some(Rotation::R180),
            _ => Some(Rotation::R270),
        }
    }

    /// The rotation after one quarter turn in `direction`
    pub fn rotated(self, direction: RotationDirection) -> Self {
        let step: i64 = match direction {
            RotationDirection::Clockwise => 90,
            RotationDirection::CounterClockwise => -90,
        };
        Self::from_degrees(self.degrees() as i64 + step).unwrap_or_default()
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// One page as currently arranged in the editor
#[derive(Debug, Clone, PartialEq)]
pub struct PageEntry {
    id: EntryId,
    original_index: usize,
    rotation: Rotation,
    thumbnail: Option<Arc<Thumbnail>>,
}

impl PageEntry {
    /// Create an unrotated entry without a thumbnail
    pub fn new(id: EntryId, original_index: usize) -> Self {
        Self {
            id,
            original_index,
            rotation: Rotation::R0,
            thumbnail: None,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: Option<Arc<Thumbnail>>) -> Self {
        self.thumbnail = thumbnail;
        self
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    /// 0-based index of this page in the original document
    pub fn original_index(&self) -> usize {
        self.original_index
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Preview image, absent when rendering failed, timed out or was skipped
    pub fn thumbnail(&self) -> Option<&Thumbnail> {
        self.thumbnail.as_deref()
    }
}

/// A single edit to the page model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Mutation {
    Rotate {
        id: EntryId,
        direction: RotationDirection,
    },
    RotateAll {
        direction: RotationDirection,
    },
    Delete {
        id: EntryId,
    },
    Move {
        id: EntryId,
        direction: MoveDirection,
    },
    Reset,
}

impl Mutation {
    /// Short operation name for logs and messages
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Rotate { .. } => "rotate",
            Mutation::RotateAll { .. } => "rotate_all",
            Mutation::Delete { .. } => "delete",
            Mutation::Move { .. } => "move",
            Mutation::Reset => "reset",
        }
    }
}

/// Ordered page entries built from one source document
#[derive(Debug, Clone, PartialEq)]
pub struct PageModel {
    source_document_id: DocumentId,
    entries: Vec<PageEntry>,
}

impl PageModel {
    pub fn new(source_document_id: DocumentId, entries: Vec<PageEntry>) -> Self {
        Self {
            source_document_id,
            entries,
        }
    }

    pub fn source_document_id(&self) -> &DocumentId {
        &self.source_document_id
    }

    /// Entries in display order
    pub fn entries(&self) -> &[PageEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display position of an entry
    pub fn position(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    pub fn get(&self, id: EntryId) -> Option<&PageEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Number of entries that have a thumbnail
    pub fn thumbnail_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.thumbnail.is_some())
            .count()
    }

    /// Turn one entry a quarter turn. Returns `false` if `id` is unknown.
    pub fn rotate(&mut self, id: EntryId, direction: RotationDirection) -> bool {
        match self.entries.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.rotation = entry.rotation.rotated(direction);
                true
            }
            None => false,
        }
    }

    /// Turn every entry a quarter turn
    pub fn rotate_all(&mut self, direction: RotationDirection) -> bool {
        for entry in &mut self.entries {
            entry.rotation = entry.rotation.rotated(direction);
        }
        !self.entries.is_empty()
    }

    /// Remove an entry
    ///
    /// At least one page must remain: deleting the only entry fails with
    /// [`OrganizerError::LastPage`] and leaves the model unchanged.
    pub fn delete(&mut self, id: EntryId) -> Result<bool> {
        let Some(position) = self.position(id) else {
            return Ok(false);
        };
        if self.entries.len() <= 1 {
            return Err(OrganizerError::LastPage);
        }
        self.entries.remove(position);
        Ok(true)
    }

    /// Swap an entry with its neighbor. Moving past either end is a no-op.
    pub fn move_entry(&mut self, id: EntryId, direction: MoveDirection) -> bool {
        let Some(position) = self.position(id) else {
            return false;
        };
        let target = match direction {
            MoveDirection::Up if position > 0 => position - 1,
            MoveDirection::Down if position + 1 < self.entries.len() => position + 1,
            _ => return false,
        };
        self.entries.swap(position, target);
        true
    }

    /// Back to original order and orientation, keeping ids and thumbnails
    ///
    /// Deleted pages are not restored.
    pub fn reset(&mut self) -> bool {
        let before: Vec<(EntryId, Rotation)> =
            self.entries.iter().map(|e| (e.id, e.rotation)).collect();

        self.entries.sort_by_key(|entry| entry.original_index);
        for entry in &mut self.entries {
            entry.rotation = Rotation::R0;
        }

        self.entries
            .iter()
            .map(|e| (e.id, e.rotation))
            .ne(before.into_iter())
    }

    /// Apply a [`Mutation`], returning whether anything changed
    pub fn apply(&mut self, mutation: &Mutation) -> Result<bool> {
        match *mutation {
            Mutation::Rotate { id, direction } => Ok(self.rotate(id, direction)),
            Mutation::RotateAll { direction } => Ok(self.rotate_all(direction)),
            Mutation::Delete { id } => self.delete(id),
            Mutation::Move { id, direction } => Ok(self.move_entry(id, direction)),
            Mutation::Reset => Ok(self.reset()),
        }
    }
}

/// Which original pages are selected for extraction
///
/// Keyed by original index, so selection is unaffected by display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionMap {
    selected: BTreeMap<usize, bool>,
}

impl SelectionMap {
    /// All `page_count` pages, none selected
    pub fn new(page_count: usize) -> Self {
        Self {
            selected: (0..page_count).map(|index| (index, false)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn is_selected(&self, original_index: usize) -> bool {
        self.selected.get(&original_index).copied().unwrap_or(false)
    }

    /// Flip one page. Returns `false` if the index is not part of the map.
    pub fn toggle(&mut self, original_index: usize) -> bool {
        match self.selected.get_mut(&original_index) {
            Some(flag) => {
                *flag = !*flag;
                true
            }
            None => false,
        }
    }

    pub fn select_all(&mut self) -> bool {
        let mut changed = false;
        for flag in self.selected.values_mut() {
            changed |= !*flag;
            *flag = true;
        }
        changed
    }

    pub fn clear(&mut self) -> bool {
        let mut changed = false;
        for flag in self.selected.values_mut() {
            changed |= *flag;
            *flag = false;
        }
        changed
    }

    pub fn selected_count(&self) -> usize {
        self.selected.values().filter(|flag| **flag).count()
    }

    /// Selected original indices, ascending
    pub fn selected_indices(&self) -> Vec<usize> {
        // BTreeMap iterates in key order
        self.selected
            .iter()
            .filter_map(|(index, flag)| flag.then_some(*index))
            .collect()
    }
}
