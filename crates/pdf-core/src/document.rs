//! PDF Document wrapper

use crate::{normalize_rotation, PdfError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;
use std::path::Path;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Maximum page tree depth followed when resolving inherited attributes
const MAX_TREE_DEPTH: usize = 32;

/// A4 MediaBox used when a page declares no box at all
const A4_WIDTH: f64 = 595.28;
const A4_HEIGHT: f64 = 841.89;

/// Page dimensions in points, as declared by the MediaBox
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    /// Dimensions as displayed once `rotation` degrees are applied
    pub fn displayed(self, rotation: i64) -> Self {
        if rotation.rem_euclid(180) == 90 {
            Self {
                width: self.height,
                height: self.width,
            }
        } else {
            self
        }
    }
}

/// PDF Document wrapper providing page-level operations
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
}

impl PdfDocument {
    /// Open a PDF document from a file path
    ///
    /// # Arguments
    /// * `path` - Path to the PDF file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let inner = Document::load(path).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Self::from_document(inner)
    }

    /// Open a PDF document from bytes
    ///
    /// # Arguments
    /// * `data` - PDF file bytes
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Self::from_document(inner)
    }

    /// Wrap an already parsed lopdf document
    ///
    /// Fails when the document has no reachable page tree.
    pub fn from_document(inner: Document) -> Result<Self> {
        Self::pages_root_id(&inner).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Get all page object IDs in display order
    pub fn get_page_ids(&self) -> Vec<ObjectId> {
        let pages = self.inner.get_pages();
        pages.values().copied().collect()
    }

    /// Get a reference to the underlying lopdf document
    pub fn inner(&self) -> &Document {
        &self.inner
    }

    /// Get a mutable reference to the underlying lopdf document
    pub fn inner_mut(&mut self) -> &mut Document {
        &mut self.inner
    }

    /// Effective rotation of a page in degrees (`0`, `90`, `180` or `270`)
    ///
    /// # Arguments
    /// * `index` - Page index (0-based)
    pub fn page_rotation(&self, index: usize) -> Result<i64> {
        let page_id = self.page_id(index)?;
        match self.get_inherited_attribute(page_id, b"Rotate")? {
            Some(value) => {
                let degrees = self.resolve(&value)?.as_i64().map_err(|_| {
                    PdfError::ParseError("Rotate is not an integer".to_string())
                })?;
                normalize_rotation(degrees)
            }
            None => Ok(0),
        }
    }

    /// Set the rotation of a page, replacing any inherited value
    ///
    /// # Arguments
    /// * `index` - Page index (0-based)
    /// * `degrees` - Rotation, any multiple of 90 (normalized to `0..360`)
    pub fn set_page_rotation(&mut self, index: usize, degrees: i64) -> Result<()> {
        let degrees = normalize_rotation(degrees)?;
        let page_id = self.page_id(index)?;

        let page_dict = self
            .inner
            .get_object_mut(page_id)?
            .as_dict_mut()
            .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?;
        page_dict.set("Rotate", Object::Integer(degrees));

        Ok(())
    }

    /// Get the MediaBox dimensions of a page
    ///
    /// Handles MediaBox inherited from parent Pages nodes and falls back to A4
    /// when no box is declared anywhere in the chain.
    ///
    /// # Arguments
    /// * `index` - Page index (0-based)
    pub fn page_size(&self, index: usize) -> Result<PageSize> {
        let page_id = self.page_id(index)?;

        let media_box = match self.get_inherited_attribute(page_id, b"MediaBox")? {
            Some(value) => value,
            None => match self.get_inherited_attribute(page_id, b"CropBox")? {
                Some(value) => value,
                None => {
                    return Ok(PageSize {
                        width: A4_WIDTH,
                        height: A4_HEIGHT,
                    })
                }
            },
        };

        let media_box_array = self
            .resolve(&media_box)?
            .as_array()
            .map_err(|_| PdfError::ParseError("MediaBox is not an array".to_string()))?;

        size_from_media_box(media_box_array)
    }

    /// Build a new document containing the given pages, in the given order
    ///
    /// The source document is left untouched; the result is an independent
    /// document whose page tree is flat and whose pages carry their inherited
    /// attributes explicitly. A page index may appear more than once.
    ///
    /// # Arguments
    /// * `indices` - Page indices (0-based) in output order
    ///
    /// # Example
    /// ```ignore
    /// let doc = PdfDocument::open("five-pages.pdf")?;
    /// let reversed = doc.extract_pages(&[4, 3, 2, 1, 0])?;
    /// assert_eq!(reversed.page_count(), 5);
    /// ```
    pub fn extract_pages(&self, indices: &[usize]) -> Result<PdfDocument> {
        let page_ids = self.get_page_ids();
        let page_count = page_ids.len();

        if let Some(&bad) = indices.iter().find(|&&index| index >= page_count) {
            return Err(PdfError::InvalidPage(bad, page_count));
        }

        let mut inner = self.inner.clone();
        let pages_id = Self::pages_root_id(&inner)?;

        let mut kids = Vec::with_capacity(indices.len());
        let mut placed: HashSet<ObjectId> = HashSet::new();

        for &index in indices {
            let source_id = page_ids[index];
            let mut page_dict = self
                .inner
                .get_object(source_id)?
                .as_dict()
                .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?
                .clone();

            // Intermediate Pages nodes are dropped, so inherited values move onto the page
            for key in INHERITABLE_KEYS {
                if !page_dict.has(key) {
                    if let Some(value) = self.get_inherited_attribute(source_id, key)? {
                        page_dict.set(key.to_vec(), value);
                    }
                }
            }
            page_dict.set("Parent", Object::Reference(pages_id));

            let target_id = if placed.insert(source_id) {
                inner.objects.insert(source_id, Object::Dictionary(page_dict));
                source_id
            } else {
                inner.add_object(Object::Dictionary(page_dict))
            };
            kids.push(Object::Reference(target_id));
        }

        let mut pages_dict = inner
            .get_object(pages_id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Pages object is not a dictionary".to_string()))?
            .clone();
        pages_dict.set("Kids", Object::Array(kids));
        pages_dict.set("Count", Object::Integer(indices.len() as i64));
        inner.objects.insert(pages_id, pages_dict.into());

        // Outline entries may point at pages that are no longer part of the tree
        let catalog_id = Self::catalog_id(&inner)?;
        if let Ok(catalog) = inner
            .get_object_mut(catalog_id)
            .and_then(Object::as_dict_mut)
        {
            catalog.remove(b"Outlines");
        }

        inner.prune_objects();

        Ok(PdfDocument { inner })
    }

    /// Save the document to a file
    ///
    /// # Arguments
    /// * `path` - Output file path
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.inner
            .save(path)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(())
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;

        Ok(buffer)
    }

    /// Object ID of a page by 0-based index
    fn page_id(&self, index: usize) -> Result<ObjectId> {
        let pages = self.inner.get_pages();
        pages
            .get(&(index as u32 + 1))
            .copied()
            .ok_or(PdfError::InvalidPage(index, pages.len()))
    }

    /// Follow a reference to its target object (direct objects are returned as is)
    fn resolve<'a>(&'a self, object: &'a Object) -> Result<&'a Object> {
        match object {
            Object::Reference(ref_id) => Ok(self.inner.get_object(*ref_id)?),
            other => Ok(other),
        }
    }

    /// Get a page attribute, following the parent inheritance chain if needed
    fn get_inherited_attribute(&self, page_id: ObjectId, key: &[u8]) -> Result<Option<Object>> {
        let mut current_id = page_id;

        for _ in 0..MAX_TREE_DEPTH {
            let dict = self
                .inner
                .get_object(current_id)?
                .as_dict()
                .map_err(|_| PdfError::ParseError("Object is not a dictionary".to_string()))?;

            if let Ok(value) = dict.get(key) {
                return Ok(Some(value.clone()));
            }

            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => current_id = *parent_id,
                _ => break,
            }
        }

        Ok(None)
    }

    /// Object ID of the document catalog
    fn catalog_id(doc: &Document) -> Result<ObjectId> {
        let trailer = doc
            .trailer
            .get(b"Root")
            .map_err(|_| PdfError::ParseError("Document trailer missing Root entry".to_string()))?;
        trailer
            .as_reference()
            .map_err(|_| PdfError::ParseError("Root is not a reference".to_string()))
    }

    /// Object ID of the root Pages node
    fn pages_root_id(doc: &Document) -> Result<ObjectId> {
        let catalog_id = Self::catalog_id(doc)?;
        let catalog_dict: &Dictionary = doc
            .get_object(catalog_id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Catalog is not a dictionary".to_string()))?;
        catalog_dict
            .get(b"Pages")
            .map_err(|_| PdfError::ParseError("Catalog missing Pages entry".to_string()))?
            .as_reference()
            .map_err(|_| PdfError::ParseError("Pages is not a reference".to_string()))
    }
}

/// Width and height from a `[x1 y1 x2 y2]` box array
fn size_from_media_box(media_box_array: &[Object]) -> Result<PageSize> {
    if media_box_array.len() < 4 {
        return Err(PdfError::ParseError("Invalid MediaBox format".to_string()));
    }

    let number = |object: &Object, name: &str| -> Result<f64> {
        object
            .as_f32()
            .map(|v| v as f64)
            .ok()
            .or_else(|| object.as_i64().ok().map(|v| v as f64))
            .ok_or_else(|| PdfError::ParseError(format!("Invalid MediaBox {}", name)))
    };

    let x1 = number(&media_box_array[0], "x1")?;
    let y1 = number(&media_box_array[1], "y1")?;
    let x2 = number(&media_box_array[2], "x2")?;
    let y2 = number(&media_box_array[3], "y2")?;

    Ok(PageSize {
        width: (x2 - x1).abs(),
        height: (y2 - y1).abs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_displayed_size_swaps_for_quarter_turns() {
        let size = PageSize {
            width: 100.0,
            height: 200.0,
        };
        assert_eq!(size.displayed(0), size);
        assert_eq!(size.displayed(180), size);
        assert_eq!(
            size.displayed(90),
            PageSize {
                width: 200.0,
                height: 100.0
            }
        );
        assert_eq!(size.displayed(270).width, 200.0);
    }

    #[test]
    fn test_size_from_media_box() {
        let media_box = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ];
        let size = size_from_media_box(&media_box).unwrap();
        assert_eq!(size.width, 612.0);
        assert_eq!(size.height, 792.0);
    }

    #[test]
    fn test_size_from_short_media_box_fails() {
        let media_box = vec![Object::Integer(0), Object::Integer(0)];
        assert!(size_from_media_box(&media_box).is_err());
    }
}
