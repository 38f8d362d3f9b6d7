//! Source document handle and identity

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Identity of a source document
///
/// Derived from the SHA-256 of the document bytes, so the same content loaded
/// twice under different names is recognized as already prepared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DocumentId(String);

impl DocumentId {
    /// Hash document bytes into an identity
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    /// Full hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Displays the first 12 hex digits, which is plenty to tell documents apart in logs
impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0[..self.0.len().min(12)])
    }
}

/// Read-only handle to an original document
///
/// Cloning is cheap: the bytes are shared, never copied or mutated.
#[derive(Clone)]
pub struct SourceDocument {
    id: DocumentId,
    name: String,
    bytes: Arc<[u8]>,
}

impl SourceDocument {
    /// Wrap document bytes
    ///
    /// # Arguments
    /// * `name` - Display name (usually the file name)
    /// * `bytes` - Serialized document
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        Self {
            id: DocumentId::from_bytes(&bytes),
            name: name.into(),
            bytes,
        }
    }

    /// Read a document from disk, named after its file name
    pub fn from_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDocument")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_follows_content() {
        let a = SourceDocument::new("a.pdf", b"same bytes".to_vec());
        let b = SourceDocument::new("b.pdf", b"same bytes".to_vec());
        let c = SourceDocument::new("a.pdf", b"other bytes".to_vec());

        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_display_is_short_prefix() {
        let id = DocumentId::from_bytes(b"hello");
        assert_eq!(id.as_str().len(), 64);
        assert_eq!(id.to_string(), &id.as_str()[..12]);
    }

    #[test]
    fn test_clone_shares_bytes() {
        let doc = SourceDocument::new("x.pdf", vec![1u8, 2, 3]);
        let copy = doc.clone();
        assert!(std::ptr::eq(doc.bytes().as_ptr(), copy.bytes().as_ptr()));
        assert_eq!(copy.len(), 3);
    }
}
