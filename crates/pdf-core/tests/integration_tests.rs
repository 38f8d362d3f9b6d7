//! Integration tests for pdf-core
//!
//! These tests verify end-to-end page operations on real PDF documents.

use lopdf::dictionary;
use pdf_core::{render_page_frame, PdfDocument, PdfError};
use pretty_assertions::assert_eq;

/// Create a minimal valid PDF with multiple pages for testing
///
/// Each page's content stream holds a `% page N` marker so tests can tell the
/// pages apart after reordering.
fn create_test_pdf_with_pages(page_count: usize) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.7");

    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::new();
    for i in 0..page_count {
        let contents_id = doc.add_object(lopdf::Stream::new(
            dictionary! {},
            format!("% page {}\n", i).into_bytes(),
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {},
            "Contents" => contents_id,
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        lopdf::Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => page_count as i64,
            "Kids" => page_ids.into_iter().map(lopdf::Object::from).collect::<Vec<_>>(),
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Create a two-level page tree: the intermediate node carries MediaBox and
/// Rotate that its two pages inherit
fn create_nested_test_pdf() -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.7");

    let root_id = doc.new_object_id();
    let branch_id = doc.new_object_id();

    let mut leaf_ids = Vec::new();
    for i in 0..2 {
        let contents_id = doc.add_object(lopdf::Stream::new(
            dictionary! {},
            format!("% page {}\n", i).into_bytes(),
        ));
        leaf_ids.push(doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => branch_id,
            "Contents" => contents_id,
        }));
    }

    let top_contents = doc.add_object(lopdf::Stream::new(dictionary! {}, b"% page 2\n".to_vec()));
    let top_page = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => root_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => top_contents,
    });

    doc.objects.insert(
        branch_id,
        lopdf::Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Parent" => root_id,
            "Count" => 2,
            "MediaBox" => vec![0.into(), 0.into(), 300.into(), 400.into()],
            "Rotate" => 90,
            "Kids" => leaf_ids.into_iter().map(lopdf::Object::from).collect::<Vec<_>>(),
        }),
    );
    doc.objects.insert(
        root_id,
        lopdf::Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => 3,
            "Kids" => vec![lopdf::Object::from(branch_id), lopdf::Object::from(top_page)],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => root_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Read back the `% page N` markers of every page, in order
fn page_markers(doc: &PdfDocument) -> Vec<String> {
    let inner = doc.inner();
    inner
        .get_pages()
        .values()
        .map(|page_id| {
            let content = inner.get_page_content(*page_id).unwrap();
            String::from_utf8_lossy(&content).trim().to_string()
        })
        .collect()
}

#[test]
fn test_open_from_bytes() {
    let doc = PdfDocument::open_from_bytes(&create_test_pdf_with_pages(3)).unwrap();
    assert_eq!(doc.page_count(), 3);
    assert_eq!(doc.get_page_ids().len(), 3);
}

#[test]
fn test_open_garbage_fails() {
    let result = PdfDocument::open_from_bytes(b"definitely not a pdf");
    assert!(matches!(result, Err(PdfError::OpenError(_))));
}

#[test]
fn test_extract_reorders_pages() {
    let doc = PdfDocument::open_from_bytes(&create_test_pdf_with_pages(4)).unwrap();
    let extracted = doc.extract_pages(&[3, 1, 0]).unwrap();

    assert_eq!(extracted.page_count(), 3);
    assert_eq!(
        page_markers(&extracted),
        vec!["% page 3", "% page 1", "% page 0"]
    );
}

#[test]
fn test_extract_leaves_source_untouched() {
    let doc = PdfDocument::open_from_bytes(&create_test_pdf_with_pages(4)).unwrap();
    let _ = doc.extract_pages(&[2]).unwrap();

    assert_eq!(doc.page_count(), 4);
    assert_eq!(
        page_markers(&doc),
        vec!["% page 0", "% page 1", "% page 2", "% page 3"]
    );
}

#[test]
fn test_extract_invalid_index_fails() {
    let doc = PdfDocument::open_from_bytes(&create_test_pdf_with_pages(2)).unwrap();
    let result = doc.extract_pages(&[0, 5]);
    assert!(matches!(result, Err(PdfError::InvalidPage(5, 2))));
}

#[test]
fn test_extract_same_page_twice() {
    let doc = PdfDocument::open_from_bytes(&create_test_pdf_with_pages(2)).unwrap();
    let mut extracted = doc.extract_pages(&[1, 1]).unwrap();

    assert_eq!(extracted.page_count(), 2);
    assert_eq!(page_markers(&extracted), vec!["% page 1", "% page 1"]);

    // The copies are distinct page objects, so rotating one leaves the other alone
    extracted.set_page_rotation(0, 90).unwrap();
    assert_eq!(extracted.page_rotation(0).unwrap(), 90);
    assert_eq!(extracted.page_rotation(1).unwrap(), 0);
}

#[test]
fn test_set_page_rotation_round_trips_through_bytes() {
    let doc = PdfDocument::open_from_bytes(&create_test_pdf_with_pages(2)).unwrap();
    let mut extracted = doc.extract_pages(&[0, 1]).unwrap();
    extracted.set_page_rotation(1, -90).unwrap();

    let bytes = extracted.to_bytes().unwrap();
    let reloaded = PdfDocument::open_from_bytes(&bytes).unwrap();

    assert_eq!(reloaded.page_rotation(0).unwrap(), 0);
    assert_eq!(reloaded.page_rotation(1).unwrap(), 270);
}

#[test]
fn test_set_page_rotation_rejects_odd_angle() {
    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf_with_pages(1)).unwrap();
    assert!(matches!(
        doc.set_page_rotation(0, 45),
        Err(PdfError::InvalidRotation(45))
    ));
}

#[test]
fn test_inherited_attributes() {
    let doc = PdfDocument::open_from_bytes(&create_nested_test_pdf()).unwrap();
    assert_eq!(doc.page_count(), 3);

    assert_eq!(doc.page_rotation(0).unwrap(), 90);
    assert_eq!(doc.page_size(0).unwrap().width, 300.0);
    assert_eq!(doc.page_rotation(2).unwrap(), 0);
    assert_eq!(doc.page_size(2).unwrap().height, 792.0);
}

#[test]
fn test_extract_flattens_nested_tree() {
    let doc = PdfDocument::open_from_bytes(&create_nested_test_pdf()).unwrap();
    let mut extracted = doc.extract_pages(&[2, 1]).unwrap();

    let bytes = extracted.to_bytes().unwrap();
    let reloaded = PdfDocument::open_from_bytes(&bytes).unwrap();

    assert_eq!(page_markers(&reloaded), vec!["% page 2", "% page 1"]);
    // Inherited values survive the loss of the intermediate node
    assert_eq!(reloaded.page_rotation(1).unwrap(), 90);
    assert_eq!(reloaded.page_size(1).unwrap().height, 400.0);
}

#[test]
fn test_invalid_page_index() {
    let doc = PdfDocument::open_from_bytes(&create_test_pdf_with_pages(1)).unwrap();
    assert!(matches!(
        doc.page_rotation(1),
        Err(PdfError::InvalidPage(1, 1))
    ));
}

#[test]
fn test_render_page_frame() {
    let doc = PdfDocument::open_from_bytes(&create_nested_test_pdf()).unwrap();

    // 300x400 rotated by 90 displays as landscape
    let preview = render_page_frame(&doc, 0, 80).unwrap();
    assert_eq!((preview.width, preview.height), (80, 60));
    assert_eq!(&preview.png[1..4], b"PNG");

    let preview = render_page_frame(&doc, 2, 80).unwrap();
    assert!(preview.height > preview.width);
}
