//! PDF fixtures built with lopdf.

use lopdf::dictionary;
use lopdf::{Document, Object, ObjectId, Stream};

/// Build a PDF with one page per entry. An empty entry yields a blank page.
pub fn make_test_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = build_document(pages);
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Build a single-page PDF whose trailer declares a standard security handler.
pub fn make_encrypted_pdf() -> Vec<u8> {
    let mut doc = build_document(&["Confidential estate inventory"]);
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "O" => Object::string_literal(vec![0u8; 32]),
        "U" => Object::string_literal(vec![0u8; 32]),
        "P" => -4,
    });
    doc.trailer.set("Encrypt", encrypt_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn build_document(pages: &[&str]) -> Document {
    let mut doc = Document::with_version("1.4");

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = pages
        .iter()
        .map(|text| add_page(&mut doc, pages_id, font_id, text).into())
        .collect();
    let count = kids.len() as i64;

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

fn add_page(doc: &mut Document, pages_id: ObjectId, font_id: ObjectId, text: &str) -> ObjectId {
    let content = if text.is_empty() {
        String::new()
    } else {
        format!("BT /F1 12 Tf 100 700 Td ({text}) Tj ET")
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        },
    })
}
