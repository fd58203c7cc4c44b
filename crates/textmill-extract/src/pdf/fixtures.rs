// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory PDF fixtures for tests: digital documents with a real text
// layer, and scanner-style documents whose pages are image XObjects.

use image::GrayImage;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use std::io::Cursor;

/// A digital PDF with one page per entry, each carrying the given text in
/// its text layer (Helvetica, standard encoding).
pub fn digital_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = digital_document(pages);
    save(&mut doc)
}

/// A one-page digital PDF with a populated trailer Info dictionary.
pub fn pdf_with_info(title: &str, author: &str, creation_date: &str) -> Vec<u8> {
    let mut doc = digital_document(&["Metadata carrier page"]);
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
        "Author" => Object::string_literal(author),
        "CreationDate" => Object::string_literal(creation_date),
    });
    doc.trailer.set("Info", info_id);
    save(&mut doc)
}

/// A scanner-style PDF: each `Some(img)` page embeds the grayscale image as
/// a raw `DeviceGray` XObject; each `None` page has no image at all.
pub fn scanned_pdf(pages: &[Option<&GrayImage>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();

    for page in pages {
        let page_id = match page {
            Some(img) => {
                let img_id = doc.add_object(gray_xobject(img));
                image_page(&mut doc, pages_id, Some(img_id), 612, 792)
            }
            None => image_page(&mut doc, pages_id, None, 612, 792),
        };
        kids.push(page_id.into());
    }

    finish(&mut doc, pages_id, kids);
    save(&mut doc)
}

/// A one-page scanner-style PDF with a custom media box (points), for
/// exercising density-based scaling.
pub fn scanned_single(img: &GrayImage, media_w_pt: i64, media_h_pt: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let img_id = doc.add_object(gray_xobject(img));
    let page_id = image_page(&mut doc, pages_id, Some(img_id), media_w_pt, media_h_pt);
    finish(&mut doc, pages_id, vec![page_id.into()]);
    save(&mut doc)
}

/// A one-page scanned PDF whose image is JPEG-compressed (`DCTDecode`).
pub fn scanned_single_jpeg(img: &GrayImage) -> Vec<u8> {
    let mut jpeg = Vec::new();
    image::DynamicImage::ImageLuma8(img.clone())
        .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
        .expect("jpeg encode");

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let (w, h) = img.dimensions();
    let img_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => w as i64,
            "Height" => h as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg,
    ));
    let page_id = image_page(&mut doc, pages_id, Some(img_id), 612, 792);
    finish(&mut doc, pages_id, vec![page_id.into()]);
    save(&mut doc)
}

fn digital_document(pages: &[&str]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let mut kids: Vec<Object> = Vec::new();

    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content encode"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    doc
}

fn gray_xobject(img: &GrayImage) -> Stream {
    let (w, h) = img.dimensions();
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => w as i64,
            "Height" => h as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        img.as_raw().clone(),
    )
}

fn image_page(
    doc: &mut Document,
    pages_id: lopdf::ObjectId,
    image_id: Option<lopdf::ObjectId>,
    media_w_pt: i64,
    media_h_pt: i64,
) -> lopdf::ObjectId {
    let operations = match image_id {
        Some(_) => vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    media_w_pt.into(),
                    0.into(),
                    0.into(),
                    media_h_pt.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ],
        None => vec![],
    };
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("content encode"),
    ));

    let mut page = dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), media_w_pt.into(), media_h_pt.into()],
    };
    if let Some(img_id) = image_id {
        page.set(
            "Resources",
            dictionary! { "XObject" => dictionary! { "Im0" => img_id } },
        );
    }
    doc.add_object(page)
}

fn finish(doc: &mut Document, pages_id: lopdf::ObjectId, kids: Vec<Object>) {
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
}

fn save(doc: &mut Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialise fixture PDF");
    bytes
}
