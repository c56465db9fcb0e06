use lopdf::{
    Stream, dictionary,
    content::{Content, Operation},
};

use super::*;

fn one_page_pdf(width: i64, height: i64, ops: Vec<Operation>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content = Content { operations: ops };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn pixel(img: &RasterImage, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * img.width + x) * 4) as usize;
    let p = &img.rgba8_premul[i..i + 4];
    [p[0], p[1], p[2], p[3]]
}

fn op(name: &str, operands: Vec<Object>) -> Operation {
    Operation::new(name, operands)
}

#[test]
fn media_box_is_inherited_from_page_tree() {
    let bytes = one_page_pdf(200, 100, vec![]);
    let r = PdfRasterizer::open(&bytes).unwrap();
    assert_eq!(r.page_count(), 1);
    assert_eq!(r.page_size(0).unwrap(), Size::new(200.0, 100.0));
    assert!(r.page_size(1).is_err());
}

#[test]
fn fills_land_in_device_space_with_flipped_y() {
    let bytes = one_page_pdf(
        200,
        100,
        vec![
            op("rg", vec![1.into(), 0.into(), 0.into()]),
            op("re", vec![0.into(), 0.into(), 100.into(), 100.into()]),
            op("f", vec![]),
            op("g", vec![0.into()]),
            op("re", vec![100.into(), 0.into(), 100.into(), 20.into()]),
            op("f", vec![]),
        ],
    );
    let mut r = PdfRasterizer::open(&bytes).unwrap();
    let img = r.rasterize(0, 1.0).unwrap();
    assert_eq!((img.width, img.height), (200, 100));

    assert_eq!(pixel(&img, 10, 50), [255, 0, 0, 255]);
    // The black band sits at the bottom of the page (PDF y = 0..20).
    assert_eq!(pixel(&img, 150, 95), [0, 0, 0, 255]);
    assert_eq!(pixel(&img, 150, 5), [255, 255, 255, 255]);
}

#[test]
fn scale_and_cm_compose() {
    let bytes = one_page_pdf(
        100,
        100,
        vec![
            op("q", vec![]),
            op(
                "cm",
                vec![1.into(), 0.into(), 0.into(), 1.into(), 50.into(), 50.into()],
            ),
            op("rg", vec![0.into(), 0.into(), 1.into()]),
            op("re", vec![0.into(), 0.into(), 50.into(), 50.into()]),
            op("f", vec![]),
            op("Q", vec![]),
            op("re", vec![0.into(), 0.into(), 10.into(), 10.into()]),
            op("f", vec![]),
        ],
    );
    let mut r = PdfRasterizer::open(&bytes).unwrap();
    let img = r.rasterize(0, 2.0).unwrap();
    assert_eq!((img.width, img.height), (200, 200));

    // Top-right quadrant is blue.
    assert_eq!(pixel(&img, 150, 50), [0, 0, 255, 255]);
    // After Q the fill color is black again and the cm is gone.
    assert_eq!(pixel(&img, 5, 195), [0, 0, 0, 255]);
    assert_eq!(pixel(&img, 50, 150), [255, 255, 255, 255]);
}

#[test]
fn text_operators_are_skipped() {
    let bytes = one_page_pdf(
        50,
        50,
        vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), 12.into()]),
            op("Td", vec![10.into(), 10.into()]),
            op("Tj", vec![Object::string_literal("hello")]),
            op("ET", vec![]),
        ],
    );
    let mut r = PdfRasterizer::open(&bytes).unwrap();
    let img = r.rasterize(0, 1.0).unwrap();
    assert!(img.rgba8_premul.iter().all(|&b| b == 255));
}

#[test]
fn rejects_non_pdf_bytes() {
    assert!(matches!(
        PdfRasterizer::open(b"not a pdf"),
        Err(DocsealError::UnsupportedFormat(_))
    ));
}

#[test]
fn device_colors_by_operand_count() {
    assert_eq!(device_color(&[0.5]), Some([128, 128, 128]));
    assert_eq!(device_color(&[1.0, 0.0, 0.0]), Some([255, 0, 0]));
    assert_eq!(device_color(&[0.0, 0.0, 0.0, 1.0]), Some([0, 0, 0]));
    assert_eq!(device_color(&[0.0, 1.0, 1.0, 0.0]), Some([255, 0, 0]));
    assert_eq!(device_color(&[1.0, 2.0]), None);
}

fn zlib(data: &[u8]) -> Vec<u8> {
    use std::io::Write;
    let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// 100x100 page painting image `Im1` over the whole sheet.
fn image_page_pdf(image: Dictionary, samples: Vec<u8>, alpha: Option<Vec<u8>>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut image = image;
    if let Some(alpha) = alpha {
        let mask = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 2,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            zlib(&alpha),
        ));
        image.set("SMask", mask);
    }
    let image_id = doc.add_object(Stream::new(image, samples));
    let content = Content {
        operations: vec![
            op("q", vec![]),
            op(
                "cm",
                vec![100.into(), 0.into(), 0.into(), 100.into(), 0.into(), 0.into()],
            ),
            op("Do", vec![Object::Name(b"Im1".to_vec())]),
            op("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), 100.into(), 100.into()],
        "Resources" => dictionary! { "XObject" => dictionary! { "Im1" => image_id } },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn rgb_image_dict(width: i64, height: i64, filtered: bool) -> Dictionary {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width,
        "Height" => height,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    if filtered {
        dict.set("Filter", "FlateDecode");
    }
    dict
}

#[test]
fn flate_image_with_soft_mask_is_painted() {
    let red = [255u8, 0, 0].repeat(4);
    let bytes = image_page_pdf(rgb_image_dict(2, 2, true), zlib(&red), Some(vec![255; 4]));
    let img = PdfRasterizer::open(&bytes).unwrap().rasterize(0, 1.0).unwrap();
    assert_eq!(pixel(&img, 50, 50), [255, 0, 0, 255]);
}

#[test]
fn transparent_soft_mask_leaves_the_page_white() {
    let red = [255u8, 0, 0].repeat(4);
    let bytes = image_page_pdf(rgb_image_dict(2, 2, true), zlib(&red), Some(vec![0; 4]));
    let img = PdfRasterizer::open(&bytes).unwrap().rasterize(0, 1.0).unwrap();
    assert_eq!(pixel(&img, 50, 50), [255, 255, 255, 255]);
}

#[test]
fn oversized_image_dimensions_are_skipped() {
    let huge = 4_294_967_296_i64;
    let bytes = image_page_pdf(rgb_image_dict(huge, huge, false), vec![0; 12], None);
    let img = PdfRasterizer::open(&bytes).unwrap().rasterize(0, 1.0).unwrap();
    assert_eq!(pixel(&img, 50, 50), [255, 255, 255, 255]);

    let bytes = image_page_pdf(rgb_image_dict(65_536, 65_536, false), vec![0; 12], None);
    let img = PdfRasterizer::open(&bytes).unwrap().rasterize(0, 1.0).unwrap();
    assert_eq!(pixel(&img, 50, 50), [255, 255, 255, 255]);
}
