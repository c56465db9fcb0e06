use std::io::Write;

use anyhow::Context;
use base64::{Engine as _, engine::general_purpose};
use flate2::{Compression, write::ZlibEncoder};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use crate::{
    foundation::error::{DocsealError, DocsealResult},
    source::{abort::AbortSignal, mime, resolve::SourceResolver},
};

/// An image XObject added to the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct EmbeddedImage {
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
}

/// Decode a `data:` URL or a bare base64 payload.
///
/// Whitespace inside the payload is ignored and missing padding is tolerated. A URL declaring
/// `image/png` or `image/jpeg` must carry bytes of that format; other declared types are left to
/// magic-byte sniffing.
pub(crate) fn decode_data_url(value: &str) -> DocsealResult<Vec<u8>> {
    let (declared, payload) = match value.trim().strip_prefix("data:") {
        Some(rest) => {
            let (meta, data) = rest
                .split_once(',')
                .ok_or_else(|| DocsealError::unsupported("data URL without payload"))?;
            if !meta.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
                return Err(DocsealError::unsupported(
                    "data URL is not base64 encoded",
                ));
            }
            (declared_image_mime(meta), data)
        }
        None => (None, value),
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = general_purpose::STANDARD
        .decode(&compact)
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(compact.trim_end_matches('=')))
        .map_err(|e| DocsealError::unsupported(format!("image payload is not base64: {e}")))?;

    if let Some(declared) = declared {
        let actual = mime::sniff(&bytes);
        if actual != Some(declared) {
            return Err(DocsealError::unsupported(format!(
                "data URL declares {declared} but carries {}",
                actual.unwrap_or("unrecognized bytes")
            )));
        }
    }
    Ok(bytes)
}

/// PNG or JPEG type named in the media type part of a data URL.
fn declared_image_mime(meta: &str) -> Option<&'static str> {
    let media = meta.split(';').next()?.trim();
    if media.eq_ignore_ascii_case(mime::PNG) {
        Some(mime::PNG)
    } else if media.eq_ignore_ascii_case(mime::JPEG) || media.eq_ignore_ascii_case("image/jpg") {
        Some(mime::JPEG)
    } else {
        None
    }
}

/// Bytes for an image field source: inline data, remote URL or local file.
pub(crate) async fn load_image_source(
    resolver: &SourceResolver,
    source: &str,
    abort: &AbortSignal,
) -> DocsealResult<Vec<u8>> {
    let source = source.trim();
    if source.starts_with("http://") || source.starts_with("https://") || source.starts_with("file://")
    {
        return resolver.fetch_bytes(source, abort).await;
    }
    decode_data_url(source)
}

/// Add PNG or JPEG bytes to `doc` as an image XObject.
///
/// JPEG data is passed through as `DCTDecode`. PNG is decoded and stored as Flate-compressed RGB,
/// plus an `SMask` when any pixel is not fully opaque.
pub(crate) fn embed_image(doc: &mut Document, bytes: &[u8]) -> DocsealResult<EmbeddedImage> {
    match mime::sniff(bytes) {
        Some(mime::JPEG) => embed_jpeg(doc, bytes),
        Some(mime::PNG) => embed_png(doc, bytes),
        Some(other) => Err(DocsealError::unsupported(format!(
            "cannot embed {other} signature images"
        ))),
        None => Err(DocsealError::unsupported(
            "signature image is neither PNG nor JPEG",
        )),
    }
}

fn embed_jpeg(doc: &mut Document, bytes: &[u8]) -> DocsealResult<EmbeddedImage> {
    let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg)
        .context("decode JPEG signature image")?;
    let (width, height) = (img.width(), img.height());
    let color_space = if img.color().channel_count() == 1 {
        "DeviceGray"
    } else {
        "DeviceRGB"
    };
    let id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        bytes.to_vec(),
    ));
    Ok(EmbeddedImage { id, width, height })
}

fn embed_png(doc: &mut Document, bytes: &[u8]) -> DocsealResult<EmbeddedImage> {
    let rgba = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .context("decode PNG signature image")?
        .to_rgba8();
    let (width, height) = rgba.dimensions();

    let pixels = (width as usize) * (height as usize);
    let mut rgb = Vec::with_capacity(pixels * 3);
    let mut alpha = Vec::with_capacity(pixels);
    for px in rgba.pixels() {
        rgb.extend_from_slice(&px.0[..3]);
        alpha.push(px.0[3]);
    }

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    if alpha.iter().any(|&a| a < 255) {
        let smask = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            deflate(&alpha)?,
        ));
        dict.set("SMask", Object::Reference(smask));
    }
    let id = doc.add_object(Stream::new(dict, deflate(&rgb)?));
    Ok(EmbeddedImage { id, width, height })
}

fn deflate(data: &[u8]) -> DocsealResult<Vec<u8>> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).context("compress image samples")?;
    Ok(enc.finish().context("compress image samples")?)
}

#[cfg(test)]
#[path = "../../tests/unit/finalize/image.rs"]
mod tests;
