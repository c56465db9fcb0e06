//! Filtered stream data.
//!
//! `lopdf` declines to decompress streams whose `/Subtype` is `/Image`, so image samples and soft
//! masks are inflated here. `FlateDecode` is undone together with its PNG or TIFF predictor.

use std::io::Read;

use flate2::read::ZlibDecoder;
use lopdf::{Dictionary, Document, Object, Stream};

use crate::render::pdf::{obj_to_f64, resolve};

/// Filter names of a stream, in application order.
pub(crate) fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter").ok().and_then(|f| resolve(doc, f)) {
        Some(Object::Name(n)) => vec![n.clone()],
        Some(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| match resolve(doc, o) {
                Some(Object::Name(n)) => Some(n.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// `/DecodeParms` entry matching filter `index`.
fn decode_parms<'a>(doc: &'a Document, dict: &'a Dictionary, index: usize) -> Option<&'a Dictionary> {
    match dict.get(b"DecodeParms").ok().and_then(|p| resolve(doc, p))? {
        Object::Dictionary(d) if index == 0 => Some(d),
        Object::Array(arr) => arr.get(index).and_then(|p| resolve(doc, p))?.as_dict().ok(),
        _ => None,
    }
}

/// Stream content with every filter undone, or `None` if one of them is not supported.
pub(crate) fn decoded_content(doc: &Document, stream: &Stream) -> Option<Vec<u8>> {
    let mut data = stream.content.clone();
    for (index, filter) in filter_names(doc, &stream.dict).iter().enumerate() {
        match filter.as_slice() {
            b"FlateDecode" | b"Fl" => {
                data = inflate(&data)?;
                data = unpredict(data, decode_parms(doc, &stream.dict, index))?;
            }
            _ => return None,
        }
    }
    Some(data)
}

/// Zlib inflate. Output up to a corrupt tail is kept.
pub(crate) fn inflate(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    match ZlibDecoder::new(data).read_to_end(&mut out) {
        Ok(_) => Some(out),
        Err(e) if !out.is_empty() => {
            tracing::debug!(error = %e, kept = out.len(), "truncated flate stream");
            Some(out)
        }
        Err(_) => None,
    }
}

fn unpredict(data: Vec<u8>, parms: Option<&Dictionary>) -> Option<Vec<u8>> {
    let param = |key: &[u8], default: usize| {
        parms
            .and_then(|p| p.get(key).ok())
            .and_then(obj_to_f64)
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map_or(default, |v| v as usize)
    };
    let predictor = param(b"Predictor", 1);
    if predictor < 2 {
        return Some(data);
    }

    let colors = param(b"Colors", 1).max(1);
    let bpc = param(b"BitsPerComponent", 8).max(1);
    let columns = param(b"Columns", 1).max(1);
    let bits_per_pixel = colors.checked_mul(bpc)?;
    let row_len = bits_per_pixel.checked_mul(columns)?.div_ceil(8);
    let bpp = bits_per_pixel.div_ceil(8);
    if row_len == 0 || row_len > data.len() {
        return None;
    }

    if predictor == 2 {
        if bpc != 8 {
            return None;
        }
        let mut data = data;
        for row in data.chunks_mut(row_len) {
            for i in bpp..row.len() {
                row[i] = row[i].wrapping_add(row[i - bpp]);
            }
        }
        return Some(data);
    }
    undo_png_rows(&data, row_len, bpp)
}

/// Reverse PNG row filters; every row starts with its filter type byte.
fn undo_png_rows(data: &[u8], row_len: usize, bpp: usize) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut prev = vec![0u8; row_len];
    for chunk in data.chunks(row_len.checked_add(1)?) {
        let (&kind, encoded) = chunk.split_first()?;
        let mut row = encoded.to_vec();
        row.resize(row_len, 0);
        for i in 0..row_len {
            let a = if i >= bpp { row[i - bpp] } else { 0 };
            let b = prev[i];
            let c = if i >= bpp { prev[i - bpp] } else { 0 };
            let predicted = match kind {
                0 => 0,
                1 => a,
                2 => b,
                3 => ((u16::from(a) + u16::from(b)) / 2) as u8,
                4 => paeth(a, b, c),
                _ => return None,
            };
            row[i] = row[i].wrapping_add(predicted);
        }
        out.extend_from_slice(&row);
        prev = row;
    }
    Some(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let pa = (p - i16::from(a)).abs();
    let pb = (p - i16::from(b)).abs();
    let pc = (p - i16::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/stream.rs"]
mod tests;
