use std::collections::BTreeMap;
use std::io::Write;

use flate2::{Compression, write::ZlibEncoder};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};
use rusttype::{Font, Scale};

use crate::foundation::error::{DocsealError, DocsealResult};

/// Font family name to TrueType file URL, with a default family.
///
/// Family lookup is case-insensitive. Deserializes from
/// `{"default_family": "...", "families": {"Name": "url", ...}}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FontRegistry {
    /// Family used when a field names none or names an unknown one.
    pub default_family: Option<String>,
    /// Family to font URL (http(s), `file://` or path).
    pub families: BTreeMap<String, String>,
}

impl FontRegistry {
    /// Empty registry with `default_family` as the fallback.
    pub fn new(default_family: impl Into<String>) -> Self {
        Self {
            default_family: Some(default_family.into()),
            families: BTreeMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with_font(mut self, family: impl Into<String>, url: impl Into<String>) -> Self {
        self.insert(family, url);
        self
    }

    /// Map `family` to `url`.
    pub fn insert(&mut self, family: impl Into<String>, url: impl Into<String>) {
        self.families.insert(family.into(), url.into());
    }

    fn lookup(&self, family: &str) -> Option<(&str, &str)> {
        let family = family.trim();
        self.families
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(family))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Resolve a requested family to `(family, url)`, falling back to the default family.
    pub fn resolve(&self, requested: Option<&str>) -> DocsealResult<(&str, &str)> {
        if let Some(hit) = requested.and_then(|f| self.lookup(f)) {
            return Ok(hit);
        }
        if let Some(hit) = self.default_family.as_deref().and_then(|f| self.lookup(f)) {
            return Ok(hit);
        }
        Err(DocsealError::embed(format!(
            "no font URL for family {:?} (default {:?})",
            requested.unwrap_or(""),
            self.default_family.as_deref().unwrap_or("")
        )))
    }
}

/// A TrueType font being embedded as a Type0 / CIDFontType2 composite font (Identity-H).
///
/// Glyph ids double as CIDs. Widths and the ToUnicode map only cover glyphs actually shown; the
/// font objects are written by [`EmbeddedFont::finish`] once every field has been drawn.
pub(crate) struct EmbeddedFont {
    font: Font<'static>,
    file: Vec<u8>,
    base_name: String,
    units_per_em: f64,
    font_id: ObjectId,
    used: BTreeMap<u16, (char, f64)>,
}

impl std::fmt::Debug for EmbeddedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedFont")
            .field("base_name", &self.base_name)
            .field("font_id", &self.font_id)
            .field("glyphs", &self.used.len())
            .finish()
    }
}

impl EmbeddedFont {
    /// Parse `bytes` and reserve the font's object id in `doc`.
    pub(crate) fn parse(doc: &mut Document, family: &str, bytes: Vec<u8>) -> DocsealResult<Self> {
        let font = Font::try_from_vec(bytes.clone()).ok_or_else(|| {
            DocsealError::embed(format!("font for family {family:?} is not a TrueType font"))
        })?;
        let units_per_em = f64::from(font.units_per_em());
        if units_per_em <= 0.0 {
            return Err(DocsealError::embed(format!(
                "font for family {family:?} has no units per em"
            )));
        }
        let mut base_name: String = family.chars().filter(char::is_ascii_alphanumeric).collect();
        if base_name.is_empty() {
            base_name.push_str("DocsealFont");
        }
        Ok(Self {
            font,
            file: bytes,
            base_name,
            units_per_em,
            font_id: doc.new_object_id(),
            used: BTreeMap::new(),
        })
    }

    /// Object id the page resources should point at.
    pub(crate) fn object_id(&self) -> ObjectId {
        self.font_id
    }

    /// Ascent and descent in 1/1000 text space units.
    pub(crate) fn vertical_metrics(&self) -> (f64, f64) {
        let v = self.font.v_metrics_unscaled();
        (
            f64::from(v.ascent) * 1000.0 / self.units_per_em,
            f64::from(v.descent) * 1000.0 / self.units_per_em,
        )
    }

    fn glyph_width(&self, c: char) -> (u16, f64) {
        let v = self.font.v_metrics_unscaled();
        // At a scale of (ascent - descent) rusttype reports metrics in font units.
        let unscaled = Scale::uniform(v.ascent - v.descent);
        let glyph = self.font.glyph(c);
        let gid = glyph.id().0;
        let advance = glyph.scaled(unscaled).h_metrics().advance_width;
        (gid, f64::from(advance) * 1000.0 / self.units_per_em)
    }

    /// Width of `text` at 1 pt, in points.
    pub(crate) fn measure(&self, text: &str) -> f64 {
        text.chars().map(|c| self.glyph_width(c).1).sum::<f64>() / 1000.0
    }

    /// Encode `text` as a hex string of 2-byte glyph ids, recording the glyphs used.
    pub(crate) fn encode(&mut self, text: &str) -> Object {
        let mut bytes = Vec::with_capacity(text.len() * 2);
        for c in text.chars() {
            let (gid, width) = self.glyph_width(c);
            self.used.entry(gid).or_insert((c, width));
            bytes.extend_from_slice(&gid.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }

    /// Write the font program, descriptor, descendant font, ToUnicode map and the Type0 font.
    pub(crate) fn finish(self, doc: &mut Document) -> DocsealResult<()> {
        let (ascent, descent) = self.vertical_metrics();

        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&self.file)
            .map_err(|e| DocsealError::embed(format!("compress font program: {e}")))?;
        let compressed = enc
            .finish()
            .map_err(|e| DocsealError::embed(format!("compress font program: {e}")))?;
        let file_id = doc.add_object(Stream::new(
            dictionary! {
                "Length1" => self.file.len() as i64,
                "Filter" => "FlateDecode",
            },
            compressed,
        ));

        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => Object::Name(self.base_name.as_bytes().to_vec()),
            "Flags" => 32,
            "FontBBox" => vec![
                Object::Integer(0),
                Object::Integer(descent.round() as i64),
                Object::Integer(1000),
                Object::Integer(ascent.round() as i64),
            ],
            "ItalicAngle" => 0,
            "Ascent" => ascent.round() as i64,
            "Descent" => descent.round() as i64,
            "CapHeight" => ascent.round() as i64,
            "StemV" => 80,
            "FontFile2" => file_id,
        });

        let mut widths = Vec::with_capacity(self.used.len() * 2);
        for (gid, (_, width)) in &self.used {
            widths.push(Object::Integer(i64::from(*gid)));
            widths.push(Object::Array(vec![Object::Real(width.round() as f32)]));
        }

        let cid_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => Object::Name(self.base_name.as_bytes().to_vec()),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "FontDescriptor" => descriptor_id,
            "DW" => 1000,
            "W" => widths,
            "CIDToGIDMap" => "Identity",
        });

        let to_unicode_id = doc.add_object(Stream::new(dictionary! {}, self.to_unicode_cmap()));

        doc.objects.insert(
            self.font_id,
            Object::Dictionary(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type0",
                "BaseFont" => Object::Name(self.base_name.as_bytes().to_vec()),
                "Encoding" => "Identity-H",
                "DescendantFonts" => vec![Object::Reference(cid_font_id)],
                "ToUnicode" => to_unicode_id,
            }),
        );
        Ok(())
    }

    fn to_unicode_cmap(&self) -> Vec<u8> {
        let mut out = String::from(
            "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
             /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
             1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
        );
        let entries: Vec<(u16, char)> = self.used.iter().map(|(g, (c, _))| (*g, *c)).collect();
        for chunk in entries.chunks(100) {
            out.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for (gid, c) in chunk {
                let mut units = [0u16; 2];
                let utf16: String = c
                    .encode_utf16(&mut units)
                    .iter()
                    .map(|u| format!("{u:04X}"))
                    .collect();
                out.push_str(&format!("<{gid:04X}> <{utf16}>\n"));
            }
            out.push_str("endbfchar\n");
        }
        out.push_str(
            "endcmap\nCMapName currentdict /CMapResource defineresource pop\nend\nend\n",
        );
        out.into_bytes()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/finalize/font.rs"]
mod tests;
