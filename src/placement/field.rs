use crate::foundation::error::{DocsealError, DocsealResult};

/// How a field's signature was authored.
///
/// `draw` and `upload` are image signatures under another name; see
/// [`SignatureType::normalized`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureType {
    /// Typed text rendered with a font.
    #[default]
    Text,
    /// Drawn on a pad, stored as an image.
    Draw,
    /// Uploaded picture.
    Upload,
    /// Raster image.
    Image,
}

impl SignatureType {
    /// Collapse `draw` and `upload` into `image`.
    pub fn normalized(self) -> Self {
        match self {
            Self::Draw | Self::Upload => Self::Image,
            other => other,
        }
    }
}

/// Signature payload, decided once when the field is filled.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum FieldContent {
    /// Not filled yet.
    #[default]
    Empty,
    /// Typed signature.
    Text {
        /// The text to draw.
        text: String,
        /// Requested font family; the default family is used when absent.
        font_family: Option<String>,
    },
    /// Image signature: a `data:image/...;base64,` URL, bare base64, or an http(s) URL.
    Image {
        /// Encoded image reference.
        source: String,
    },
}

impl FieldContent {
    /// Typed text content.
    pub fn text(text: impl Into<String>, font_family: Option<String>) -> Self {
        Self::Text {
            text: text.into(),
            font_family,
        }
    }

    /// Image content.
    pub fn image(source: impl Into<String>) -> Self {
        Self::Image {
            source: source.into(),
        }
    }

    /// Whether there is no payload.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Content decided from loose host data: non-empty text wins over a non-empty image payload.
    pub fn from_parts(
        text: Option<String>,
        font_family: Option<String>,
        image: Option<String>,
    ) -> Self {
        let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
        if let Some(text) = non_empty(text) {
            return Self::Text {
                text,
                font_family: non_empty(font_family),
            };
        }
        match non_empty(image) {
            Some(source) => Self::Image { source },
            None => Self::Empty,
        }
    }

    /// The signature type this content implies, if any.
    pub fn signature_type(&self) -> Option<SignatureType> {
        match self {
            Self::Empty => None,
            Self::Text { .. } => Some(SignatureType::Text),
            Self::Image { .. } => Some(SignatureType::Image),
        }
    }
}

/// One signature placement on one slide.
///
/// `left`/`top` locate the field **center** as fractions of the slide's rendered size; `width` and
/// `height` are pixels at the reference design width.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "FieldRecord", into = "FieldRecord")]
pub struct SignatureField {
    /// Opaque unique id.
    pub id: String,
    /// Zero-based slide index. Out of range means "not renderable yet".
    pub slide_index: usize,
    /// Normalized center x in `[0,1]`.
    pub left: f64,
    /// Normalized center y in `[0,1]`.
    pub top: f64,
    /// Box width in px at the reference design width.
    pub width: f64,
    /// Box height in px at the reference design width.
    pub height: f64,
    /// Degrees; reserved.
    pub rotation: f64,
    /// Hex color for overlay styling and text glyphs.
    pub color: Option<String>,
    /// Owning recipient.
    pub recipient_email: String,
    /// Owning recipient's display name.
    pub recipients_name: Option<String>,
    /// Authoring type, always normalized (`draw`/`upload` become `image`).
    pub signature_type: SignatureType,
    /// Payload; `Empty` unless `signature_is_edit`.
    pub content: FieldContent,
    /// Whether the owning recipient has filled the field.
    pub signature_is_edit: bool,
    /// Copy-created fields cannot be moved or resized.
    pub signature_content_fixed: bool,
}

impl SignatureField {
    /// New unfilled field with a fresh UUID v4 id and the default 180x70 box.
    pub fn new(slide_index: usize, left: f64, top: f64, recipient_email: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            slide_index,
            left: unit(left),
            top: unit(top),
            width: crate::config::FALLBACK_BOX.width,
            height: crate::config::FALLBACK_BOX.height,
            rotation: 0.0,
            color: None,
            recipient_email: recipient_email.into(),
            recipients_name: None,
            signature_type: SignatureType::Text,
            content: FieldContent::Empty,
            signature_is_edit: false,
            signature_content_fixed: false,
        }
    }

    /// Builder-style size override.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Builder-style color override.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Builder-style fill.
    pub fn with_content(mut self, content: FieldContent) -> Self {
        self.set_content(content);
        self
    }

    /// Whether the field has been filled.
    pub fn is_signed(&self) -> bool {
        self.signature_is_edit && !self.content.is_empty()
    }

    /// Whether `email` owns this field (case-insensitive).
    pub fn belongs_to(&self, email: &str) -> bool {
        self.recipient_email.trim().eq_ignore_ascii_case(email.trim())
    }

    /// Set or clear the payload, keeping `signature_is_edit` and the type in step.
    pub fn set_content(&mut self, content: FieldContent) {
        match content.signature_type() {
            Some(ty) => {
                self.signature_type = ty;
                self.signature_is_edit = true;
            }
            None => self.signature_is_edit = false,
        }
        self.content = content;
    }

    pub(crate) fn validate(&self) -> DocsealResult<()> {
        if self.id.trim().is_empty() {
            return Err(DocsealError::validation("field id must not be empty"));
        }
        for (name, v) in [
            ("left", self.left),
            ("top", self.top),
            ("width", self.width),
            ("height", self.height),
            ("rotation", self.rotation),
        ] {
            if !v.is_finite() {
                return Err(DocsealError::validation(format!(
                    "field {}: {name} is not finite",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// Clamp into `[0,1]`; non-finite collapses to the middle.
pub(crate) fn unit(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.5 }
}

/// Flat camelCase layout the host application persists.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldRecord {
    /// `id`.
    pub id: String,
    /// `slideIndex`.
    pub slide_index: usize,
    /// `left` (normalized center x).
    pub left: f64,
    /// `top` (normalized center y).
    pub top: f64,
    /// `width` at the reference design width.
    pub width: f64,
    /// `height` at the reference design width.
    pub height: f64,
    /// `rotation`.
    pub rotation: f64,
    /// `color`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// `recipientEmail`.
    pub recipient_email: String,
    /// `recipientsName`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipients_name: Option<String>,
    /// `signatureType`, as stored (not normalized).
    pub signature_type: SignatureType,
    /// `signatureText`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_text: Option<String>,
    /// `signatureFontFamily`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_font_family: Option<String>,
    /// `signature`: data URL or opaque image payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// `signatureIsEdit`.
    pub signature_is_edit: bool,
    /// `signatureContentFixed`.
    pub signature_content_fixed: bool,
    /// Legacy soft-delete marker.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub signature_delete: bool,
}

impl TryFrom<FieldRecord> for SignatureField {
    type Error = DocsealError;

    fn try_from(r: FieldRecord) -> Result<Self, Self::Error> {
        let content = if r.signature_is_edit {
            FieldContent::from_parts(r.signature_text, r.signature_font_family, r.signature)
        } else {
            FieldContent::Empty
        };
        let signature_type = content
            .signature_type()
            .unwrap_or(r.signature_type.normalized());

        let field = Self {
            id: r.id,
            slide_index: r.slide_index,
            left: unit(r.left),
            top: unit(r.top),
            width: r.width,
            height: r.height,
            rotation: r.rotation,
            color: r.color.filter(|c| !c.trim().is_empty()),
            recipient_email: r.recipient_email,
            recipients_name: r.recipients_name,
            signature_type,
            signature_is_edit: !content.is_empty(),
            content,
            signature_content_fixed: r.signature_content_fixed,
        };
        field.validate()?;
        Ok(field)
    }
}

impl From<SignatureField> for FieldRecord {
    fn from(f: SignatureField) -> Self {
        let (signature_text, signature_font_family, signature) = match f.content {
            FieldContent::Empty => (None, None, None),
            FieldContent::Text { text, font_family } => (Some(text), font_family, None),
            FieldContent::Image { source } => (None, None, Some(source)),
        };
        Self {
            id: f.id,
            slide_index: f.slide_index,
            left: f.left,
            top: f.top,
            width: f.width,
            height: f.height,
            rotation: f.rotation,
            color: f.color,
            recipient_email: f.recipient_email,
            recipients_name: f.recipients_name,
            signature_type: f.signature_type,
            signature_text,
            signature_font_family,
            signature,
            signature_is_edit: f.signature_is_edit,
            signature_content_fixed: f.signature_content_fixed,
            signature_delete: false,
        }
    }
}

/// Partial update applied by [`crate::PlacementModel::update`]. `None` leaves a value unchanged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldPatch {
    /// Move to another slide.
    pub slide_index: Option<usize>,
    /// New normalized center x (clamped to `[0,1]`).
    pub left: Option<f64>,
    /// New normalized center y (clamped to `[0,1]`).
    pub top: Option<f64>,
    /// New width at the reference design width.
    pub width: Option<f64>,
    /// New height at the reference design width.
    pub height: Option<f64>,
    /// New rotation.
    pub rotation: Option<f64>,
    /// Set (`Some(Some(_))`) or clear (`Some(None)`) the color.
    pub color: Option<Option<String>>,
    /// Reassign to another recipient.
    pub recipient_email: Option<String>,
    /// Set or clear the recipient's display name.
    pub recipients_name: Option<Option<String>>,
    /// Fill (or, with `Empty`, clear) the payload.
    pub content: Option<FieldContent>,
    /// Lock or unlock position and size.
    pub signature_content_fixed: Option<bool>,
}

impl FieldPatch {
    /// Patch moving the center to `(left, top)`.
    pub fn position(left: f64, top: f64) -> Self {
        Self {
            left: Some(left),
            top: Some(top),
            ..Self::default()
        }
    }

    /// Patch resizing the box.
    pub fn size(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    pub(crate) fn apply(self, f: &mut SignatureField) {
        if let Some(v) = self.slide_index {
            f.slide_index = v;
        }
        if let Some(v) = self.left {
            f.left = unit(v);
        }
        if let Some(v) = self.top {
            f.top = unit(v);
        }
        if let Some(v) = self.width {
            f.width = v;
        }
        if let Some(v) = self.height {
            f.height = v;
        }
        if let Some(v) = self.rotation {
            f.rotation = v;
        }
        if let Some(v) = self.color {
            f.color = v;
        }
        if let Some(v) = self.recipient_email {
            f.recipient_email = v;
        }
        if let Some(v) = self.recipients_name {
            f.recipients_name = v;
        }
        if let Some(v) = self.content {
            f.set_content(v);
        }
        if let Some(v) = self.signature_content_fixed {
            f.signature_content_fixed = v;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/placement/field.rs"]
mod tests;
