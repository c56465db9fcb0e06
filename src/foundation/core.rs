pub use kurbo::{Affine, Point, Rect, Size, Vec2};

/// Rendered (display) geometry of one slide, in CSS-like pixels.
///
/// This is what overlays are positioned against and what finalization derives its
/// screen-to-PDF scale factors from.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SlideGeometry {
    /// Zero-based slide index.
    pub index: usize,
    /// Current rendered width.
    pub width: f64,
    /// Current rendered height.
    pub height: f64,
}

impl SlideGeometry {
    /// Display size as a [`Size`].
    pub fn size(self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Whether both dimensions are finite and positive.
    pub fn is_usable(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// The whole slide in normalized coordinates.
pub const FULL_SLIDE: Rect = Rect::new(0.0, 0.0, 1.0, 1.0);

/// Straight (non-premultiplied) RGB color with components in `[0,1]`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RgbColor {
    /// Red channel.
    pub r: f32,
    /// Green channel.
    pub g: f32,
    /// Blue channel.
    pub b: f32,
}

impl RgbColor {
    /// Neutral gray used when a field carries no usable color (`#9CA3AF`).
    pub const NEUTRAL_GRAY: Self = Self::from_rgb8(0x9C, 0xA3, 0xAF);

    /// Opaque black.
    pub const BLACK: Self = Self::from_rgb8(0, 0, 0);

    /// Build from 8-bit channels.
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Parse `#RRGGBB`, `RRGGBB`, `#RGB` or `RGB`.
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        match hex.len() {
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Self::from_rgb8(r, g, b))
            }
            3 => {
                let nib = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
                Some(Self::from_rgb8(nib(0)?, nib(1)?, nib(2)?))
            }
            _ => None,
        }
    }

    /// Parse an optional hex string, falling back to [`RgbColor::NEUTRAL_GRAY`].
    pub fn parse_or_neutral(s: Option<&str>) -> Self {
        s.and_then(Self::parse_hex).unwrap_or(Self::NEUTRAL_GRAY)
    }

    /// Quantize back to 8-bit channels.
    pub fn to_rgb8(self) -> [u8; 3] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
