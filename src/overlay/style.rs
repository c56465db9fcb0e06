use crate::foundation::core::RgbColor;

/// Border stroke pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderStyle {
    /// Continuous line.
    Solid,
    /// Dashed line.
    Dashed,
}

/// Mouse cursor shown over the overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cursor {
    /// Clickable.
    Pointer,
    /// Inert.
    Default,
}

/// Visual state of one overlay.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OverlayStyle {
    /// Border and tint color.
    pub color: RgbColor,
    /// Border pattern.
    pub border: BorderStyle,
    /// Alpha of the background tint drawn in `color`.
    pub background_alpha: f32,
    /// Whole-overlay opacity.
    pub opacity: f32,
    /// Cursor.
    pub cursor: Cursor,
}

impl OverlayStyle {
    /// Style for an overlay from who is looking at it and whether it is signed.
    ///
    /// `color` falls back to neutral gray when absent or unparseable.
    pub fn resolve(is_active_recipient: bool, is_signed: bool, color: Option<&str>) -> Self {
        let color = RgbColor::parse_or_neutral(color);
        let (border, background_alpha, opacity, cursor) = match (is_active_recipient, is_signed) {
            (true, true) => (BorderStyle::Solid, 0.15, 1.0, Cursor::Pointer),
            (true, false) => (BorderStyle::Dashed, 0.08, 0.85, Cursor::Pointer),
            (false, true) => (BorderStyle::Solid, 0.10, 0.6, Cursor::Default),
            (false, false) => (BorderStyle::Dashed, 0.05, 0.5, Cursor::Default),
        };
        Self {
            color,
            border,
            background_alpha,
            opacity,
            cursor,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/style.rs"]
mod tests;
