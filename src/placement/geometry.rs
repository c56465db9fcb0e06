use crate::{
    config::{FALLBACK_BOX, PipelineConfig, REFERENCE_DESIGN_WIDTH},
    foundation::core::{Point, Rect, SlideGeometry, Size, Vec2},
    placement::field::SignatureField,
};

/// How a field's pixel box is derived from its stored size and the slide it sits on.
///
/// Overlays and finalization both go through this type, so a field occupies the same region of
/// its slide on screen and in the output PDF.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxSizing {
    /// Width the stored field sizes were authored at.
    pub reference_width: f64,
    /// Size (at the reference width) used when a field's stored size is not positive.
    pub fallback: Size,
}

impl Default for BoxSizing {
    fn default() -> Self {
        Self {
            reference_width: REFERENCE_DESIGN_WIDTH,
            fallback: FALLBACK_BOX,
        }
    }
}

impl From<&PipelineConfig> for BoxSizing {
    fn from(cfg: &PipelineConfig) -> Self {
        Self {
            reference_width: cfg.reference_design_width,
            fallback: cfg.fallback_box,
        }
    }
}

impl BoxSizing {
    /// `slide_width / reference_width`.
    pub fn scale_for(&self, slide_width: f64) -> f64 {
        slide_width / self.reference_width
    }

    /// Stored size, or the fallback when either side is not positive.
    pub fn design_size(&self, field: &SignatureField) -> Size {
        if field.width > 0.0 && field.height > 0.0 {
            Size::new(field.width, field.height)
        } else {
            self.fallback
        }
    }

    /// Box size in display pixels on a slide `slide_width` wide.
    pub fn box_size(&self, field: &SignatureField, slide_width: f64) -> Size {
        self.design_size(field) * self.scale_for(slide_width)
    }

    /// Box in slide display pixels, origin at the slide's top-left corner.
    pub fn box_rect(&self, field: &SignatureField, slide: SlideGeometry) -> Rect {
        let size = self.box_size(field, slide.width);
        let center = Point::new(field.left * slide.width, field.top * slide.height);
        Rect::from_center_size(center, size)
    }

    /// Half of the box extent as a fraction of the slide's width and height.
    pub fn normalized_half(&self, field: &SignatureField, slide: SlideGeometry) -> Vec2 {
        if !slide.is_usable() {
            return Vec2::ZERO;
        }
        let size = self.box_size(field, slide.width);
        Vec2::new(
            size.width / slide.width * 0.5,
            size.height / slide.height * 0.5,
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/placement/geometry.rs"]
mod tests;
