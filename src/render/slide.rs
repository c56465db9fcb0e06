use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    config::REFERENCE_DESIGN_WIDTH,
    foundation::core::{SlideGeometry, Size},
    foundation::error::{DocsealError, DocsealResult},
    foundation::math::unpremultiply_rgba8_in_place,
    render::wait::SlideCounter,
};

#[derive(Clone, Debug)]
/// Raster pixels in premultiplied RGBA8 form.
pub struct RasterImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl RasterImage {
    /// Straight-alpha copy, ready to encode.
    pub fn to_rgba_image(&self) -> DocsealResult<image::RgbaImage> {
        let mut straight = self.rgba8_premul.as_ref().clone();
        unpremultiply_rgba8_in_place(&mut straight);
        image::RgbaImage::from_raw(self.width, self.height, straight).ok_or_else(|| {
            DocsealError::validation("raster buffer does not match its dimensions")
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// What a slide was rendered from.
pub enum SlideKind {
    /// One page of a PDF document.
    PdfPage,
    /// A whole raster image.
    Image,
}

#[derive(Clone, Debug)]
/// One rendered, addressable page of the source document.
pub struct Slide {
    /// Zero-based slide index (page order).
    pub index: usize,
    /// Source kind.
    pub kind: SlideKind,
    /// Intrinsic size: PDF points for pages, pixels for images. Fixes the aspect ratio.
    pub intrinsic: Size,
    /// Rendered pixels.
    pub raster: RasterImage,
}

impl Slide {
    /// Display geometry when laid out at `viewport_width`, aspect ratio preserved.
    pub fn geometry(&self, viewport_width: f64) -> SlideGeometry {
        let height = if self.intrinsic.width > 0.0 {
            viewport_width * self.intrinsic.height / self.intrinsic.width
        } else {
            0.0
        };
        SlideGeometry {
            index: self.index,
            width: viewport_width,
            height,
        }
    }
}

#[derive(Debug)]
struct MountState {
    viewport_width: f64,
    slides: Vec<Slide>,
    generation: u64,
}

/// The scrollable container slides are mounted into.
///
/// A cheap clonable handle: the renderer appends slides while sync passes read them. Slides are
/// laid out at the container's current width with their aspect ratio preserved.
#[derive(Clone, Debug)]
pub struct SlideMount {
    inner: Arc<RwLock<MountState>>,
}

impl Default for SlideMount {
    fn default() -> Self {
        Self::new(REFERENCE_DESIGN_WIDTH)
    }
}

impl SlideMount {
    /// Empty mount with the given container width.
    pub fn new(viewport_width: f64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MountState {
                viewport_width,
                slides: Vec::new(),
                generation: 0,
            })),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MountState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MountState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current container width.
    pub fn viewport_width(&self) -> f64 {
        self.read().viewport_width
    }

    /// Resize the container (window resize). Slides re-lay out on the next read.
    pub fn set_viewport_width(&self, width: f64) -> DocsealResult<()> {
        if !(width.is_finite() && width > 0.0) {
            return Err(DocsealError::validation("viewport width must be > 0"));
        }
        let mut st = self.write();
        if st.viewport_width != width {
            st.viewport_width = width;
            st.generation += 1;
        }
        Ok(())
    }

    /// Append the next slide. Indices must arrive in page order without gaps.
    pub fn push(&self, slide: Slide) -> DocsealResult<SlideGeometry> {
        let mut st = self.write();
        if slide.index != st.slides.len() {
            return Err(DocsealError::validation(format!(
                "slide {} mounted out of order (expected {})",
                slide.index,
                st.slides.len()
            )));
        }
        let geometry = slide.geometry(st.viewport_width);
        st.slides.push(slide);
        st.generation += 1;
        Ok(geometry)
    }

    /// Unmount every slide.
    pub fn clear(&self) {
        let mut st = self.write();
        if !st.slides.is_empty() {
            st.slides.clear();
            st.generation += 1;
        }
    }

    /// Number of mounted slides.
    pub fn len(&self) -> usize {
        self.read().slides.len()
    }

    /// Whether no slide is mounted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counter bumped on every mount or layout change.
    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    /// Display geometry of slide `index`, if mounted.
    pub fn geometry(&self, index: usize) -> Option<SlideGeometry> {
        let st = self.read();
        st.slides.get(index).map(|s| s.geometry(st.viewport_width))
    }

    /// Display geometry of every mounted slide, in page order.
    pub fn geometries(&self) -> Vec<SlideGeometry> {
        let st = self.read();
        st.slides
            .iter()
            .map(|s| s.geometry(st.viewport_width))
            .collect()
    }

    /// Clone of slide `index` (pixels are shared).
    pub fn slide(&self, index: usize) -> Option<Slide> {
        self.read().slides.get(index).cloned()
    }
}

impl SlideCounter for SlideMount {
    fn slide_count(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/slide.rs"]
mod tests;
