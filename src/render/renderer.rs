use std::sync::Arc;

use xxhash_rust::xxh3::Xxh3;

use crate::{
    config::DEFAULT_RENDER_SCALE,
    foundation::core::SlideGeometry,
    foundation::error::{DocsealError, DocsealResult},
    render::image::image_slide,
    render::pdf::{PageRasterizer, PdfRasterizer},
    render::pdfium::PdfiumRasterizer,
    render::slide::{Slide, SlideKind, SlideMount},
    source::resolve::ResolvedSource,
};

/// Outcome of one render request.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderReport {
    /// True when the same source was already mounted and nothing was re-rendered.
    pub skipped: bool,
    /// Display geometry of every mounted slide, in page order.
    pub slides: Vec<SlideGeometry>,
}

/// Turns a resolved source into slides on a [`SlideMount`].
///
/// Rendering is idempotent per source: the fingerprint of the last fully rendered source is
/// remembered, and re-triggering with identical bytes and MIME type is a no-op. A failed render
/// leaves the fingerprint unset so the next attempt renders again.
#[derive(Clone, Debug)]
pub struct SlideRenderer {
    scale: f64,
    rendered: Option<u64>,
}

impl Default for SlideRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_RENDER_SCALE)
    }
}

impl SlideRenderer {
    /// Renderer rasterizing PDF pages at `scale` device pixels per point.
    pub fn new(scale: f64) -> Self {
        Self {
            scale: if scale.is_finite() && scale > 0.0 {
                scale
            } else {
                DEFAULT_RENDER_SCALE
            },
            rendered: None,
        }
    }

    /// Raster scale used for PDF pages.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Whether `source` is the one currently mounted.
    pub fn is_rendered(&self, source: &ResolvedSource) -> bool {
        self.rendered == Some(fingerprint(source))
    }

    /// Forget the mounted source so the next render runs unconditionally.
    pub fn invalidate(&mut self) {
        self.rendered = None;
    }

    /// Render `source` into `mount` with the built-in rasterizers.
    #[tracing::instrument(
        skip(self, source, mount),
        fields(mime = %source.mime_type, bytes = source.bytes.len())
    )]
    pub async fn render(
        &mut self,
        source: &ResolvedSource,
        mount: &SlideMount,
    ) -> DocsealResult<RenderReport> {
        let fp = fingerprint(source);
        if let Some(report) = self.already_rendered(fp, mount) {
            return Ok(report);
        }

        if source.is_pdf() {
            self.begin(mount);
            let mut rasterizer = open_rasterizer(source)?;
            return self.mount_pages(fp, rasterizer.as_mut(), mount).await;
        }
        if !source.is_image() {
            return Err(DocsealError::unsupported(format!(
                "cannot render {}",
                source.mime_type
            )));
        }

        self.begin(mount);
        let slide = image_slide(&source.bytes)?;
        let geometry = mount.push(slide)?;
        self.rendered = Some(fp);
        tracing::debug!(width = geometry.width, height = geometry.height, "image slide mounted");
        Ok(RenderReport {
            skipped: false,
            slides: vec![geometry],
        })
    }

    /// Render a PDF `source` through a caller-provided rasterizer.
    ///
    /// Pages are rendered one at a time, yielding to the runtime after each page. The first page
    /// failure stops the run; slides already mounted stay mounted.
    pub async fn render_pdf_with<R: PageRasterizer + ?Sized>(
        &mut self,
        source: &ResolvedSource,
        rasterizer: &mut R,
        mount: &SlideMount,
    ) -> DocsealResult<RenderReport> {
        let fp = fingerprint(source);
        if let Some(report) = self.already_rendered(fp, mount) {
            return Ok(report);
        }
        self.begin(mount);
        self.mount_pages(fp, rasterizer, mount).await
    }

    async fn mount_pages<R: PageRasterizer + ?Sized>(
        &mut self,
        fp: u64,
        rasterizer: &mut R,
        mount: &SlideMount,
    ) -> DocsealResult<RenderReport> {
        let count = rasterizer.page_count();
        let mut slides = Vec::with_capacity(count);
        for index in 0..count {
            let slide = rasterize_page(rasterizer, index, self.scale).inspect_err(|e| {
                tracing::warn!(page = index, error = %e, "page render failed, stopping");
            })?;
            slides.push(mount.push(slide)?);
            tokio::task::yield_now().await;
        }

        self.rendered = Some(fp);
        tracing::debug!(pages = count, "pdf slides mounted");
        Ok(RenderReport {
            skipped: false,
            slides,
        })
    }

    fn already_rendered(&self, fp: u64, mount: &SlideMount) -> Option<RenderReport> {
        if self.rendered != Some(fp) || mount.is_empty() {
            return None;
        }
        tracing::debug!("source already rendered, skipping");
        Some(RenderReport {
            skipped: true,
            slides: mount.geometries(),
        })
    }

    fn begin(&mut self, mount: &SlideMount) {
        self.rendered = None;
        mount.clear();
    }
}

/// pdfium when the library is bound, the built-in rasterizer otherwise.
fn open_rasterizer(source: &ResolvedSource) -> DocsealResult<Box<dyn PageRasterizer + Send>> {
    if PdfiumRasterizer::is_available() {
        return Ok(Box::new(PdfiumRasterizer::open(Arc::clone(&source.bytes))?));
    }
    tracing::debug!("pdfium unavailable, using built-in rasterizer");
    Ok(Box::new(PdfRasterizer::open(&source.bytes)?))
}

fn rasterize_page<R: PageRasterizer + ?Sized>(
    rasterizer: &mut R,
    index: usize,
    scale: f64,
) -> DocsealResult<Slide> {
    let page_error = |e: DocsealError| match e {
        e @ DocsealError::Render { .. } => e,
        other => DocsealError::render(index, other),
    };
    let intrinsic = rasterizer.page_size(index).map_err(page_error)?;
    let raster = rasterizer.rasterize(index, scale).map_err(page_error)?;
    Ok(Slide {
        index,
        kind: SlideKind::PdfPage,
        intrinsic,
        raster,
    })
}

/// Identity of a source for idempotent rendering.
pub fn fingerprint(source: &ResolvedSource) -> u64 {
    let mut h = Xxh3::new();
    h.update(source.mime_type.as_bytes());
    h.update(&[0]);
    h.update(&source.bytes);
    h.digest()
}

#[cfg(test)]
#[path = "../../tests/unit/render/renderer.rs"]
mod tests;
