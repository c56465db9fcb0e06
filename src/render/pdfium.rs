//! Page rasterization through the pdfium library.
//!
//! The library is bound once per process, from `DOCSEAL_PDFIUM_DIR` (or the working directory)
//! first and the system library paths second. When it cannot be bound, the slide renderer falls
//! back to [`PdfRasterizer`](crate::render::pdf::PdfRasterizer).

use std::sync::{Arc, OnceLock};

use pdfium_render::prelude::*;

use crate::{
    foundation::core::Size,
    foundation::error::{DocsealError, DocsealResult},
    foundation::math::premultiply_rgba8_in_place,
    render::pdf::PageRasterizer,
    render::slide::RasterImage,
};

/// Environment variable naming the directory that holds the pdfium shared library.
pub const PDFIUM_DIR_ENV: &str = "DOCSEAL_PDFIUM_DIR";

static PDFIUM: OnceLock<Option<Pdfium>> = OnceLock::new();

fn pdfium() -> Option<&'static Pdfium> {
    PDFIUM
        .get_or_init(|| {
            let dir = std::env::var(PDFIUM_DIR_ENV)
                .ok()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "./".to_string());
            match Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
                .or_else(|_| Pdfium::bind_to_system_library())
            {
                Ok(bindings) => {
                    tracing::debug!("pdfium library bound");
                    Some(Pdfium::new(bindings))
                }
                Err(e) => {
                    tracing::debug!(error = %e, "pdfium library not found");
                    None
                }
            }
        })
        .as_ref()
}

fn unavailable() -> DocsealError {
    DocsealError::unsupported("pdfium library is not available")
}

/// Rasterizer rendering complete page content, text included, with pdfium.
///
/// Holds the document bytes and reopens them per page, so the rasterizer itself is `Send`.
pub struct PdfiumRasterizer {
    bytes: Arc<Vec<u8>>,
    sizes: Vec<Size>,
}

impl std::fmt::Debug for PdfiumRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumRasterizer")
            .field("pages", &self.sizes.len())
            .finish()
    }
}

impl PdfiumRasterizer {
    /// Whether the pdfium library could be bound in this process.
    pub fn is_available() -> bool {
        pdfium().is_some()
    }

    /// Open a PDF held in memory.
    pub fn open(bytes: Arc<Vec<u8>>) -> DocsealResult<Self> {
        let pdfium = pdfium().ok_or_else(unavailable)?;
        let sizes = page_sizes(pdfium, &bytes)?;
        Ok(Self { bytes, sizes })
    }
}

fn page_sizes(pdfium: &Pdfium, bytes: &[u8]) -> DocsealResult<Vec<Size>> {
    let doc = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| DocsealError::unsupported(format!("unparseable PDF: {e}")))?;
    let sizes: Vec<Size> = doc
        .pages()
        .iter()
        .map(|page| {
            Size::new(
                f64::from(page.width().value),
                f64::from(page.height().value),
            )
        })
        .collect();
    Ok(sizes)
}

impl PageRasterizer for PdfiumRasterizer {
    fn page_count(&self) -> usize {
        self.sizes.len()
    }

    fn page_size(&self, index: usize) -> DocsealResult<Size> {
        self.sizes
            .get(index)
            .copied()
            .ok_or_else(|| DocsealError::render(index, "page index out of range"))
    }

    fn rasterize(&mut self, index: usize, scale: f64) -> DocsealResult<RasterImage> {
        let size = self.page_size(index)?;
        let page_index = PdfPageIndex::try_from(index)
            .map_err(|_| DocsealError::render(index, "page index out of range"))?;

        let max_side = f64::from(u16::MAX);
        let scale = scale.min(max_side / size.width.max(size.height).max(1.0));
        let w = (size.width * scale).ceil().clamp(1.0, max_side) as Pixels;
        let h = (size.height * scale).ceil().clamp(1.0, max_side) as Pixels;

        let pdfium = pdfium().ok_or_else(unavailable)?;
        let doc = pdfium
            .load_pdf_from_byte_slice(&self.bytes, None)
            .map_err(|e| DocsealError::render(index, format!("reopen document: {e}")))?;
        let page = doc
            .pages()
            .get(page_index)
            .map_err(|e| DocsealError::render(index, format!("load page: {e}")))?;

        let config = PdfRenderConfig::new()
            .set_target_width(w)
            .set_target_height(h)
            .set_clear_color(PdfColor::WHITE);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| DocsealError::render(index, format!("pdfium render: {e}")))?;

        let width = u32::try_from(bitmap.width())
            .map_err(|_| DocsealError::render(index, "negative bitmap width"))?;
        let height = u32::try_from(bitmap.height())
            .map_err(|_| DocsealError::render(index, "negative bitmap height"))?;
        let mut rgba = bitmap.as_rgba_bytes();
        if rgba.len() != width as usize * height as usize * 4 {
            return Err(DocsealError::render(index, "bitmap size mismatch"));
        }
        premultiply_rgba8_in_place(&mut rgba);

        Ok(RasterImage {
            width,
            height,
            rgba8_premul: Arc::new(rgba),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pdfium.rs"]
mod tests;
