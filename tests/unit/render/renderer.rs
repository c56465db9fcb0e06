use std::io::Cursor;
use std::sync::Arc;

use super::*;
use crate::foundation::core::Size;
use crate::render::slide::RasterImage;

struct FakePages {
    sizes: Vec<Size>,
    fail_at: Option<usize>,
    rasterized: Vec<usize>,
}

impl FakePages {
    fn new(n: usize) -> Self {
        Self {
            sizes: (0..n).map(|_| Size::new(612.0, 792.0)).collect(),
            fail_at: None,
            rasterized: Vec::new(),
        }
    }
}

impl PageRasterizer for FakePages {
    fn page_count(&self) -> usize {
        self.sizes.len()
    }

    fn page_size(&self, index: usize) -> DocsealResult<Size> {
        Ok(self.sizes[index])
    }

    fn rasterize(&mut self, index: usize, scale: f64) -> DocsealResult<RasterImage> {
        if self.fail_at == Some(index) {
            return Err(DocsealError::validation("broken page"));
        }
        self.rasterized.push(index);
        let s = self.sizes[index];
        let (w, h) = ((s.width * scale) as u32, (s.height * scale) as u32);
        Ok(RasterImage {
            width: w,
            height: h,
            rgba8_premul: Arc::new(Vec::new()),
        })
    }
}

fn pdf_source(tag: &[u8]) -> ResolvedSource {
    let mut bytes = b"%PDF-1.5\n".to_vec();
    bytes.extend_from_slice(tag);
    ResolvedSource::from_bytes(bytes)
}

fn png_source() -> ResolvedSource {
    let img = image::RgbaImage::from_pixel(8, 4, image::Rgba([0, 0, 0, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    ResolvedSource::from_bytes(buf)
}

#[tokio::test]
async fn pages_mount_in_order_with_geometry() {
    let mount = SlideMount::new(1280.0);
    let mut renderer = SlideRenderer::default();
    let mut pages = FakePages::new(3);

    let report = renderer
        .render_pdf_with(&pdf_source(b"a"), &mut pages, &mount)
        .await
        .unwrap();

    assert!(!report.skipped);
    assert_eq!(pages.rasterized, vec![0, 1, 2]);
    let indices: Vec<usize> = report.slides.iter().map(|g| g.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(report.slides[0].width, 1280.0);
    assert!((report.slides[0].height - 1280.0 * 792.0 / 612.0).abs() < 1e-9);
    assert_eq!(mount.len(), 3);
    assert_eq!(mount.slide(1).unwrap().raster.width, 1224);
}

#[tokio::test]
async fn same_source_twice_is_a_noop() {
    let mount = SlideMount::default();
    let mut renderer = SlideRenderer::default();
    let src = pdf_source(b"same");

    renderer
        .render_pdf_with(&src, &mut FakePages::new(2), &mount)
        .await
        .unwrap();
    let generation = mount.generation();

    let mut again = FakePages::new(2);
    let report = renderer.render_pdf_with(&src, &mut again, &mount).await.unwrap();
    assert!(report.skipped);
    assert!(again.rasterized.is_empty());
    assert_eq!(report.slides.len(), 2);
    assert_eq!(mount.generation(), generation);
}

#[tokio::test]
async fn different_source_replaces_slides() {
    let mount = SlideMount::default();
    let mut renderer = SlideRenderer::default();

    renderer
        .render_pdf_with(&pdf_source(b"one"), &mut FakePages::new(3), &mount)
        .await
        .unwrap();
    let report = renderer
        .render_pdf_with(&pdf_source(b"two"), &mut FakePages::new(1), &mount)
        .await
        .unwrap();

    assert!(!report.skipped);
    assert_eq!(mount.len(), 1);
    assert!(renderer.is_rendered(&pdf_source(b"two")));
    assert!(!renderer.is_rendered(&pdf_source(b"one")));
}

#[tokio::test]
async fn page_failure_stops_and_keeps_partial_slides() {
    let mount = SlideMount::default();
    let mut renderer = SlideRenderer::default();
    let mut pages = FakePages::new(4);
    pages.fail_at = Some(2);
    let src = pdf_source(b"broken");

    let err = renderer
        .render_pdf_with(&src, &mut pages, &mount)
        .await
        .unwrap_err();

    assert!(matches!(err, DocsealError::Render { page: 2, .. }));
    assert_eq!(pages.rasterized, vec![0, 1]);
    assert_eq!(mount.len(), 2);
    assert!(!renderer.is_rendered(&src));

    // A retry of the same source renders again.
    let report = renderer
        .render_pdf_with(&src, &mut FakePages::new(4), &mount)
        .await
        .unwrap();
    assert!(!report.skipped);
    assert_eq!(mount.len(), 4);
}

#[tokio::test]
async fn image_source_is_one_slide() {
    let mount = SlideMount::new(640.0);
    let mut renderer = SlideRenderer::default();
    let report = renderer.render(&png_source(), &mount).await.unwrap();

    assert_eq!(report.slides.len(), 1);
    assert_eq!(report.slides[0].width, 640.0);
    assert_eq!(report.slides[0].height, 320.0);
    assert_eq!(mount.slide(0).unwrap().kind, SlideKind::Image);

    let again = renderer.render(&png_source(), &mount).await.unwrap();
    assert!(again.skipped);
}

#[tokio::test]
async fn unknown_type_is_unsupported() {
    let mount = SlideMount::default();
    let mut renderer = SlideRenderer::default();
    let src = ResolvedSource::from_bytes(b"plain text, nothing to see".to_vec());
    let err = renderer.render(&src, &mount).await.unwrap_err();
    assert!(matches!(err, DocsealError::UnsupportedFormat(_)));
    assert!(mount.is_empty());
}

#[test]
fn fingerprint_covers_bytes_and_mime() {
    let a = pdf_source(b"x");
    let mut b = a.clone();
    assert_eq!(fingerprint(&a), fingerprint(&b));
    b.mime_type = "image/png".to_string();
    assert_ne!(fingerprint(&a), fingerprint(&b));
    assert_ne!(fingerprint(&a), fingerprint(&pdf_source(b"y")));
}

#[test]
fn degenerate_scale_falls_back() {
    assert_eq!(SlideRenderer::new(0.0).scale(), 2.0);
    assert_eq!(SlideRenderer::new(f64::NAN).scale(), 2.0);
    assert_eq!(SlideRenderer::new(1.5).scale(), 1.5);
}
