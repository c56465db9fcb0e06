//! PDF page rasterization.
//!
//! Pages are parsed with `lopdf` and painted with `vello_cpu`. The interpreter covers the
//! path-painting subset of content streams (paths, fills, strokes, device colors, image and form
//! XObjects). Text operators are skipped. Each page starts as an opaque white sheet.

use std::sync::Arc;

use lopdf::{Dictionary, Document, Object, ObjectId, content::Content};
use vello_cpu::kurbo as vk;

use crate::{
    foundation::core::{Rect, Size},
    foundation::error::{DocsealError, DocsealResult},
    foundation::math::premultiply_rgba8_in_place,
    render::slide::RasterImage,
    render::stream::{decoded_content, filter_names},
};

const MAX_FORM_DEPTH: usize = 8;
pub(crate) const DEFAULT_PAGE_BOX: Rect = Rect::new(0.0, 0.0, 612.0, 792.0);

/// Seam between the slide renderer and whatever turns page `i` into pixels.
pub trait PageRasterizer {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Intrinsic page size (PDF points) of page `index`.
    fn page_size(&self, index: usize) -> DocsealResult<Size>;

    /// Rasterize page `index` at `scale` device pixels per point.
    fn rasterize(&mut self, index: usize, scale: f64) -> DocsealResult<RasterImage>;
}

/// Built-in rasterizer over a parsed PDF document.
pub struct PdfRasterizer {
    doc: Document,
    pages: Vec<ObjectId>,
}

impl std::fmt::Debug for PdfRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfRasterizer")
            .field("pages", &self.pages.len())
            .finish()
    }
}

impl PdfRasterizer {
    /// Parse a PDF document held in memory.
    pub fn open(bytes: &[u8]) -> DocsealResult<Self> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| DocsealError::unsupported(format!("unparseable PDF: {e}")))?;
        let pages = doc.get_pages().into_values().collect();
        Ok(Self { doc, pages })
    }

    fn page_id(&self, index: usize) -> DocsealResult<ObjectId> {
        self.pages
            .get(index)
            .copied()
            .ok_or_else(|| DocsealError::render(index, "page index out of range"))
    }
}

impl PageRasterizer for PdfRasterizer {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, index: usize) -> DocsealResult<Size> {
        let id = self.page_id(index)?;
        Ok(page_box(&self.doc, id).unwrap_or(DEFAULT_PAGE_BOX).size())
    }

    fn rasterize(&mut self, index: usize, scale: f64) -> DocsealResult<RasterImage> {
        let id = self.page_id(index)?;
        let media = page_box(&self.doc, id).unwrap_or(DEFAULT_PAGE_BOX);

        let mut scale = scale;
        let max_side = media.width().max(media.height());
        if max_side * scale > f64::from(u16::MAX) {
            scale = f64::from(u16::MAX) / max_side;
            tracing::debug!(page = index, scale, "page too large, raster scale reduced");
        }
        let w = (media.width() * scale).ceil().clamp(1.0, f64::from(u16::MAX)) as u16;
        let h = (media.height() * scale).ceil().clamp(1.0, f64::from(u16::MAX)) as u16;

        let content = self
            .doc
            .get_page_content(id)
            .map_err(|e| DocsealError::render(index, format!("read content stream: {e}")))?;
        let ops = Content::decode(&content)
            .map_err(|e| DocsealError::render(index, format!("decode content stream: {e}")))?
            .operations;
        let resources = page_resources(&self.doc, id);

        // PDF user space (bottom-left origin, points) to device pixels (top-left origin).
        let base = vk::Affine::new([
            scale,
            0.0,
            0.0,
            -scale,
            -media.x0 * scale,
            media.y1 * scale,
        ]);

        let mut ctx = vello_cpu::RenderContext::new(w, h);
        ctx.set_transform(vk::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
        ctx.fill_rect(&vk::Rect::new(0.0, 0.0, f64::from(w), f64::from(h)));

        let mut interp = Interpreter::new(&self.doc, base, scale);
        interp.run(&mut ctx, &ops, resources, 0);

        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);

        Ok(RasterImage {
            width: u32::from(w),
            height: u32::from(h),
            rgba8_premul: Arc::new(pixmap.data_as_u8_slice().to_vec()),
        })
    }
}

/// Follow a reference one level.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

pub(crate) fn obj_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some((*f).into()),
        _ => None,
    }
}

/// Look up `key` on the page or, for inheritable attributes, its ancestors.
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = Some(page_id);
    let mut hops = 0;
    while let Some(id) = current {
        let dict = doc.get_object(id).ok()?.as_dict().ok()?;
        if let Ok(obj) = dict.get(key) {
            return resolve(doc, obj);
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
        hops += 1;
        if hops > 64 {
            return None;
        }
    }
    None
}

/// The page's MediaBox (inherited if needed), normalized so `x0 <= x1`, `y0 <= y1`.
pub(crate) fn page_box(doc: &Document, page_id: ObjectId) -> Option<Rect> {
    let arr = inherited(doc, page_id, b"MediaBox")?.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut v = [0.0; 4];
    for (slot, item) in v.iter_mut().zip(arr) {
        *slot = obj_to_f64(resolve(doc, item)?)?;
    }
    let rect = Rect::new(v[0], v[1], v[2], v[3]).abs();
    (rect.width() > 0.0 && rect.height() > 0.0).then_some(rect)
}

fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    inherited(doc, page_id, b"Resources")?.as_dict().ok()
}

#[derive(Clone, Copy, Debug)]
struct GraphicsState {
    ctm: vk::Affine,
    fill: [u8; 4],
    stroke: [u8; 4],
    line_width: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: vk::Affine::IDENTITY,
            fill: [0, 0, 0, 255],
            stroke: [0, 0, 0, 255],
            line_width: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Paint {
    Fill { even_odd: bool },
    Stroke,
    FillStroke { even_odd: bool },
}

struct Interpreter<'a> {
    doc: &'a Document,
    base: vk::Affine,
    scale: f64,
    gs: GraphicsState,
    stack: Vec<GraphicsState>,
    path: vk::BezPath,
    current: Option<vk::Point>,
}

impl<'a> Interpreter<'a> {
    fn new(doc: &'a Document, base: vk::Affine, scale: f64) -> Self {
        Self {
            doc,
            base,
            scale,
            gs: GraphicsState::default(),
            stack: Vec::new(),
            path: vk::BezPath::new(),
            current: None,
        }
    }

    fn run(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        ops: &[lopdf::content::Operation],
        resources: Option<&'a Dictionary>,
        depth: usize,
    ) {
        for op in ops {
            let nums: Vec<f64> = op.operands.iter().filter_map(obj_to_f64).collect();
            match op.operator.as_str() {
                "q" => self.stack.push(self.gs),
                "Q" => {
                    if let Some(gs) = self.stack.pop() {
                        self.gs = gs;
                    }
                }
                "cm" if nums.len() == 6 => {
                    let m = vk::Affine::new([nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]]);
                    self.gs.ctm = self.gs.ctm * m;
                }
                "w" if !nums.is_empty() => self.gs.line_width = nums[0],

                "m" if nums.len() == 2 => {
                    let p = vk::Point::new(nums[0], nums[1]);
                    self.path.move_to(p);
                    self.current = Some(p);
                }
                "l" if nums.len() == 2 => {
                    let p = vk::Point::new(nums[0], nums[1]);
                    self.ensure_started(p);
                    self.path.line_to(p);
                    self.current = Some(p);
                }
                "c" if nums.len() == 6 => {
                    let p1 = vk::Point::new(nums[0], nums[1]);
                    let p2 = vk::Point::new(nums[2], nums[3]);
                    let p3 = vk::Point::new(nums[4], nums[5]);
                    self.ensure_started(p1);
                    self.path.curve_to(p1, p2, p3);
                    self.current = Some(p3);
                }
                "v" if nums.len() == 4 => {
                    let p2 = vk::Point::new(nums[0], nums[1]);
                    let p3 = vk::Point::new(nums[2], nums[3]);
                    let p1 = self.current.unwrap_or(p2);
                    self.ensure_started(p1);
                    self.path.curve_to(p1, p2, p3);
                    self.current = Some(p3);
                }
                "y" if nums.len() == 4 => {
                    let p1 = vk::Point::new(nums[0], nums[1]);
                    let p3 = vk::Point::new(nums[2], nums[3]);
                    self.ensure_started(p1);
                    self.path.curve_to(p1, p3, p3);
                    self.current = Some(p3);
                }
                "h" => self.path.close_path(),
                "re" if nums.len() == 4 => {
                    let (x, y, w, h) = (nums[0], nums[1], nums[2], nums[3]);
                    self.path.move_to((x, y));
                    self.path.line_to((x + w, y));
                    self.path.line_to((x + w, y + h));
                    self.path.line_to((x, y + h));
                    self.path.close_path();
                    self.current = Some(vk::Point::new(x, y));
                }

                "f" | "F" => self.paint(ctx, Paint::Fill { even_odd: false }),
                "f*" => self.paint(ctx, Paint::Fill { even_odd: true }),
                "S" => self.paint(ctx, Paint::Stroke),
                "s" => {
                    self.path.close_path();
                    self.paint(ctx, Paint::Stroke);
                }
                "B" => self.paint(ctx, Paint::FillStroke { even_odd: false }),
                "B*" => self.paint(ctx, Paint::FillStroke { even_odd: true }),
                "b" => {
                    self.path.close_path();
                    self.paint(ctx, Paint::FillStroke { even_odd: false });
                }
                "b*" => {
                    self.path.close_path();
                    self.paint(ctx, Paint::FillStroke { even_odd: true });
                }
                "n" => self.end_path(),

                "g" | "rg" | "k" | "sc" | "scn" => {
                    if let Some(rgb) = device_color(&nums) {
                        self.gs.fill = [rgb[0], rgb[1], rgb[2], 255];
                    }
                }
                "G" | "RG" | "K" | "SC" | "SCN" => {
                    if let Some(rgb) = device_color(&nums) {
                        self.gs.stroke = [rgb[0], rgb[1], rgb[2], 255];
                    }
                }

                "Do" => {
                    if let Some(Object::Name(name)) = op.operands.first() {
                        self.draw_xobject(ctx, name, resources, depth);
                    }
                }
                _ => {}
            }
        }
    }

    fn ensure_started(&mut self, p: vk::Point) {
        if self.current.is_none() {
            self.path.move_to(p);
            self.current = Some(p);
        }
    }

    fn end_path(&mut self) {
        self.path = vk::BezPath::new();
        self.current = None;
    }

    fn paint(&mut self, ctx: &mut vello_cpu::RenderContext, paint: Paint) {
        if self.path.elements().is_empty() {
            self.end_path();
            return;
        }
        ctx.set_paint_transform(vk::Affine::IDENTITY);
        ctx.set_transform(self.base * self.gs.ctm);

        if let Paint::Fill { even_odd } | Paint::FillStroke { even_odd } = paint {
            let [r, g, b, a] = self.gs.fill;
            ctx.set_fill_rule(if even_odd {
                vello_cpu::peniko::Fill::EvenOdd
            } else {
                vello_cpu::peniko::Fill::NonZero
            });
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
            ctx.fill_path(&self.path);
        }
        if matches!(paint, Paint::Stroke | Paint::FillStroke { .. }) {
            let [r, g, b, a] = self.gs.stroke;
            // Zero width means "thinnest line the device can render".
            let width = if self.gs.line_width > 0.0 {
                self.gs.line_width
            } else {
                1.0 / self.scale
            };
            ctx.set_stroke(vk::Stroke::new(width));
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
            ctx.stroke_path(&self.path);
        }
        self.end_path();
    }

    fn draw_xobject(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        name: &[u8],
        resources: Option<&'a Dictionary>,
        depth: usize,
    ) {
        let doc = self.doc;
        let Some(stream) = resources
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|x| resolve(doc, x))
            .and_then(|x| x.as_dict().ok())
            .and_then(|x| x.get(name).ok())
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_stream().ok())
        else {
            return;
        };

        let subtype = stream.dict.get(b"Subtype").ok();
        match subtype {
            Some(Object::Name(n)) if n.as_slice() == b"Image" => {
                match decode_image_xobject(doc, stream) {
                    Some(img) => self.draw_image(ctx, &img),
                    None => tracing::debug!(
                        xobject = %String::from_utf8_lossy(name),
                        "image xobject not decodable, skipped"
                    ),
                }
            }
            Some(Object::Name(n)) if n.as_slice() == b"Form" => {
                if depth >= MAX_FORM_DEPTH {
                    return;
                }
                let bytes = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                let Ok(content) = Content::decode(&bytes) else {
                    return;
                };
                let matrix: Vec<f64> = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|m| resolve(doc, m))
                    .and_then(|m| m.as_array().ok())
                    .map(|a| a.iter().filter_map(obj_to_f64).collect())
                    .unwrap_or_default();
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|r| resolve(doc, r))
                    .and_then(|r| r.as_dict().ok())
                    .or(resources);

                let saved = self.gs;
                let saved_depth = self.stack.len();
                if matrix.len() == 6 {
                    self.gs.ctm = self.gs.ctm * vk::Affine::new([
                        matrix[0], matrix[1], matrix[2], matrix[3], matrix[4], matrix[5],
                    ]);
                }
                self.end_path();
                self.run(ctx, &content.operations, form_resources, depth + 1);
                self.stack.truncate(saved_depth);
                self.gs = saved;
                self.end_path();
            }
            _ => {}
        }
    }

    fn draw_image(&mut self, ctx: &mut vello_cpu::RenderContext, img: &RasterImage) {
        let Ok(w) = u16::try_from(img.width) else {
            return;
        };
        let Ok(h) = u16::try_from(img.height) else {
            return;
        };
        let pixmap = premul_bytes_to_pixmap(&img.rgba8_premul, w, h);
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };

        // Images occupy the unit square; row 0 is the top edge.
        let (fw, fh) = (f64::from(w), f64::from(h));
        let unit = vk::Affine::new([1.0 / fw, 0.0, 0.0, -1.0 / fh, 0.0, 1.0]);
        ctx.set_paint_transform(vk::Affine::IDENTITY);
        ctx.set_transform(self.base * self.gs.ctm * unit);
        ctx.set_paint(paint);
        ctx.fill_rect(&vk::Rect::new(0.0, 0.0, fw, fh));
    }
}

/// Gray, RGB or CMYK operands to 8-bit RGB, chosen by operand count.
fn device_color(nums: &[f64]) -> Option<[u8; 3]> {
    let q = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    match nums.len() {
        1 => Some([q(nums[0]); 3]),
        3 => Some([q(nums[0]), q(nums[1]), q(nums[2])]),
        4 => {
            let k = 1.0 - nums[3].clamp(0.0, 1.0);
            Some([
                q((1.0 - nums[0]) * k),
                q((1.0 - nums[1]) * k),
                q((1.0 - nums[2]) * k),
            ])
        }
        _ => None,
    }
}

fn color_components(doc: &Document, dict: &Dictionary) -> Option<usize> {
    match dict.get(b"ColorSpace").ok().and_then(|c| resolve(doc, c)) {
        Some(Object::Name(n)) => match n.as_slice() {
            b"DeviceGray" | b"G" | b"CalGray" => Some(1),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(3),
            b"DeviceCMYK" | b"CMYK" => Some(4),
            _ => None,
        },
        Some(Object::Array(arr)) => {
            let family = match arr.first() {
                Some(Object::Name(n)) => n.as_slice(),
                _ => return None,
            };
            match family {
                b"ICCBased" => arr
                    .get(1)
                    .and_then(|s| resolve(doc, s))
                    .and_then(|s| s.as_stream().ok())
                    .and_then(|s| s.dict.get(b"N").ok())
                    .and_then(obj_to_f64)
                    .map(|n| n as usize),
                b"CalGray" => Some(1),
                b"CalRGB" => Some(3),
                _ => None,
            }
        }
        // Image masks and missing colorspaces are not painted.
        _ => None,
    }
}

/// Decode an image XObject to premultiplied RGBA8. `None` when unsupported.
fn decode_image_xobject(doc: &Document, stream: &lopdf::Stream) -> Option<RasterImage> {
    let dict = &stream.dict;
    let width = dimension(dict, b"Width")?;
    let height = dimension(dict, b"Height")?;
    let pixels = (width as usize).checked_mul(height as usize)?;
    let filters = filter_names(doc, dict);

    let mut rgba = if filters.iter().any(|f| f.as_slice() == b"DCTDecode") {
        let img = image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
            .ok()?
            .to_rgba8();
        if img.dimensions() != (width, height) {
            return None;
        }
        img.into_raw()
    } else {
        let bpc = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(obj_to_f64)
            .unwrap_or(8.0);
        if bpc != 8.0 {
            return None;
        }
        let comps = color_components(doc, dict)?;
        let data = decoded_content(doc, stream)?;
        if data.len() < pixels.checked_mul(comps)? {
            return None;
        }
        // Bounded by the sample data length checked above.
        let mut out = Vec::with_capacity(pixels * 4);
        for px in data.chunks_exact(comps).take(pixels) {
            let rgb = match comps {
                1 => [px[0]; 3],
                3 => [px[0], px[1], px[2]],
                4 => {
                    let k = 255 - u16::from(px[3]);
                    let ch = |c: u8| ((255 - u16::from(c)) * k / 255) as u8;
                    [ch(px[0]), ch(px[1]), ch(px[2])]
                }
                _ => return None,
            };
            out.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        out
    };

    if let Some(mask) = dict
        .get(b"SMask")
        .ok()
        .and_then(|m| resolve(doc, m))
        .and_then(|m| m.as_stream().ok())
        && dimension(&mask.dict, b"Width") == Some(width)
        && dimension(&mask.dict, b"Height") == Some(height)
        && let Some(alpha) = decoded_content(doc, mask)
        && alpha.len() >= pixels
    {
        for (px, a) in rgba.chunks_exact_mut(4).zip(alpha) {
            px[3] = a;
        }
    }

    premultiply_rgba8_in_place(&mut rgba);
    Some(RasterImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba),
    })
}

/// A positive image dimension that fits in `u32`.
fn dimension(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    let v = dict.get(key).ok().and_then(obj_to_f64)?;
    (v >= 1.0 && v <= f64::from(u32::MAX)).then_some(v as u32)
}

fn premul_bytes_to_pixmap(rgba8_premul: &[u8], w: u16, h: u16) -> vello_cpu::Pixmap {
    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(usize::from(w) * usize::from(h));
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }
    vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, may_have_opacities)
}

#[cfg(test)]
#[path = "../../tests/unit/render/pdf.rs"]
mod tests;
