use std::collections::BTreeMap;

use anyhow::Context as _;
use lopdf::{
    Document, Object, Stream,
    content::{Content, Operation},
    dictionary,
};

use crate::{
    config::PipelineConfig,
    finalize::{
        font::{EmbeddedFont, FontRegistry},
        image::{embed_image, load_image_source},
        pdf_edit::{PageTarget, append_content, page_target, register_resource},
    },
    foundation::core::{Rect, RgbColor, SlideGeometry, Size},
    foundation::error::{DocsealError, DocsealResult},
    foundation::math::fit_centered,
    placement::field::{FieldContent, SignatureField},
    placement::geometry::BoxSizing,
    source::{abort::AbortSignal, resolve::ResolvedSource, resolve::SourceResolver},
};

/// What a finalization pass does when some fields cannot be embedded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizePolicy {
    /// Embed what can be embedded; failed fields stay in the remaining list.
    #[default]
    AllowPartial,
    /// Any failed field fails the whole pass.
    RequireAll,
}

/// Inputs of one finalization pass.
#[derive(Clone, Copy, Debug)]
pub struct FinalizeRequest<'a> {
    /// Current field list, in order. Un-edited fields pass through untouched.
    pub fields: &'a [SignatureField],
    /// The original document (PDF or image).
    pub source: &'a ResolvedSource,
    /// Font family to URL map for text signatures.
    pub fonts: &'a FontRegistry,
    /// Rendered slide geometry, indexed by slide.
    pub slides: &'a [SlideGeometry],
}

/// Result for one edited field.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOutcome {
    /// Drawn onto a page.
    Embedded {
        /// One-based page number.
        page: u32,
    },
    /// Left out of the output, with the reason.
    Skipped(String),
}

/// Outcome of one edited field.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct FieldReport {
    /// Field id.
    pub field_id: String,
    /// What happened to it.
    pub outcome: FieldOutcome,
}

/// Output of a finalization pass.
#[derive(Clone, Debug)]
pub struct FinalizeOutput {
    /// Finalized PDF bytes.
    pub pdf: Vec<u8>,
    /// One report per edited field, in field order.
    pub reports: Vec<FieldReport>,
    /// Fields still to be signed: un-edited ones plus skipped ones, in original order.
    pub remaining: Vec<SignatureField>,
}

impl FinalizeOutput {
    /// Number of fields drawn into the output.
    pub fn embedded_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, FieldOutcome::Embedded { .. }))
            .count()
    }
}

/// Burns edited signature fields into the original document.
#[derive(Clone, Debug)]
pub struct FinalizationEngine {
    resolver: SourceResolver,
    sizing: BoxSizing,
    text_size_pt: f64,
    policy: FinalizePolicy,
}

impl Default for FinalizationEngine {
    fn default() -> Self {
        Self::from_config(SourceResolver::default(), &PipelineConfig::default())
    }
}

/// Fonts loaded during one pass, keyed by URL so each file is fetched and embedded once.
type FontCache = BTreeMap<String, EmbeddedFont>;

impl FinalizationEngine {
    /// Engine with explicit sizing and text size.
    pub fn new(resolver: SourceResolver, sizing: BoxSizing, text_size_pt: f64) -> Self {
        Self {
            resolver,
            sizing,
            text_size_pt,
            policy: FinalizePolicy::default(),
        }
    }

    /// Engine configured from a pipeline config.
    pub fn from_config(resolver: SourceResolver, cfg: &PipelineConfig) -> Self {
        Self::new(resolver, BoxSizing::from(cfg), cfg.text_size_pt).with_policy(cfg.finalize_policy)
    }

    /// Replace the partial-failure policy.
    pub fn with_policy(mut self, policy: FinalizePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Current partial-failure policy.
    pub fn policy(&self) -> FinalizePolicy {
        self.policy
    }

    /// Embed every edited field and serialize the document.
    ///
    /// A field that fails is logged and skipped unless the policy is
    /// [`FinalizePolicy::RequireAll`]. Aborting fails the whole pass.
    #[tracing::instrument(skip(self, req, abort), fields(field_count = req.fields.len()))]
    pub async fn finalize(
        &self,
        req: FinalizeRequest<'_>,
        abort: &AbortSignal,
    ) -> DocsealResult<FinalizeOutput> {
        let mut doc = open_document(req.source)?;
        let mut fonts = FontCache::new();
        let mut reports = Vec::new();
        let mut remaining = Vec::new();

        for field in req.fields {
            if !field.signature_is_edit || field.content.is_empty() {
                remaining.push(field.clone());
                continue;
            }
            let outcome = match self.embed_field(&mut doc, field, &req, &mut fonts, abort).await {
                Ok(page) => FieldOutcome::Embedded { page },
                Err(e @ DocsealError::Aborted { .. }) => return Err(e),
                Err(e) => {
                    tracing::warn!(field_id = %field.id, error = %e, "signature field skipped");
                    if self.policy == FinalizePolicy::RequireAll {
                        return Err(DocsealError::embed(format!(
                            "field '{}' could not be embedded: {e}",
                            field.id
                        )));
                    }
                    remaining.push(field.clone());
                    FieldOutcome::Skipped(e.to_string())
                }
            };
            reports.push(FieldReport {
                field_id: field.id.clone(),
                outcome,
            });
        }

        for font in fonts.into_values() {
            font.finish(&mut doc)?;
        }
        let mut pdf = Vec::new();
        doc.save_to(&mut pdf).context("serialize finalized PDF")?;

        Ok(FinalizeOutput {
            pdf,
            reports,
            remaining,
        })
    }

    async fn embed_field(
        &self,
        doc: &mut Document,
        field: &SignatureField,
        req: &FinalizeRequest<'_>,
        fonts: &mut FontCache,
        abort: &AbortSignal,
    ) -> DocsealResult<u32> {
        let target = page_target(doc, field.slide_index)?;
        let slide = req
            .slides
            .get(field.slide_index)
            .copied()
            .filter(|s| s.is_usable())
            .ok_or_else(|| {
                DocsealError::embed(format!(
                    "no rendered geometry for slide {}",
                    field.slide_index
                ))
            })?;
        let rect = placement_rect(field, slide, target.media, &self.sizing);

        match &field.content {
            FieldContent::Text { text, font_family } => {
                let color = field
                    .color
                    .as_deref()
                    .and_then(RgbColor::parse_hex)
                    .unwrap_or(RgbColor::BLACK);
                let (family, url) = req.fonts.resolve(font_family.as_deref())?;
                if !fonts.contains_key(url) {
                    let bytes = self.resolver.fetch_bytes(url, abort).await?;
                    let font = EmbeddedFont::parse(doc, family, bytes)?;
                    fonts.insert(url.to_string(), font);
                }
                let font = fonts
                    .get_mut(url)
                    .ok_or_else(|| DocsealError::embed(format!("font '{url}' not loaded")))?;
                self.draw_text(doc, target, rect, text, color, font)?;
            }
            FieldContent::Image { source } => {
                let bytes = load_image_source(&self.resolver, source, abort).await?;
                let image = embed_image(doc, &bytes)?;
                let name = register_resource(doc, target.id, "XObject", "DsIm", image.id)?;
                let placed = fit_centered(
                    Size::new(f64::from(image.width), f64::from(image.height)),
                    rect,
                );
                append_content(doc, target.id, draw_xobject_ops(&name, placed))?;
            }
            FieldContent::Empty => {
                return Err(DocsealError::validation("field has no content to embed"));
            }
        }

        u32::try_from(field.slide_index + 1)
            .map_err(|_| DocsealError::embed("page number out of range"))
    }

    fn draw_text(
        &self,
        doc: &mut Document,
        target: PageTarget,
        rect: Rect,
        text: &str,
        color: RgbColor,
        font: &mut EmbeddedFont,
    ) -> DocsealResult<()> {
        let name = register_resource(doc, target.id, "Font", "DsF", font.object_id())?;

        let unit_width = font.measure(text);
        let (ascent, descent) = font.vertical_metrics();
        let size = fit_text_size(self.text_size_pt, unit_width, ascent, descent, rect);
        let center = rect.center();
        let x = center.x - unit_width * size / 2.0;
        let baseline = center.y - (ascent + descent) / 2000.0 * size;

        let ops = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "rg",
                vec![color.r.into(), color.g.into(), color.b.into()],
            ),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(name.into_bytes()), (size as f32).into()],
            ),
            Operation::new(
                "Tm",
                vec![
                    1.into(),
                    0.into(),
                    0.into(),
                    1.into(),
                    (x as f32).into(),
                    (baseline as f32).into(),
                ],
            ),
            Operation::new("Tj", vec![font.encode(text)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ];
        append_content(doc, target.id, ops)
    }
}

/// The field's box in PDF user space on a page with the given media box.
///
/// The display box (top-left origin, slide pixels) is scaled by `media / slide` per axis and
/// flipped into the page's bottom-left coordinate system.
pub fn placement_rect(
    field: &SignatureField,
    slide: SlideGeometry,
    media: Rect,
    sizing: &BoxSizing,
) -> Rect {
    let sx = media.width() / slide.width;
    let sy = media.height() / slide.height;
    let b = sizing.box_rect(field, slide);
    Rect::new(
        media.x0 + b.x0 * sx,
        media.y0 + media.height() - b.y1 * sy,
        media.x0 + b.x1 * sx,
        media.y0 + media.height() - b.y0 * sy,
    )
}

/// Largest size up to `requested` at which the text fits the box (90% of its width, full height).
fn fit_text_size(requested: f64, unit_width: f64, ascent: f64, descent: f64, rect: Rect) -> f64 {
    let mut size = requested;
    if unit_width > 0.0 {
        size = size.min(rect.width() * 0.9 / unit_width);
    }
    let line = (ascent - descent) / 1000.0;
    if line > 0.0 {
        size = size.min(rect.height() / line);
    }
    size.max(1.0)
}

fn draw_xobject_ops(name: &str, placed: Rect) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                (placed.width() as f32).into(),
                0.into(),
                0.into(),
                (placed.height() as f32).into(),
                (placed.x0 as f32).into(),
                (placed.y0 as f32).into(),
            ],
        ),
        Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

fn open_document(source: &ResolvedSource) -> DocsealResult<Document> {
    if source.is_pdf() {
        return Document::load_mem(&source.bytes).map_err(|e| {
            DocsealError::unsupported(format!("source is not a readable PDF: {e}"))
        });
    }
    if source.is_image() {
        return image_document(&source.bytes);
    }
    Err(DocsealError::unsupported(format!(
        "cannot finalize a '{}' document",
        source.mime_type
    )))
}

/// Wrap an image into a one-page PDF whose page is the image's pixel size in points.
fn image_document(bytes: &[u8]) -> DocsealResult<Document> {
    let mut doc = Document::with_version("1.5");
    let image = embed_image(&mut doc, bytes)?;
    let (w, h) = (i64::from(image.width), i64::from(image.height));

    let pages_id = doc.new_object_id();
    let content = Content {
        operations: draw_xobject_ops(
            "Im1",
            Rect::new(0.0, 0.0, f64::from(image.width), f64::from(image.height)),
        ),
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().context("encode image page content")?,
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), w.into(), h.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im1" => image.id },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    Ok(doc)
}

#[cfg(test)]
#[path = "../../tests/unit/finalize/engine.rs"]
mod tests;
