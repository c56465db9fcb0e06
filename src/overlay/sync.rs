use crate::{
    config::PipelineConfig,
    foundation::core::{RgbColor, SlideGeometry},
    foundation::error::DocsealError,
    overlay::layer::{Caption, OverlayContent, OverlayElement, OverlayLayer},
    overlay::style::OverlayStyle,
    placement::field::{FieldContent, SignatureField},
    placement::geometry::BoxSizing,
    render::slide::SlideMount,
    render::wait::{RetryPolicy, wait_for_slides},
};

/// Counters from one reconciliation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Overlays created this pass.
    pub created: usize,
    /// Existing overlays updated in place.
    pub updated: usize,
    /// Overlays dropped because their field or slide is gone.
    pub removed: usize,
    /// Fields whose slide does not exist yet.
    pub pending: usize,
}

/// Result of an overlay sync trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Overlays reconciled against the mounted slides.
    Synced(SyncStats),
    /// No slide appeared within the retry budget; the layer was left untouched.
    NotReady {
        /// Polls performed.
        attempts: u32,
    },
}

/// Keeps exactly one overlay per field positioned over its slide.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OverlayEngine {
    sizing: BoxSizing,
    retry: RetryPolicy,
}

impl OverlayEngine {
    /// Engine with explicit sizing and slide polling policy.
    pub fn new(sizing: BoxSizing, retry: RetryPolicy) -> Self {
        Self { sizing, retry }
    }

    /// Engine configured from a pipeline config.
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self::new(BoxSizing::from(cfg), cfg.sync_retry)
    }

    /// Wait for slides on `mount`, then reconcile `layer` with `fields`.
    ///
    /// Running out of retries is not an error: it means the document is not ready (or has no
    /// pages) and is reported as [`SyncOutcome::NotReady`].
    #[tracing::instrument(skip(self, fields, mount, layer), fields(field_count = fields.len()))]
    pub async fn sync(
        &self,
        fields: &[SignatureField],
        mount: &SlideMount,
        active: Option<&str>,
        layer: &mut OverlayLayer,
    ) -> SyncOutcome {
        if let Err(e) = wait_for_slides(mount, 1, self.retry).await {
            let attempts = match e {
                DocsealError::RenderTimeout { attempts } => attempts,
                _ => 0,
            };
            tracing::debug!(attempts, "no slides mounted, overlay sync abandoned");
            return SyncOutcome::NotReady { attempts };
        }
        SyncOutcome::Synced(self.sync_once(fields, &mount.geometries(), active, layer))
    }

    /// One reconciliation pass against known slide geometry.
    ///
    /// Fields are visited in list order; a repeated id overwrites its earlier overlay.
    pub fn sync_once(
        &self,
        fields: &[SignatureField],
        slides: &[SlideGeometry],
        active: Option<&str>,
        layer: &mut OverlayLayer,
    ) -> SyncStats {
        let mut previous = layer.take_all();
        let mut stats = SyncStats::default();

        for field in fields {
            let Some(&slide) = slides.get(field.slide_index) else {
                stats.pending += 1;
                continue;
            };
            let hovered = match previous.remove(&field.id) {
                Some(old) => {
                    stats.updated += 1;
                    old.hovered
                }
                None if layer.get(&field.id).is_some() => {
                    stats.updated += 1;
                    false
                }
                None => {
                    stats.created += 1;
                    false
                }
            };
            let mut el = self.element_for(field, slide, active);
            el.hovered = hovered && el.interactive;
            layer.put(el);
        }

        stats.removed = previous.len();
        stats
    }

    fn element_for(
        &self,
        field: &SignatureField,
        slide: SlideGeometry,
        active: Option<&str>,
    ) -> OverlayElement {
        let is_active = active.is_some_and(|email| field.belongs_to(email));
        let is_signed = field.is_signed();

        let content = match &field.content {
            FieldContent::Text { text, font_family } => OverlayContent::Text {
                text: text.clone(),
                font_family: font_family.clone(),
                color: field
                    .color
                    .as_deref()
                    .and_then(RgbColor::parse_hex)
                    .unwrap_or(RgbColor::BLACK),
            },
            FieldContent::Image { source } => OverlayContent::Image {
                source: source.clone(),
            },
            FieldContent::Empty => OverlayContent::Caption(if field.signature_is_edit {
                Caption::Signed
            } else if is_active {
                Caption::ClickToSign
            } else {
                Caption::SignatureOf(field.recipient_email.clone())
            }),
        };

        OverlayElement {
            field_id: field.id.clone(),
            slide_index: slide.index,
            rect: self.sizing.box_rect(field, slide),
            content,
            style: OverlayStyle::resolve(is_active, is_signed, field.color.as_deref()),
            interactive: is_active,
            movable: is_active && !field.signature_content_fixed,
            hovered: false,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/sync.rs"]
mod tests;
