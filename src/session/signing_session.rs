use crate::{
    config::PipelineConfig,
    finalize::engine::{FinalizationEngine, FinalizeOutput, FinalizeRequest},
    finalize::font::FontRegistry,
    foundation::error::{DocsealError, DocsealResult},
    overlay::layer::OverlayLayer,
    overlay::sync::{OverlayEngine, SyncOutcome},
    placement::field::SignatureField,
    placement::geometry::BoxSizing,
    placement::model::PlacementModel,
    render::renderer::{RenderReport, SlideRenderer},
    render::slide::SlideMount,
    source::abort::AbortSignal,
    source::resolve::{DocumentDescriptor, ResolvedSource, SourceResolver},
};

/// One signing session: a document, its slides, the field list and their overlays.
///
/// The session is the single writer of its [`PlacementModel`]. Operations that mutate the model
/// take `&mut self`, so a finalization pass cannot overlap a drag or another finalization.
#[derive(Debug)]
pub struct SigningSession {
    config: PipelineConfig,
    resolver: SourceResolver,
    renderer: SlideRenderer,
    overlays: OverlayEngine,
    finalizer: FinalizationEngine,
    mount: SlideMount,
    layer: OverlayLayer,
    model: PlacementModel,
    source: Option<ResolvedSource>,
}

impl SigningSession {
    /// New session with an empty field list and a container `viewport_width` pixels wide.
    pub fn new(config: PipelineConfig, viewport_width: f64) -> DocsealResult<Self> {
        Self::with_resolver(config, viewport_width, SourceResolver::default())
    }

    /// New session fetching through a caller-provided resolver.
    pub fn with_resolver(
        config: PipelineConfig,
        viewport_width: f64,
        resolver: SourceResolver,
    ) -> DocsealResult<Self> {
        config.validate()?;
        let mount = SlideMount::default();
        mount.set_viewport_width(viewport_width)?;
        Ok(Self {
            renderer: SlideRenderer::new(config.render_scale),
            overlays: OverlayEngine::from_config(&config),
            finalizer: FinalizationEngine::from_config(resolver.clone(), &config),
            model: PlacementModel::with_sizing(BoxSizing::from(&config)),
            layer: OverlayLayer::new(),
            source: None,
            resolver,
            mount,
            config,
        })
    }

    /// Replace the field list (e.g. after loading it from the host).
    pub fn load_fields(&mut self, fields: Vec<SignatureField>) -> DocsealResult<()> {
        self.model.replace_all(fields)
    }

    /// Pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Field list.
    pub fn model(&self) -> &PlacementModel {
        &self.model
    }

    /// Field list, for edits.
    pub fn model_mut(&mut self) -> &mut PlacementModel {
        &mut self.model
    }

    /// Slide container.
    pub fn mount(&self) -> &SlideMount {
        &self.mount
    }

    /// Overlays as of the last sync.
    pub fn layer(&self) -> &OverlayLayer {
        &self.layer
    }

    /// The currently loaded document, if any.
    pub fn source(&self) -> Option<&ResolvedSource> {
        self.source.as_ref()
    }

    /// Resolve a document and render it into slides.
    ///
    /// Loading the document already on screen is a no-op. A different document drops the
    /// overlays of the previous one.
    #[tracing::instrument(skip(self, desc, abort))]
    pub async fn load_document(
        &mut self,
        desc: &DocumentDescriptor,
        abort: &AbortSignal,
    ) -> DocsealResult<RenderReport> {
        let source = self.resolver.resolve(desc, abort).await?;
        let report = self.renderer.render(&source, &self.mount).await?;
        if !report.skipped {
            self.layer.clear();
        }
        self.source = Some(source);
        Ok(report)
    }

    /// Resize the slide container. Call [`SigningSession::sync_overlays`] afterwards.
    pub fn set_viewport_width(&mut self, width: f64) -> DocsealResult<()> {
        self.mount.set_viewport_width(width)
    }

    /// Reconcile overlays with the field list for the acting recipient.
    pub async fn sync_overlays(&mut self, active: Option<&str>) -> SyncOutcome {
        self.overlays
            .sync(self.model.list(), &self.mount, active, &mut self.layer)
            .await
    }

    /// Route a click to `on_edit` when the overlay belongs to the acting recipient.
    pub fn click_overlay(&self, id: &str, on_edit: impl FnOnce(&SignatureField)) -> bool {
        self.layer.click(id, &self.model, on_edit)
    }

    /// Pointer enter/leave on an overlay.
    pub fn hover_overlay(&mut self, id: &str, hovered: bool) -> bool {
        self.layer.hover(id, hovered)
    }

    /// Burn every edited field into the document.
    ///
    /// On success the field list is replaced by the fields that still need signing. On failure
    /// the field list is left untouched.
    pub async fn finalize(
        &mut self,
        fonts: &FontRegistry,
        abort: &AbortSignal,
    ) -> DocsealResult<FinalizeOutput> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| DocsealError::validation("no document loaded"))?;
        let slides = self.mount.geometries();
        let out = self
            .finalizer
            .finalize(
                FinalizeRequest {
                    fields: self.model.list(),
                    source,
                    fonts,
                    slides: &slides,
                },
                abort,
            )
            .await?;
        self.model.replace_all(out.remaining.clone())?;
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/signing_session.rs"]
mod tests;
