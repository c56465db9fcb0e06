use std::path::Path;

use anyhow::Context as _;

use crate::{
    finalize::engine::FinalizePolicy,
    foundation::core::Size,
    foundation::error::{DocsealError, DocsealResult},
    render::wait::RetryPolicy,
};

/// Layout width (px) signature field sizes were authored against.
pub const REFERENCE_DESIGN_WIDTH: f64 = 1280.0;

/// Internal raster scale applied when rendering PDF pages.
pub const DEFAULT_RENDER_SCALE: f64 = 2.0;

/// Placement box used when a field carries no usable size.
pub const FALLBACK_BOX: Size = Size::new(180.0, 70.0);

/// Tunables shared by the renderer, overlay sync and finalization.
///
/// Every field has a default, so a partial JSON file is a valid config.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Width (px) field sizes are expressed at.
    pub reference_design_width: f64,
    /// Raster scale for PDF pages (2.0 renders at twice the point size).
    pub render_scale: f64,
    /// Slide availability polling used by the overlay sync engine.
    pub sync_retry: RetryPolicy,
    /// Placement box (px at reference width) for fields without a usable size.
    pub fallback_box: Size,
    /// Requested text signature size in PDF points; shrunk to fit the box.
    pub text_size_pt: f64,
    /// What to do when some fields fail to embed.
    pub finalize_policy: FinalizePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reference_design_width: REFERENCE_DESIGN_WIDTH,
            render_scale: DEFAULT_RENDER_SCALE,
            sync_retry: RetryPolicy::default(),
            fallback_box: FALLBACK_BOX,
            text_size_pt: 24.0,
            finalize_policy: FinalizePolicy::AllowPartial,
        }
    }
}

impl PipelineConfig {
    /// Defaults with `DOCSEAL_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg
    }

    /// Load a JSON config file, then apply environment overrides.
    pub fn load(path: &Path) -> DocsealResult<Self> {
        let raw = std::fs::read(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let mut cfg: Self = serde_json::from_slice(&raw)?;
        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply overrides from an arbitrary key lookup. Unparseable or out-of-range values are
    /// ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("DOCSEAL_REFERENCE_WIDTH")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|&v| v.is_finite() && v > 0.0)
        {
            self.reference_design_width = v;
        }
        if let Some(v) = lookup("DOCSEAL_RENDER_SCALE")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|&v| v.is_finite() && v > 0.0)
        {
            self.render_scale = v;
        }
        if let Some(v) = lookup("DOCSEAL_SYNC_RETRY_DELAY_MS").and_then(|v| v.parse::<u64>().ok()) {
            self.sync_retry.delay_ms = v;
        }
        if let Some(v) = lookup("DOCSEAL_SYNC_MAX_RETRIES").and_then(|v| v.parse::<u32>().ok()) {
            self.sync_retry.max_retries = v;
        }
    }

    /// Reject values that would make coordinate math meaningless.
    pub fn validate(&self) -> DocsealResult<()> {
        if !(self.reference_design_width.is_finite() && self.reference_design_width > 0.0) {
            return Err(DocsealError::validation(
                "reference_design_width must be > 0",
            ));
        }
        if !(self.render_scale.is_finite() && self.render_scale > 0.0) {
            return Err(DocsealError::validation("render_scale must be > 0"));
        }
        if !(self.text_size_pt.is_finite() && self.text_size_pt > 0.0) {
            return Err(DocsealError::validation("text_size_pt must be > 0"));
        }
        if self.fallback_box.width <= 0.0 || self.fallback_box.height <= 0.0 {
            return Err(DocsealError::validation("fallback_box must be non-empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config/config.rs"]
mod tests;
