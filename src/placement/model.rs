use rand::Rng;

use crate::{
    foundation::core::{FULL_SLIDE, Rect, SlideGeometry},
    foundation::error::{DocsealError, DocsealResult},
    foundation::math::clamp_center,
    placement::field::{FieldContent, FieldPatch, FieldRecord, SignatureField, unit},
    placement::geometry::BoxSizing,
};

/// The part of a slide currently scrolled into view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibleRegion {
    /// Slide being looked at.
    pub slide: SlideGeometry,
    /// Visible part in normalized slide coordinates.
    pub visible: Rect,
}

impl VisibleRegion {
    /// The whole slide is visible.
    pub fn whole(slide: SlideGeometry) -> Self {
        Self {
            slide,
            visible: FULL_SLIDE,
        }
    }

    /// Region from a vertical scroll window, in slide display pixels.
    pub fn from_scroll(slide: SlideGeometry, scroll_top: f64, viewport_height: f64) -> Self {
        if !slide.is_usable() {
            return Self::whole(slide);
        }
        let y0 = (scroll_top / slide.height).clamp(0.0, 1.0);
        let y1 = ((scroll_top + viewport_height) / slide.height).clamp(y0, 1.0);
        Self {
            slide,
            visible: Rect::new(0.0, y0, 1.0, y1),
        }
    }
}

/// Ordered, mutable list of signature fields for one session.
///
/// Pure state: no rendering dependency. Unknown ids are reported as
/// [`DocsealError::Validation`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlacementModel {
    fields: Vec<SignatureField>,
    sizing: BoxSizing,
}

impl PlacementModel {
    /// Empty model with default box sizing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty model with explicit box sizing rules.
    pub fn with_sizing(sizing: BoxSizing) -> Self {
        Self {
            fields: Vec::new(),
            sizing,
        }
    }

    /// Model over `fields`, rejecting duplicate or empty ids.
    pub fn from_fields(fields: Vec<SignatureField>) -> DocsealResult<Self> {
        let mut m = Self::new();
        m.replace_all(fields)?;
        Ok(m)
    }

    /// Box sizing rules used by drag and resize.
    pub fn sizing(&self) -> BoxSizing {
        self.sizing
    }

    /// Append a field.
    pub fn add(&mut self, mut field: SignatureField) -> DocsealResult<&SignatureField> {
        field.validate()?;
        if self.position(&field.id).is_some() {
            return Err(DocsealError::validation(format!(
                "duplicate field id {}",
                field.id
            )));
        }
        field.left = unit(field.left);
        field.top = unit(field.top);
        self.fields.push(field);
        Ok(&self.fields[self.fields.len() - 1])
    }

    /// Apply a partial update.
    pub fn update(&mut self, id: &str, patch: FieldPatch) -> DocsealResult<&SignatureField> {
        let idx = self.index_of(id)?;
        let mut next = self.fields[idx].clone();
        patch.apply(&mut next);
        next.validate()?;
        self.fields[idx] = next;
        Ok(&self.fields[idx])
    }

    /// Remove and return a field.
    pub fn remove(&mut self, id: &str) -> DocsealResult<SignatureField> {
        let idx = self.index_of(id)?;
        Ok(self.fields.remove(idx))
    }

    /// All fields, in order.
    pub fn list(&self) -> &[SignatureField] {
        &self.fields
    }

    /// Field by id.
    pub fn get(&self, id: &str) -> Option<&SignatureField> {
        self.position(id).map(|i| &self.fields[i])
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the model holds no field.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Clone field `id` to a random spot inside `region`, with a fresh id.
    ///
    /// The copy lands on the region's slide, its box fully inside the visible part where it fits,
    /// and is marked content-fixed. It is inserted right after the original.
    pub fn copy(&mut self, id: &str, region: &VisibleRegion) -> DocsealResult<&SignatureField> {
        self.copy_with_rng(id, region, &mut rand::thread_rng())
    }

    /// [`PlacementModel::copy`] with a caller-provided random source.
    pub fn copy_with_rng<R: Rng>(
        &mut self,
        id: &str,
        region: &VisibleRegion,
        rng: &mut R,
    ) -> DocsealResult<&SignatureField> {
        let idx = self.index_of(id)?;
        let mut copy = self.fields[idx].clone();
        copy.id = uuid::Uuid::new_v4().to_string();
        copy.slide_index = region.slide.index;
        copy.signature_content_fixed = true;

        let half = self.sizing.normalized_half(&copy, region.slide);
        let vis = region.visible.abs().intersect(FULL_SLIDE);
        let mut pick = |lo: f64, hi: f64, half: f64| {
            let (min, max) = (lo + half, hi - half);
            let v = if min < max {
                rng.gen_range(min..=max)
            } else {
                (lo + hi) * 0.5
            };
            clamp_center(v, half, 0.0, 1.0)
        };
        copy.left = pick(vis.x0, vis.x1, half.x);
        copy.top = pick(vis.y0, vis.y1, half.y);

        self.fields.insert(idx + 1, copy);
        Ok(&self.fields[idx + 1])
    }

    /// Fill a field's payload; marks it edited.
    pub fn fill(&mut self, id: &str, content: FieldContent) -> DocsealResult<&SignatureField> {
        if content.is_empty() {
            return Err(DocsealError::validation(
                "fill requires text or image content",
            ));
        }
        let idx = self.index_of(id)?;
        self.fields[idx].set_content(content);
        Ok(&self.fields[idx])
    }

    /// Drop a field's payload; marks it unedited.
    pub fn clear_content(&mut self, id: &str) -> DocsealResult<&SignatureField> {
        let idx = self.index_of(id)?;
        self.fields[idx].set_content(FieldContent::Empty);
        Ok(&self.fields[idx])
    }

    /// Drag by `(dx, dy)` display pixels on `slide`.
    ///
    /// The center is clamped so the whole box stays on the slide.
    pub fn move_by(
        &mut self,
        id: &str,
        dx: f64,
        dy: f64,
        slide: SlideGeometry,
    ) -> DocsealResult<&SignatureField> {
        if !(dx.is_finite() && dy.is_finite()) {
            return Err(DocsealError::validation("drag delta must be finite"));
        }
        let idx = self.movable_index(id, slide)?;
        let sizing = self.sizing;
        let f = &mut self.fields[idx];
        let half = sizing.normalized_half(f, slide);
        f.left = clamp_center(f.left + dx / slide.width, half.x, 0.0, 1.0);
        f.top = clamp_center(f.top + dy / slide.height, half.y, 0.0, 1.0);
        Ok(&self.fields[idx])
    }

    /// Resize to `width x height` display pixels on `slide`, keeping the center on the slide.
    pub fn resize(
        &mut self,
        id: &str,
        width: f64,
        height: f64,
        slide: SlideGeometry,
    ) -> DocsealResult<&SignatureField> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(DocsealError::validation("field size must be > 0"));
        }
        let idx = self.movable_index(id, slide)?;
        let sizing = self.sizing;
        let scale = sizing.scale_for(slide.width);
        let f = &mut self.fields[idx];
        f.width = width / scale;
        f.height = height / scale;
        let half = sizing.normalized_half(f, slide);
        f.left = clamp_center(f.left, half.x, 0.0, 1.0);
        f.top = clamp_center(f.top, half.y, 0.0, 1.0);
        Ok(&self.fields[idx])
    }

    /// Fields owned by `email`, in order.
    pub fn fields_for_recipient(&self, email: &str) -> Vec<&SignatureField> {
        self.fields.iter().filter(|f| f.belongs_to(email)).collect()
    }

    /// Fields that have been filled, in order.
    pub fn edited(&self) -> Vec<&SignatureField> {
        self.fields.iter().filter(|f| f.signature_is_edit).collect()
    }

    /// Replace the whole list (e.g. with the fields left after finalization).
    pub fn replace_all(&mut self, fields: Vec<SignatureField>) -> DocsealResult<()> {
        let mut seen = std::collections::HashSet::with_capacity(fields.len());
        for f in &fields {
            f.validate()?;
            if !seen.insert(f.id.as_str()) {
                return Err(DocsealError::validation(format!(
                    "duplicate field id {}",
                    f.id
                )));
            }
        }
        self.fields = fields;
        Ok(())
    }

    /// Take the fields out, leaving the model empty.
    pub fn take(&mut self) -> Vec<SignatureField> {
        std::mem::take(&mut self.fields)
    }

    /// Load host JSON (an array of camelCase records). Soft-deleted records are dropped.
    pub fn from_json(json: &str) -> DocsealResult<Self> {
        let records: Vec<FieldRecord> = serde_json::from_str(json)?;
        let mut fields = Vec::with_capacity(records.len());
        for r in records {
            if r.signature_delete {
                tracing::debug!(id = %r.id, "dropping soft-deleted field");
                continue;
            }
            fields.push(SignatureField::try_from(r)?);
        }
        Self::from_fields(fields)
    }

    /// Serialize to host JSON.
    pub fn to_json(&self) -> DocsealResult<String> {
        Ok(serde_json::to_string_pretty(&self.fields)?)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }

    fn index_of(&self, id: &str) -> DocsealResult<usize> {
        self.position(id)
            .ok_or_else(|| DocsealError::validation(format!("unknown field id {id}")))
    }

    fn movable_index(&self, id: &str, slide: SlideGeometry) -> DocsealResult<usize> {
        let idx = self.index_of(id)?;
        if self.fields[idx].signature_content_fixed {
            return Err(DocsealError::validation(format!(
                "field {id} is fixed and cannot be moved or resized"
            )));
        }
        if !slide.is_usable() {
            return Err(DocsealError::validation("slide geometry must be > 0"));
        }
        Ok(idx)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/placement/model.rs"]
mod tests;
