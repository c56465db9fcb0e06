use std::collections::HashMap;

use crate::{
    foundation::core::{Rect, RgbColor},
    overlay::style::OverlayStyle,
    placement::field::SignatureField,
    placement::model::PlacementModel,
};

/// Placeholder text shown on an overlay without content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Caption {
    /// The acting recipient's own unsigned field.
    ClickToSign,
    /// A signed field.
    Signed,
    /// Another recipient's unsigned field.
    SignatureOf(String),
}

impl Caption {
    /// Display text.
    pub fn label(&self) -> String {
        match self {
            Self::ClickToSign => "Click to sign".to_string(),
            Self::Signed => "Signed".to_string(),
            Self::SignatureOf(email) => format!("Signature of {email}"),
        }
    }
}

/// What an overlay displays.
#[derive(Clone, Debug, PartialEq)]
pub enum OverlayContent {
    /// Typed signature.
    Text {
        /// Text.
        text: String,
        /// Font family, if any.
        font_family: Option<String>,
        /// Glyph color.
        color: RgbColor,
    },
    /// Image signature.
    Image {
        /// Data URL or image URL.
        source: String,
    },
    /// Placeholder.
    Caption(Caption),
}

/// One interactive element positioned over a slide.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayElement {
    /// Id of the field this overlay shows.
    pub field_id: String,
    /// Slide the overlay sits on.
    pub slide_index: usize,
    /// Box in slide display pixels, origin at the slide's top-left corner.
    pub rect: Rect,
    /// Displayed content.
    pub content: OverlayContent,
    /// Visual state.
    pub style: OverlayStyle,
    /// Receives click and hover.
    pub interactive: bool,
    /// Can be dragged and resized.
    pub movable: bool,
    /// Pointer currently over the overlay.
    pub hovered: bool,
}

/// Overlay elements keyed by field id, kept in field-list order.
#[derive(Clone, Debug, Default)]
pub struct OverlayLayer {
    elements: Vec<OverlayElement>,
    index: HashMap<String, usize>,
}

impl OverlayLayer {
    /// Empty layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of overlays.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether there is no overlay.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Overlay for field `id`.
    pub fn get(&self, id: &str) -> Option<&OverlayElement> {
        self.index.get(id).map(|&i| &self.elements[i])
    }

    /// Overlays in order.
    pub fn iter(&self) -> impl Iterator<Item = &OverlayElement> {
        self.elements.iter()
    }

    /// Overlays on slide `index`.
    pub fn on_slide(&self, index: usize) -> impl Iterator<Item = &OverlayElement> {
        self.elements.iter().filter(move |e| e.slide_index == index)
    }

    /// Remove every overlay.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.index.clear();
    }

    /// Route a click on overlay `id` to `on_edit`.
    ///
    /// Returns `false` (and does not call `on_edit`) when the overlay is missing or not
    /// interactive for the acting recipient.
    pub fn click(
        &self,
        id: &str,
        model: &PlacementModel,
        on_edit: impl FnOnce(&SignatureField),
    ) -> bool {
        let Some(el) = self.get(id) else {
            return false;
        };
        if !el.interactive {
            return false;
        }
        match model.get(id) {
            Some(field) => {
                on_edit(field);
                true
            }
            None => false,
        }
    }

    /// Update hover state. Non-interactive overlays ignore hover.
    pub fn hover(&mut self, id: &str, hovered: bool) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        let el = &mut self.elements[i];
        if !el.interactive {
            return false;
        }
        el.hovered = hovered;
        true
    }

    /// Insert or replace by field id. Replacing keeps the element's position in the order.
    pub(crate) fn put(&mut self, el: OverlayElement) {
        match self.index.get(&el.field_id) {
            Some(&i) => self.elements[i] = el,
            None => {
                self.index.insert(el.field_id.clone(), self.elements.len());
                self.elements.push(el);
            }
        }
    }

    /// Empty the layer, handing back the previous overlays by id.
    pub(crate) fn take_all(&mut self) -> HashMap<String, OverlayElement> {
        self.index.clear();
        self.elements
            .drain(..)
            .map(|e| (e.field_id.clone(), e))
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/layer.rs"]
mod tests;
