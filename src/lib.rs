//! Docseal turns a document into signable slides and burns signatures back into it.
//!
//! The pipeline is session-oriented:
//!
//! - Resolve a [`DocumentDescriptor`] (URL, path or in-memory blob) into bytes
//! - Render it into [`SlideMount`] slides with a [`SlideRenderer`]
//! - Keep [`SignatureField`]s in a [`PlacementModel`] and mirror them as overlays with the
//!   [`OverlayEngine`]
//! - Embed edited fields into the PDF with the [`FinalizationEngine`]
//!
//! [`SigningSession`] bundles all of it for one document.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Pipeline configuration.
pub mod config;
pub(crate) mod finalize;
pub(crate) mod overlay;
pub(crate) mod placement;
pub(crate) mod render;
pub(crate) mod session;
/// Document sources: fetching, MIME detection and cancellation.
pub mod source;

pub use crate::foundation::core::{
    Affine, FULL_SLIDE, Point, Rect, RgbColor, Size, SlideGeometry, Vec2,
};
pub use crate::foundation::error::{DocsealError, DocsealResult};

pub use crate::config::PipelineConfig;
pub use crate::finalize::engine::{
    FieldOutcome, FieldReport, FinalizationEngine, FinalizeOutput, FinalizePolicy,
    FinalizeRequest, placement_rect,
};
pub use crate::finalize::font::FontRegistry;
pub use crate::overlay::layer::{Caption, OverlayContent, OverlayElement, OverlayLayer};
pub use crate::overlay::style::{BorderStyle, Cursor, OverlayStyle};
pub use crate::overlay::sync::{OverlayEngine, SyncOutcome, SyncStats};
pub use crate::placement::field::{
    FieldContent, FieldPatch, FieldRecord, SignatureField, SignatureType,
};
pub use crate::placement::geometry::BoxSizing;
pub use crate::placement::model::{PlacementModel, VisibleRegion};
pub use crate::render::image::{decode_image, image_slide};
pub use crate::render::pdf::{PageRasterizer, PdfRasterizer};
pub use crate::render::pdfium::{PDFIUM_DIR_ENV, PdfiumRasterizer};
pub use crate::render::renderer::{RenderReport, SlideRenderer, fingerprint};
pub use crate::render::slide::{RasterImage, Slide, SlideKind, SlideMount};
pub use crate::render::wait::{RetryPolicy, SlideCounter, wait_for_slides};
pub use crate::session::signing_session::SigningSession;
pub use crate::source::abort::{AbortHandle, AbortSignal};
pub use crate::source::resolve::{
    DocumentDescriptor, Fetched, FileBlob, ResolvedSource, SourceResolver,
};
