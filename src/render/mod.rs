pub(crate) mod image;
pub(crate) mod pdf;
pub(crate) mod pdfium;
pub(crate) mod renderer;
pub(crate) mod slide;
pub(crate) mod stream;
pub(crate) mod wait;
