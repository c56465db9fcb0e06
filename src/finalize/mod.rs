pub(crate) mod engine;
pub(crate) mod font;
pub(crate) mod image;
pub(crate) mod pdf_edit;
