pub(crate) mod abort;
pub mod mime;
pub(crate) mod resolve;
