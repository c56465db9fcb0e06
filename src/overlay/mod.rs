pub(crate) mod layer;
pub(crate) mod style;
pub(crate) mod sync;
