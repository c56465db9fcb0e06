pub(crate) mod field;
pub(crate) mod geometry;
pub(crate) mod model;
