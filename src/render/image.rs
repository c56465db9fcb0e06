use std::sync::Arc;

use anyhow::Context;

use crate::{
    foundation::core::Size,
    foundation::error::DocsealResult,
    foundation::math::premultiply_rgba8_in_place,
    render::slide::{RasterImage, Slide, SlideKind},
};

/// Decode encoded image bytes (PNG, JPEG, ...) and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> DocsealResult<RasterImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(RasterImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// An image source is exactly one slide, sized by its pixel dimensions.
pub fn image_slide(bytes: &[u8]) -> DocsealResult<Slide> {
    let raster = decode_image(bytes)?;
    Ok(Slide {
        index: 0,
        kind: SlideKind::Image,
        intrinsic: Size::new(f64::from(raster.width), f64::from(raster.height)),
        raster,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/image.rs"]
mod tests;
