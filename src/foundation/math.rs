use crate::foundation::core::{Rect, Size};

/// Clamp a normalized center coordinate so a box of normalized half-extent `half` stays inside
/// `[lo, hi]`.
///
/// Non-finite input collapses to the middle of the range. When the box is wider than the range
/// the center is pinned to the middle.
pub(crate) fn clamp_center(value: f64, half: f64, lo: f64, hi: f64) -> f64 {
    let half = if half.is_finite() { half.max(0.0) } else { 0.0 };
    let mid = (lo + hi) * 0.5;
    let min = lo + half;
    let max = hi - half;
    if min > max {
        return mid.clamp(0.0, 1.0);
    }
    let v = if value.is_finite() { value } else { mid };
    v.clamp(min, max).clamp(0.0, 1.0)
}

/// Uniform aspect-preserving fit of `content` inside `bounds`, centered.
///
/// Returns the placed rectangle in `bounds` space.
pub(crate) fn fit_centered(content: Size, bounds: Rect) -> Rect {
    if content.width <= 0.0 || content.height <= 0.0 {
        return Rect::from_center_size(bounds.center(), Size::ZERO);
    }
    let scale = (bounds.width() / content.width).min(bounds.height() / content.height);
    Rect::from_center_size(
        bounds.center(),
        Size::new(content.width * scale, content.height * scale),
    )
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

pub(crate) fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[1] = ((px[1] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[2] = ((px[2] as u16 * 255 + a / 2) / a).min(255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
