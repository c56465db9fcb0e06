use super::*;

#[test]
fn clamp_center_keeps_box_inside_range() {
    assert_eq!(clamp_center(0.5, 0.1, 0.0, 1.0), 0.5);
    assert_eq!(clamp_center(-3.0, 0.1, 0.0, 1.0), 0.1);
    assert_eq!(clamp_center(7.0, 0.1, 0.0, 1.0), 0.9);
    assert_eq!(clamp_center(f64::NAN, 0.1, 0.0, 1.0), 0.5);
}

#[test]
fn clamp_center_pins_oversized_box_to_middle() {
    assert_eq!(clamp_center(0.0, 0.8, 0.0, 1.0), 0.5);
    assert_eq!(clamp_center(0.9, 0.3, 0.2, 0.6), 0.4);
}

#[test]
fn fit_centered_preserves_aspect() {
    let placed = fit_centered(Size::new(200.0, 100.0), Rect::new(0.0, 0.0, 100.0, 100.0));
    assert_eq!(placed, Rect::new(0.0, 25.0, 100.0, 75.0));

    let tall = fit_centered(Size::new(10.0, 40.0), Rect::new(10.0, 10.0, 90.0, 50.0));
    assert!((tall.width() - 10.0).abs() < 1e-9);
    assert!((tall.height() - 40.0).abs() < 1e-9);
    assert_eq!(tall.center(), Rect::new(10.0, 10.0, 90.0, 50.0).center());
}

#[test]
fn premultiply_zeroes_transparent_pixels() {
    let mut px = vec![200u8, 100, 50, 0, 100, 50, 200, 128];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(&px[..4], &[0, 0, 0, 0]);
    assert_eq!(
        &px[4..],
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128
        ]
    );
}

#[test]
fn unpremultiply_restores_opaque_and_half_alpha() {
    let mut px = vec![10u8, 20, 30, 255, 64, 32, 0, 128, 9, 9, 9, 0];
    unpremultiply_rgba8_in_place(&mut px);
    assert_eq!(&px[..4], &[10, 20, 30, 255]);
    assert_eq!(&px[4..8], &[128, 64, 0, 128]);
    assert_eq!(&px[8..], &[0, 0, 0, 0]);
}
