use super::*;

#[test]
fn draw_with_data_url_becomes_image() {
    let json = r#"{
        "id": "f1",
        "slideIndex": 0,
        "left": 0.5,
        "top": 0.5,
        "width": 136,
        "height": 80,
        "recipientEmail": "a@example.com",
        "signatureType": "draw",
        "signature": "data:image/png;base64,AAAA",
        "signatureIsEdit": true
    }"#;
    let f: SignatureField = serde_json::from_str(json).unwrap();
    assert_eq!(f.signature_type, SignatureType::Image);
    assert_eq!(f.content, FieldContent::image("data:image/png;base64,AAAA"));
    assert!(f.is_signed());
}

#[test]
fn text_wins_over_image_payload() {
    let content = FieldContent::from_parts(
        Some("Jane".into()),
        Some("  ".into()),
        Some("data:image/png;base64,AAAA".into()),
    );
    assert_eq!(content, FieldContent::text("Jane", None));
    assert_eq!(
        FieldContent::from_parts(Some(" ".into()), None, None),
        FieldContent::Empty
    );
}

#[test]
fn unedited_record_carries_no_payload() {
    let json = r#"{"id":"f2","recipientEmail":"b@example.com","signatureText":"stale","signatureIsEdit":false}"#;
    let f: SignatureField = serde_json::from_str(json).unwrap();
    assert_eq!(f.content, FieldContent::Empty);
    assert!(!f.signature_is_edit);

    // A record claiming to be edited without payload is not edited.
    let json = r#"{"id":"f3","recipientEmail":"b@example.com","signatureIsEdit":true}"#;
    let f: SignatureField = serde_json::from_str(json).unwrap();
    assert!(!f.signature_is_edit);
}

#[test]
fn out_of_range_coordinates_are_clamped_on_load() {
    let json = r#"{"id":"f4","left":1.7,"top":-0.2,"recipientEmail":"c@example.com"}"#;
    let f: SignatureField = serde_json::from_str(json).unwrap();
    assert_eq!((f.left, f.top), (1.0, 0.0));
}

#[test]
fn empty_id_is_rejected() {
    let err = serde_json::from_str::<SignatureField>(r#"{"recipientEmail":"x@y.z"}"#);
    assert!(err.is_err());
}

#[test]
fn serializes_to_camel_case_record() {
    let f = SignatureField::new(2, 0.25, 0.75, "d@example.com")
        .with_color("#ff0000")
        .with_content(FieldContent::text("Dee", Some("Caveat".into())));
    let v = serde_json::to_value(&f).unwrap();
    assert_eq!(v["slideIndex"], 2);
    assert_eq!(v["recipientEmail"], "d@example.com");
    assert_eq!(v["signatureType"], "text");
    assert_eq!(v["signatureText"], "Dee");
    assert_eq!(v["signatureFontFamily"], "Caveat");
    assert_eq!(v["signatureIsEdit"], true);
    assert!(v.get("signature").is_none());
    assert!(v.get("signatureDelete").is_none());

    let back: SignatureField = serde_json::from_value(v).unwrap();
    assert_eq!(back, f);
}

#[test]
fn set_content_keeps_flags_in_step() {
    let mut f = SignatureField::new(0, 0.5, 0.5, "e@example.com");
    assert!(!f.signature_is_edit);
    f.set_content(FieldContent::image("data:image/jpeg;base64,AAAA"));
    assert!(f.signature_is_edit);
    assert_eq!(f.signature_type, SignatureType::Image);
    f.set_content(FieldContent::Empty);
    assert!(!f.signature_is_edit);
    assert!(!f.is_signed());
}

#[test]
fn patch_clamps_position() {
    let mut f = SignatureField::new(0, 0.5, 0.5, "f@example.com");
    FieldPatch::position(3.0, f64::NAN).apply(&mut f);
    assert_eq!((f.left, f.top), (1.0, 0.5));
}

#[test]
fn recipient_match_ignores_case() {
    let f = SignatureField::new(0, 0.5, 0.5, "Owner@Example.com");
    assert!(f.belongs_to("owner@example.com "));
    assert!(!f.belongs_to("other@example.com"));
}
