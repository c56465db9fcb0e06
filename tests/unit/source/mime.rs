use super::*;

#[test]
fn sniffs_common_signatures() {
    assert_eq!(sniff(b"%PDF-1.7\n..."), Some(PDF));
    assert_eq!(sniff(b"\n\n  %PDF-1.4"), Some(PDF));
    assert_eq!(
        sniff(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0]),
        Some(PNG)
    );
    assert_eq!(sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(JPEG));
    assert_eq!(sniff(b"GIF89a...."), Some("image/gif"));
    assert_eq!(sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
    assert_eq!(sniff(b"hello"), None);
}

#[test]
fn extension_ignores_query_and_case() {
    assert_eq!(from_extension("https://cdn/x/Doc.PDF?sig=abc"), Some(PDF));
    assert_eq!(from_extension("/tmp/photo.jpeg#frag"), Some(JPEG));
    assert_eq!(from_extension("noext"), None);
}

#[test]
fn detect_precedence() {
    let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    assert_eq!(detect(Some("Image/PNG"), Some(PDF), b"", None), "image/png");
    assert_eq!(detect(None, Some("Application/PDF; charset=binary"), b"", None), PDF);
    // Content beats every declared type.
    assert_eq!(detect(Some(PDF), Some(PDF), &png, Some("a.pdf")), PNG);
    assert_eq!(detect(None, Some("text/plain"), b"%PDF-1.7", None), PDF);
    assert_eq!(
        detect(None, Some("application/octet-stream"), &png, Some("a.pdf")),
        PNG
    );
    assert_eq!(detect(None, None, b"??", Some("scan.jpg")), JPEG);
    assert_eq!(detect(None, None, b"??", None), OCTET_STREAM);
}

#[test]
fn family_predicates() {
    assert!(is_pdf("APPLICATION/PDF"));
    assert!(is_image("image/webp"));
    assert!(!is_image("img"));
    assert!(!is_image(PDF));
}
