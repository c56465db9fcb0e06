//! MIME type detection for document, font and image bytes.

/// `application/pdf`.
pub const PDF: &str = "application/pdf";
/// `image/png`.
pub const PNG: &str = "image/png";
/// `image/jpeg`.
pub const JPEG: &str = "image/jpeg";
/// Fallback when nothing else is known.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Sniff well-known magic bytes.
pub fn sniff(bytes: &[u8]) -> Option<&'static str> {
    // PDF headers may be preceded by junk; readers accept the marker within the first 1 KiB.
    let head = &bytes[..bytes.len().min(1024)];
    if head.windows(5).any(|w| w == b"%PDF-") {
        return Some(PDF);
    }
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(PNG);
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(JPEG);
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.starts_with(&[0x00, 0x01, 0x00, 0x00]) || bytes.starts_with(b"true") {
        return Some("font/ttf");
    }
    if bytes.starts_with(b"OTTO") {
        return Some("font/otf");
    }
    None
}

/// Guess from a URL or path extension, ignoring query strings and fragments.
pub fn from_extension(url_or_path: &str) -> Option<&'static str> {
    let path = url_or_path
        .split(['?', '#'])
        .next()
        .unwrap_or(url_or_path);
    let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(PDF),
        "png" => Some(PNG),
        "jpg" | "jpeg" => Some(JPEG),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "ttf" => Some("font/ttf"),
        "otf" => Some("font/otf"),
        _ => None,
    }
}

/// Normalize a `Content-Type` header value: lowercase, parameters stripped.
pub fn essence(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
    if essence.is_empty() || !essence.contains('/') {
        return None;
    }
    Some(essence)
}

/// Whether a MIME type designates a PDF document.
pub fn is_pdf(mime: &str) -> bool {
    mime.eq_ignore_ascii_case(PDF)
}

/// Whether a MIME type designates a raster image.
pub fn is_image(mime: &str) -> bool {
    mime.get(..6)
        .is_some_and(|p| p.eq_ignore_ascii_case("image/"))
}

/// Resolve the final MIME type.
///
/// Magic bytes win, then the explicit type, then the header, then the extension. A generic
/// header (`application/octet-stream`, `binary/octet-stream`) is ignored.
pub(crate) fn detect(
    explicit: Option<&str>,
    header: Option<&str>,
    bytes: &[u8],
    location: Option<&str>,
) -> String {
    if let Some(m) = sniff(bytes) {
        return m.to_string();
    }
    if let Some(m) = explicit.and_then(essence) {
        return m;
    }
    if let Some(m) = header.and_then(essence)
        && !m.ends_with("/octet-stream")
    {
        return m;
    }
    location
        .and_then(from_extension)
        .unwrap_or(OCTET_STREAM)
        .to_string()
}

#[cfg(test)]
#[path = "../../tests/unit/source/mime.rs"]
mod tests;
