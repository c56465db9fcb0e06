use super::*;
use crate::placement::field::FieldContent;
use crate::source::resolve::FileBlob;
use lopdf::{Document, Object, Stream, dictionary};

const FONT_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/fonts/DejaVuSans.ttf");
const OWNER: &str = "owner@example.com";

fn small_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for _ in 0..pages {
        let content = doc.add_object(Stream::new(dictionary! {}, b"0 0 1 rg 10 10 50 20 re f".to_vec()));
        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content,
        });
        kids.push(Object::Reference(page));
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), 200.into(), 100.into()],
        }),
    );
    let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn session() -> SigningSession {
    SigningSession::new(PipelineConfig::default(), 640.0).unwrap()
}

#[test]
fn rejects_bad_viewport_and_config() {
    assert!(SigningSession::new(PipelineConfig::default(), 0.0).is_err());
    let cfg = PipelineConfig {
        render_scale: -1.0,
        ..PipelineConfig::default()
    };
    assert!(SigningSession::new(cfg, 640.0).is_err());
}

#[tokio::test]
async fn finalize_without_document_is_a_validation_error() {
    let mut s = session();
    let err = s
        .finalize(&FontRegistry::default(), &AbortSignal::never())
        .await
        .unwrap_err();
    assert!(matches!(err, DocsealError::Validation(_)));
}

#[tokio::test]
async fn load_sync_click_and_finalize() {
    let mut s = session();
    let desc = DocumentDescriptor::file(FileBlob::from_bytes(small_pdf(2)));
    let report = s.load_document(&desc, &AbortSignal::never()).await.unwrap();
    assert!(!report.skipped);
    assert_eq!(report.slides.len(), 2);
    assert_eq!(report.slides[0].width, 640.0);
    assert_eq!(report.slides[0].height, 320.0);

    let mine = s
        .model_mut()
        .add(SignatureField::new(1, 0.5, 0.5, OWNER))
        .unwrap()
        .id
        .clone();
    let theirs = s
        .model_mut()
        .add(SignatureField::new(0, 0.5, 0.5, "other@example.com"))
        .unwrap()
        .id
        .clone();

    let outcome = s.sync_overlays(Some(OWNER)).await;
    assert!(matches!(outcome, SyncOutcome::Synced(_)));
    assert_eq!(s.layer().len(), 2);

    let mut clicked = None;
    assert!(s.click_overlay(&mine, |f| clicked = Some(f.id.clone())));
    assert_eq!(clicked.as_deref(), Some(mine.as_str()));
    assert!(!s.click_overlay(&theirs, |_| panic!("not ours")));

    s.model_mut()
        .fill(&mine, FieldContent::text("Owner", None))
        .unwrap();

    let fonts = FontRegistry::new("Sans").with_font("Sans", FONT_PATH);
    let out = s.finalize(&fonts, &AbortSignal::never()).await.unwrap();
    assert_eq!(out.embedded_count(), 1);
    assert!(out.pdf.starts_with(b"%PDF-"));

    let left: Vec<&str> = s.model().list().iter().map(|f| f.id.as_str()).collect();
    assert_eq!(left, vec![theirs.as_str()]);
}

#[tokio::test]
async fn reloading_the_same_document_is_a_no_op() {
    let mut s = session();
    let desc = DocumentDescriptor::file(FileBlob::from_bytes(small_pdf(1)));
    s.load_document(&desc, &AbortSignal::never()).await.unwrap();
    let generation = s.mount().generation();
    let again = s.load_document(&desc, &AbortSignal::never()).await.unwrap();
    assert!(again.skipped);
    assert_eq!(s.mount().generation(), generation);
}

#[tokio::test]
async fn resize_then_resync_rescales_overlays() {
    let mut s = session();
    let desc = DocumentDescriptor::file(FileBlob::from_bytes(small_pdf(1)));
    s.load_document(&desc, &AbortSignal::never()).await.unwrap();
    let id = s
        .model_mut()
        .add(SignatureField::new(0, 0.5, 0.5, OWNER))
        .unwrap()
        .id
        .clone();
    s.sync_overlays(Some(OWNER)).await;
    let before = s.layer().get(&id).unwrap().rect;

    s.set_viewport_width(320.0).unwrap();
    s.sync_overlays(Some(OWNER)).await;
    let after = s.layer().get(&id).unwrap().rect;
    assert_eq!(after.width(), before.width() / 2.0);
    assert!(s.hover_overlay(&id, true));
}
