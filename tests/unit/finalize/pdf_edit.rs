use super::*;
use lopdf::Stream;

fn two_pages_with_shared_resources() -> (Document, ObjectId) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let img_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
    let shared = doc.add_object(dictionary! {
        "XObject" => dictionary! { "Img1" => img_id },
    });
    let content = doc.add_object(Stream::new(dictionary! {}, b"0 0 10 10 re f".to_vec()));
    let mut kids = Vec::new();
    for _ in 0..2 {
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
            "Count" => 2,
            "Resources" => shared,
            "MediaBox" => vec![0.into(), 0.into(), 300.into(), 400.into()],
        }),
    );
    let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog);
    (doc, img_id)
}

fn xobject_names(doc: &Document, page: ObjectId) -> Vec<String> {
    let res = inherited(doc, page, b"Resources")
        .and_then(|o| o.as_dict().ok())
        .unwrap();
    let xo = match res.get(b"XObject").unwrap() {
        Object::Dictionary(d) => d,
        Object::Reference(id) => doc.get_object(*id).unwrap().as_dict().unwrap(),
        other => panic!("unexpected {other:?}"),
    };
    xo.iter()
        .map(|(k, _)| String::from_utf8_lossy(k).into_owned())
        .collect()
}

#[test]
fn page_target_uses_inherited_media_box() {
    let (doc, _) = two_pages_with_shared_resources();
    let t = page_target(&doc, 1).unwrap();
    assert_eq!(t.media, Rect::new(0.0, 0.0, 300.0, 400.0));
    assert_eq!(Some(&t.id), doc.get_pages().get(&2));
}

#[test]
fn page_target_rejects_missing_page() {
    let (doc, _) = two_pages_with_shared_resources();
    let err = page_target(&doc, 2).unwrap_err();
    assert!(matches!(err, DocsealError::Embed(_)));
}

#[test]
fn register_resource_keeps_inherited_entries_and_picks_fresh_name() {
    let (mut doc, img_id) = two_pages_with_shared_resources();
    let first = page_target(&doc, 0).unwrap().id;
    let second = page_target(&doc, 1).unwrap().id;

    let other = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
    let name = register_resource(&mut doc, first, "XObject", "Img", other).unwrap();
    assert_eq!(name, "Img2");
    assert_eq!(
        register_resource(&mut doc, first, "XObject", "Img", img_id).unwrap(),
        "Img1"
    );
    let mut names = xobject_names(&doc, first);
    names.sort();
    assert_eq!(names, vec!["Img1", "Img2"]);

    // The sibling page still sees only the shared dictionary.
    assert_eq!(xobject_names(&doc, second), vec!["Img1"]);
}

#[test]
fn register_resource_creates_missing_category() {
    let (mut doc, _) = two_pages_with_shared_resources();
    let page = page_target(&doc, 0).unwrap().id;
    let font = doc.add_object(dictionary! { "Type" => "Font" });
    let bold = doc.add_object(dictionary! { "Type" => "Font" });
    assert_eq!(
        register_resource(&mut doc, page, "Font", "DsF", font).unwrap(),
        "DsF1"
    );
    assert_eq!(
        register_resource(&mut doc, page, "Font", "DsF", bold).unwrap(),
        "DsF2"
    );
}

#[test]
fn registering_the_same_object_twice_reuses_its_name() {
    let (mut doc, _) = two_pages_with_shared_resources();
    let page = page_target(&doc, 0).unwrap().id;
    let font = doc.add_object(dictionary! { "Type" => "Font" });
    for _ in 0..3 {
        assert_eq!(
            register_resource(&mut doc, page, "Font", "DsF", font).unwrap(),
            "DsF1"
        );
    }
    let resources = doc
        .get_object(page)
        .unwrap()
        .as_dict()
        .unwrap()
        .get(b"Resources")
        .unwrap()
        .as_dict()
        .unwrap();
    assert_eq!(resources.get(b"Font").unwrap().as_dict().unwrap().len(), 1);
}

#[test]
fn append_content_isolates_existing_stream() {
    let (mut doc, _) = two_pages_with_shared_resources();
    let page = page_target(&doc, 0).unwrap().id;
    append_content(
        &mut doc,
        page,
        vec![Operation::new("re", vec![1.into(), 2.into(), 3.into(), 4.into()])],
    )
    .unwrap();

    let content = doc.get_page_content(page).unwrap();
    let text = String::from_utf8_lossy(&content);
    assert!(text.starts_with("q\n"), "{text}");
    let existing = text.find("0 0 10 10 re f").unwrap();
    let restore = text.find("\nQ\n").unwrap();
    assert!(existing < restore);
    assert!(text[restore..].contains("1 2 3 4 re"));

    let ops = Content::decode(&content).unwrap().operations;
    assert_eq!(ops.first().unwrap().operator, "q");
    assert_eq!(ops.last().unwrap().operator, "re");
}
