//! Low-level page surgery on a loaded `lopdf` document.

use lopdf::{
    Dictionary, Document, Object, ObjectId, Stream,
    content::{Content, Operation},
    dictionary,
};

use crate::{
    foundation::core::Rect,
    foundation::error::{DocsealError, DocsealResult},
    render::pdf::{DEFAULT_PAGE_BOX, inherited, page_box},
};

/// A page addressed by slide index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PageTarget {
    pub id: ObjectId,
    pub media: Rect,
}

/// Page for zero-based `slide_index`.
pub(crate) fn page_target(doc: &Document, slide_index: usize) -> DocsealResult<PageTarget> {
    let number = u32::try_from(slide_index + 1)
        .map_err(|_| DocsealError::embed(format!("slide index {slide_index} out of range")))?;
    let id = doc.get_pages().get(&number).copied().ok_or_else(|| {
        DocsealError::embed(format!("document has no page for slide {slide_index}"))
    })?;
    Ok(PageTarget {
        id,
        media: page_box(doc, id).unwrap_or(DEFAULT_PAGE_BOX),
    })
}

/// Register `target` in the page's `category` resource dictionary (`XObject`, `Font`, ...) and
/// return its name. An object already listed there keeps its existing name.
pub(crate) fn register_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    prefix: &str,
    target: ObjectId,
) -> DocsealResult<String> {
    let mut resources = own_resources(doc, page_id)?;
    let mut sub = own_subdict(doc, &resources, category);

    let registered = sub.iter().find_map(|(key, value)| match value {
        Object::Reference(id) if *id == target => Some(String::from_utf8_lossy(key).into_owned()),
        _ => None,
    });
    if let Some(name) = registered {
        return Ok(name);
    }

    let mut n = 1usize;
    let name = loop {
        let candidate = format!("{prefix}{n}");
        if !sub.has(candidate.as_bytes()) {
            break candidate;
        }
        n += 1;
    };

    sub.set(name.as_bytes().to_vec(), Object::Reference(target));
    resources.set(category, Object::Dictionary(sub));
    page_dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(resources));
    Ok(name)
}

/// Append drawing operations to a page, isolated from the page's own graphics state.
///
/// The existing content is wrapped in `q ... Q` so an unbalanced transform in the original
/// stream cannot displace the new marks.
pub(crate) fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    operations: Vec<Operation>,
) -> DocsealResult<()> {
    let mut body = b"\nQ\n".to_vec();
    body.extend(
        Content { operations }
            .encode()
            .map_err(|e| DocsealError::embed(format!("encode content stream: {e}")))?,
    );

    let existing: Vec<Object> = match page_dict(doc, page_id)?.get(b"Contents").ok() {
        Some(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Some(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    let open_id = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
    let body_id = doc.add_object(Stream::new(dictionary! {}, body));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing);
    contents.push(Object::Reference(body_id));
    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}

fn page_dict(doc: &Document, page_id: ObjectId) -> DocsealResult<&Dictionary> {
    doc.get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| DocsealError::embed(format!("page object is not a dictionary: {e}")))
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> DocsealResult<&mut Dictionary> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| DocsealError::embed(format!("page object is not a dictionary: {e}")))
}

/// The page's effective resources as an owned dictionary (inherited or referenced ones copied).
fn own_resources(doc: &Document, page_id: ObjectId) -> DocsealResult<Dictionary> {
    page_dict(doc, page_id)?;
    Ok(inherited(doc, page_id, b"Resources")
        .and_then(|o| o.as_dict().ok())
        .cloned()
        .unwrap_or_default())
}

fn own_subdict(doc: &Document, resources: &Dictionary, category: &str) -> Dictionary {
    match resources.get(category.as_bytes()) {
        Ok(Object::Dictionary(d)) => d.clone(),
        Ok(Object::Reference(id)) => doc
            .get_object(*id)
            .and_then(Object::as_dict)
            .cloned()
            .unwrap_or_default(),
        _ => Dictionary::new(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/finalize/pdf_edit.rs"]
mod tests;
