//! Page-by-page watermark compositing using lopdf
//!
//! Takes a source document and the one-page overlay produced by the overlay
//! module, draws the overlay on top of every source page, optionally
//! encrypts the result, and writes a new file. The source file is never
//! modified.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use lopdf::encryption::{EncryptionState, EncryptionVersion, Permissions};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::pdf::overlay::{build_overlay, WatermarkConfig};

/// Watermark a PDF file and write the result to a new file
///
/// Runs the whole pipeline: validate the config, load the source, generate
/// the overlay, composite it onto every page, optionally encrypt with
/// `password` (applied as both owner and user password), and write the
/// output. The output is serialized fully in memory before anything touches
/// the filesystem, so a failed run never leaves a truncated file behind.
///
/// # Example
///
/// ```no_run
/// use pdf_watermark::pdf::{apply_watermark, WatermarkConfig};
/// use std::path::Path;
///
/// let config = WatermarkConfig::new("CONFIDENTIAL", 0.2);
/// apply_watermark(
///     Path::new("input.pdf"),
///     Path::new("output.pdf"),
///     &config,
///     None,
/// ).expect("failed to watermark");
/// ```
pub fn apply_watermark(
    input: &Path,
    output: &Path,
    config: &WatermarkConfig,
    password: Option<&str>,
) -> Result<()> {
    config.validate()?;
    if let Some(pw) = password {
        if pw.is_empty() {
            return Err(Error::Validation(
                "password must not be empty when protection is requested".to_string(),
            ));
        }
    }
    if !input.exists() {
        return Err(Error::FileNotFound(input.to_path_buf()));
    }

    let mut doc = Document::load(input).map_err(|e| Error::Read {
        path: input.to_path_buf(),
        reason: e.to_string(),
    })?;

    let page_count = doc.get_pages().len();
    if page_count == 0 {
        return Err(Error::EmptyPdf(input.to_path_buf()));
    }
    debug!(pages = page_count, "source document loaded");

    let overlay = build_overlay(config)?;
    stamp_document(&mut doc, &overlay).map_err(|e| Error::Read {
        path: input.to_path_buf(),
        reason: e.to_string(),
    })?;

    doc.compress();

    if let Some(pw) = password {
        let id_seed = format!("{}|{}|{}", input.display(), config.text, page_count);
        encrypt_document(&mut doc, pw, &id_seed).map_err(|e| Error::Write {
            path: output.to_path_buf(),
            reason: format!("encryption failed: {}", e),
        })?;
    }

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).map_err(|e| Error::Write {
        path: output.to_path_buf(),
        reason: e.to_string(),
    })?;
    fs::write(output, &buffer).map_err(|e| Error::Write {
        path: output.to_path_buf(),
        reason: e.to_string(),
    })?;

    info!(
        output = %output.display(),
        pages = page_count,
        encrypted = password.is_some(),
        "watermarked document written"
    );
    Ok(())
}

/// Composite the overlay document's single page onto every page of `source`
///
/// Overlay content is appended after each page's existing content so the
/// watermark is drawn on top; page count and order are untouched. Errors
/// here mean the source page tree is structurally broken, so they surface
/// as raw lopdf errors for the caller to wrap with path context.
pub fn stamp_document(source: &mut Document, overlay: &Document) -> lopdf::Result<()> {
    let source_pages = source.get_pages();

    // Bring every overlay object into the source document's ID space
    let id_offset = source.max_id + 1;
    let mut id_map: HashMap<ObjectId, ObjectId> = HashMap::new();
    for (old_id, _) in overlay.objects.iter() {
        id_map.insert(*old_id, (old_id.0 + id_offset, old_id.1));
    }
    for (old_id, object) in overlay.objects.iter() {
        let new_object = renumber_object_references(object, &id_map);
        source.objects.insert(id_map[old_id], new_object);
    }
    source.max_id = overlay.max_id + id_offset;

    // The overlay has exactly one page; its content and resources get
    // shared by every source page
    let (overlay_content, overlay_resources) = overlay_page_parts(overlay, &id_map)?;

    for (_page_num, page_id) in source_pages {
        // Resolve Resources before mutating; they may live behind a reference
        let existing_resources = resolve_page_resources(source, page_id)?;
        let merged = merge_resources(existing_resources, &overlay_resources);

        let page_obj = source.get_object_mut(page_id)?;
        if let Object::Dictionary(ref mut page_dict) = page_obj {
            append_overlay_content(page_dict, &overlay_content);
            page_dict.set("Resources", Object::Dictionary(merged));
        }
    }

    Ok(())
}

/// Renumber all object references in an object
fn renumber_object_references(object: &Object, id_map: &HashMap<ObjectId, ObjectId>) -> Object {
    match object {
        Object::Reference(old_id) => match id_map.get(old_id) {
            Some(new_id) => Object::Reference(*new_id),
            None => Object::Reference(*old_id),
        },
        Object::Array(arr) => Object::Array(
            arr.iter()
                .map(|obj| renumber_object_references(obj, id_map))
                .collect(),
        ),
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                new_dict.set(key.clone(), renumber_object_references(value, id_map));
            }
            Object::Dictionary(new_dict)
        }
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                new_dict.set(key.clone(), renumber_object_references(value, id_map));
            }
            Object::Stream(lopdf::Stream {
                dict: new_dict,
                content: stream.content.clone(),
                allows_compression: stream.allows_compression,
                start_position: stream.start_position,
            })
        }
        _ => object.clone(),
    }
}

/// Content references and resources of the overlay's first page, with every
/// reference remapped into the destination document's ID space
fn overlay_page_parts(
    overlay: &Document,
    id_map: &HashMap<ObjectId, ObjectId>,
) -> lopdf::Result<(Vec<Object>, Dictionary)> {
    let pages = overlay.get_pages();
    let page_id = pages
        .values()
        .next()
        .copied()
        .ok_or(lopdf::Error::PageNumberNotFound(1))?;

    let page_dict = overlay.get_object(page_id)?.as_dict()?;

    let content_refs = match page_dict.get(b"Contents") {
        Ok(contents) => match renumber_object_references(contents, id_map) {
            Object::Array(arr) => arr,
            other => vec![other],
        },
        Err(_) => vec![],
    };

    let resources = match page_dict.get(b"Resources") {
        Ok(Object::Dictionary(dict)) => {
            match renumber_object_references(&Object::Dictionary(dict.clone()), id_map) {
                Object::Dictionary(d) => d,
                _ => Dictionary::new(),
            }
        }
        Ok(Object::Reference(res_id)) => {
            let resolved = overlay.get_object(*res_id)?.as_dict()?.clone();
            match renumber_object_references(&Object::Dictionary(resolved), id_map) {
                Object::Dictionary(d) => d,
                _ => Dictionary::new(),
            }
        }
        _ => Dictionary::new(),
    };

    Ok((content_refs, resources))
}

/// Resolve a page's Resources dictionary, following an indirect reference
/// if needed; missing resources come back as an empty dictionary
fn resolve_page_resources(doc: &Document, page_id: ObjectId) -> lopdf::Result<Dictionary> {
    let page_dict = doc.get_object(page_id)?.as_dict()?;

    match page_dict.get(b"Resources") {
        Ok(Object::Dictionary(dict)) => Ok(dict.clone()),
        Ok(Object::Reference(res_id)) => match doc.get_object(*res_id) {
            Ok(Object::Dictionary(dict)) => Ok(dict.clone()),
            _ => Ok(Dictionary::new()),
        },
        _ => Ok(Dictionary::new()),
    }
}

/// Merge overlay resources into a page's resources dictionary
///
/// Each resource category (Font, ExtGState, ...) merges entry-by-entry; on a
/// name collision within a category the overlay entry wins.
fn merge_resources(mut base: Dictionary, additions: &Dictionary) -> Dictionary {
    for (key, value) in additions.iter() {
        match (base.get(key).ok().cloned(), value) {
            (Some(Object::Dictionary(existing)), Object::Dictionary(added)) => {
                let mut merged = existing;
                for (sub_key, sub_value) in added.iter() {
                    merged.set(sub_key.clone(), sub_value.clone());
                }
                base.set(key.clone(), Object::Dictionary(merged));
            }
            _ => {
                base.set(key.clone(), value.clone());
            }
        }
    }
    base
}

/// Append overlay content streams to a page's Contents so the watermark is
/// drawn after (on top of) the page's own content
fn append_overlay_content(page_dict: &mut Dictionary, overlay_content: &[Object]) {
    let existing_content = page_dict.get(b"Contents").ok().cloned();

    match existing_content {
        Some(Object::Reference(content_id)) => {
            let mut new_content = vec![Object::Reference(content_id)];
            new_content.extend_from_slice(overlay_content);
            page_dict.set("Contents", Object::Array(new_content));
        }
        Some(Object::Array(mut content_array)) => {
            content_array.extend_from_slice(overlay_content);
            page_dict.set("Contents", Object::Array(content_array));
        }
        _ => {
            page_dict.set("Contents", Object::Array(overlay_content.to_vec()));
        }
    }
}

/// Encrypt the document with the standard security handler
///
/// A single password acts as both owner and user password, RC4 with a
/// 128-bit key. The handler derives its keys from the trailer file ID, which
/// lopdf does not create on its own, so one is generated from `id_seed`
/// when missing.
fn encrypt_document(doc: &mut Document, password: &str, id_seed: &str) -> lopdf::Result<()> {
    if doc.trailer.get(b"ID").is_err() {
        let digest = md5::compute(id_seed.as_bytes());
        let id = Object::String(digest.0.to_vec(), StringFormat::Literal);
        doc.trailer
            .set("ID", Object::Array(vec![id.clone(), id]));
    }

    let version = EncryptionVersion::V2 {
        document: doc,
        owner_password: password,
        user_password: password,
        key_length: 128,
        permissions: Permissions::all(),
    };
    let state = EncryptionState::try_from(version)?;
    doc.encrypt(&state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::overlay::WatermarkConfig;
    use lopdf::{dictionary, Stream};

    /// Build an in-memory document with `pages` simple text pages
    fn sample_document(pages: usize) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids = Vec::new();
        for i in 0..pages {
            let text = format!("BT /F1 24 Tf 72 700 Td (PAGE-{}) Tj ET", i + 1);
            let content_id = doc.add_object(Stream::new(dictionary! {}, text.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    #[test]
    fn test_stamp_preserves_page_count() {
        let mut doc = sample_document(3);
        let overlay = build_overlay(&WatermarkConfig::new("DRAFT", 0.3)).unwrap();

        stamp_document(&mut doc, &overlay).expect("stamping failed");
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn test_stamp_appends_content_to_each_page() {
        let mut doc = sample_document(2);
        let overlay = build_overlay(&WatermarkConfig::new("DRAFT", 0.3)).unwrap();

        stamp_document(&mut doc, &overlay).expect("stamping failed");

        for (_num, page_id) in doc.get_pages() {
            let page_dict = doc.get_object(page_id).unwrap().as_dict().unwrap();
            match page_dict.get(b"Contents").unwrap() {
                // Original stream first, overlay stream appended after it
                Object::Array(arr) => assert_eq!(arr.len(), 2),
                other => panic!("expected Contents array, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_stamp_merges_overlay_resources() {
        let mut doc = sample_document(1);
        let overlay = build_overlay(&WatermarkConfig::new("DRAFT", 0.3)).unwrap();

        stamp_document(&mut doc, &overlay).expect("stamping failed");

        let (_num, page_id) = doc.get_pages().into_iter().next().unwrap();
        let page_dict = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let resources = page_dict.get(b"Resources").unwrap().as_dict().unwrap();

        // Original font survives and the overlay's opacity state arrives
        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.get(b"F1").is_ok());
        let ext_g_state = resources.get(b"ExtGState").unwrap().as_dict().unwrap();
        assert!(ext_g_state.get(b"GS1").is_ok());
    }

    #[test]
    fn test_merge_resources_keeps_both_categories() {
        let base = dictionary! {
            "Font" => dictionary! { "F9" => Object::Null },
        };
        let additions = dictionary! {
            "Font" => dictionary! { "F1" => Object::Null },
            "ExtGState" => dictionary! { "GS1" => Object::Null },
        };

        let merged = merge_resources(base, &additions);
        let fonts = merged.get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.get(b"F9").is_ok());
        assert!(fonts.get(b"F1").is_ok());
        assert!(merged.get(b"ExtGState").is_ok());
    }
}
