//! PDF metadata extraction

use lopdf::{Document, Object};
use std::path::Path;

use crate::error::{Error, Result};

/// Basic facts about a PDF file
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
    /// Whether the document carries an encryption dictionary
    pub encrypted: bool,
}

/// Count pages by reading the Count field from the Pages dictionary.
/// This is more reliable than get_pages() for nested page trees.
fn count_pages_from_catalog(doc: &Document, path: &Path) -> Result<usize> {
    let structural = |what: &str| Error::Read {
        path: path.to_path_buf(),
        reason: what.to_string(),
    };

    let catalog_id = match doc.trailer.get(b"Root") {
        Ok(Object::Reference(id)) => *id,
        _ => return Err(structural("no Root reference in trailer")),
    };

    let catalog = doc
        .get_object(catalog_id)
        .ok()
        .and_then(|obj| obj.as_dict().ok())
        .ok_or_else(|| structural("catalog is not a dictionary"))?;

    let pages_id = match catalog.get(b"Pages") {
        Ok(Object::Reference(id)) => *id,
        _ => return Err(structural("no Pages reference in catalog")),
    };

    let pages = doc
        .get_object(pages_id)
        .ok()
        .and_then(|obj| obj.as_dict().ok())
        .ok_or_else(|| structural("Pages is not a dictionary"))?;

    match pages.get(b"Count") {
        Ok(Object::Integer(n)) => Ok(*n as usize),
        _ => Err(structural("no Count in Pages dictionary")),
    }
}

/// Read a text entry from the Info dictionary
fn info_string(info: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    let value = info.get(key).ok()?;
    let bytes = value.as_str().ok()?;
    String::from_utf8(bytes.to_vec()).ok()
}

/// Extract metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let page_count = count_pages_from_catalog(&doc, path)?;
    if page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    let encrypted = doc.trailer.get(b"Encrypt").is_ok();

    let mut title = None;
    let mut author = None;
    if let Ok(Object::Reference(info_id)) = doc.trailer.get(b"Info") {
        if let Ok(Object::Dictionary(info_dict)) = doc.get_object(*info_id) {
            title = info_string(info_dict, b"Title");
            author = info_string(info_dict, b"Author");
        }
    }

    Ok(PdfMetadata {
        page_count,
        title,
        author,
        encrypted,
    })
}

/// Count the number of pages in a PDF file
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let page_count = count_pages_from_catalog(&doc, path)?;
    if page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    Ok(page_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_pages_nonexistent_file() {
        let result = count_pages(Path::new("nonexistent.pdf"));
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_extract_metadata_nonexistent_file() {
        let result = extract_metadata(Path::new("nonexistent.pdf"));
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    // Metadata extraction against real documents is covered in tests/
}
