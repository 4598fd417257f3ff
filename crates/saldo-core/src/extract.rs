//! PDF text extraction
//!
//! Yields one string per page, in page order. Pages without a text layer come
//! back as empty strings; the parser skips them.

use std::path::Path;

use lopdf::Document;
use tracing::debug;

use crate::error::{Error, Result};

/// Extract per-page text from PDF bytes
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>> {
    let doc = Document::load_mem(bytes)?;
    pages_of(&doc)
}

/// Extract per-page text from a PDF file
pub fn extract_pages_from_path(path: &Path) -> Result<Vec<String>> {
    let doc = Document::load(path)
        .map_err(|e| Error::Pdf(format!("{}: {}", path.display(), e)))?;
    pages_of(&doc)
}

fn pages_of(doc: &Document) -> Result<Vec<String>> {
    if doc.is_encrypted() {
        return Err(Error::Pdf("encrypted PDFs are not supported".into()));
    }

    // get_pages is a BTreeMap keyed by page number, so iteration is in order
    let mut pages = Vec::new();
    for (page_num, _page_id) in doc.get_pages() {
        let text = match doc.extract_text(&[page_num]) {
            Ok(text) => text,
            Err(e) => {
                debug!(page = page_num, error = %e, "No extractable text on page");
                String::new()
            }
        };
        pages.push(text);
    }

    debug!(pages = pages.len(), "Extracted statement text");
    Ok(pages)
}
