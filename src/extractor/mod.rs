// Extractor module
// Turns the inputs accepted by the indexer into plain text


use std::fmt;
use std::path::{Path, PathBuf};

use lopdf::Document;
use tracing::{debug, info, warn};

use crate::{IndexError, Result};

/// Something the indexer can turn into text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSource {
    /// A PDF file whose text layer is extracted page by page
    Pdf(PathBuf),
    /// Text supplied directly by the caller
    Literal(String),
}

impl TextSource {
    /// Produce the text for this source, reading the PDF if needed
    #[inline]
    pub fn read_text(&self) -> Result<String> {
        match self {
            Self::Pdf(path) => extract_pdf_text(path),
            Self::Literal(text) => Ok(text.clone()),
        }
    }
}

impl fmt::Display for TextSource {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf(path) => write!(f, "{}", path.display()),
            Self::Literal(text) => {
                let preview: String = text.chars().take(40).collect();
                if preview.len() < text.len() {
                    write!(f, "\"{}...\"", preview)
                } else {
                    write!(f, "\"{}\"", preview)
                }
            }
        }
    }
}

/// Extract the text layer of a PDF, pages joined by newlines.
///
/// Pages whose content cannot be decoded are skipped with a warning. A file
/// that cannot be parsed, has no pages, or where no page decodes fails with
/// [`IndexError::Extraction`]. A PDF without a text layer yields an empty
/// string.
#[inline]
pub fn extract_pdf_text(path: &Path) -> Result<String> {
    debug!("Loading PDF {}", path.display());

    if !path.is_file() {
        return Err(IndexError::Extraction(format!(
            "{} does not exist or is not a file",
            path.display()
        )));
    }

    let document = Document::load(path).map_err(|e| {
        IndexError::Extraction(format!("Failed to parse PDF {}: {}", path.display(), e))
    })?;

    extract_document_text(&document, &path.display().to_string())
}

fn extract_document_text(document: &Document, name: &str) -> Result<String> {
    let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
    if page_numbers.is_empty() {
        return Err(IndexError::Extraction(format!("{} has no pages", name)));
    }

    let mut pages = Vec::with_capacity(page_numbers.len());
    let mut failed = 0_usize;

    for page in &page_numbers {
        match document.extract_text(&[*page]) {
            Ok(text) => pages.push(text),
            Err(e) => {
                warn!("Skipping page {} of {}: {}", page, name, e);
                failed += 1;
            }
        }
    }

    if failed == page_numbers.len() {
        return Err(IndexError::Extraction(format!(
            "No page of {} could be decoded",
            name
        )));
    }

    let text = pages.join("\n");
    if text.trim().is_empty() {
        warn!("{} has no extractable text layer", name);
    }

    info!(
        "Extracted {} characters from {} of {} pages of {}",
        text.len(),
        page_numbers.len() - failed,
        page_numbers.len(),
        name
    );

    Ok(text)
}
