//! Document Reader: text and sibling images out of a `.docx` draft.
//!
//! Only the main document part (`word/document.xml`) is read. Styling is
//! ignored; paragraphs become plain text blocks and tables are serialized
//! between `[TABLE CONTENT]` / `[/TABLE]` markers so the transformer can spot
//! tabular data in otherwise flat text.
//!
//! Images are not pulled out of the container. Authors drop them next to the
//! draft, and every image file in the draft's folder is taken as belonging to
//! it.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, error, info, warn};

use crate::contract::{DocumentReader, ExtractedDocument};
use crate::error::ExtractionError;

pub const TABLE_START: &str = "[TABLE CONTENT]";
pub const TABLE_END: &str = "[/TABLE]";
pub const EMPTY_PLACEHOLDER: &str = "Could not extract content.";

/// Extensions treated as images when scanning a draft's folder.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp"];

const DOCUMENT_PART: &str = "word/document.xml";

/// Reads Word `.docx` containers.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxReader;

impl DocxReader {
    pub fn new() -> Self {
        Self
    }

    /// Extract the body text of a `.docx`, failing if the container or its
    /// XML cannot be read.
    pub fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let file = File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        let mut xml = String::new();
        archive.by_name(DOCUMENT_PART)?.read_to_string(&mut xml)?;
        let blocks = parse_body(&xml)?;
        debug!(path = %path.display(), blocks = blocks.len(), "[EXTRACT] Parsed document body");
        Ok(blocks.join("\n\n"))
    }
}

impl DocumentReader for DocxReader {
    fn read(&self, path: &Path) -> ExtractedDocument {
        let images = discover_images(path);
        match self.extract_text(path) {
            Ok(body) if body.trim().is_empty() => {
                warn!(path = %path.display(), "[EXTRACT] Document contained no text");
                ExtractedDocument {
                    body: EMPTY_PLACEHOLDER.to_string(),
                    images,
                    extraction_error: Some("document contained no text".to_string()),
                }
            }
            Ok(body) => {
                info!(
                    path = %path.display(),
                    chars = body.chars().count(),
                    images = images.len(),
                    "[EXTRACT] Extracted document"
                );
                ExtractedDocument {
                    body,
                    images,
                    extraction_error: None,
                }
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "[EXTRACT] Failed to extract document, continuing with placeholder");
                ExtractedDocument {
                    body: format!("Error extracting content: {e}"),
                    images: Vec::new(),
                    extraction_error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Image files in the same folder as `document`, sorted by file name.
pub fn discover_images(document: &Path) -> Vec<PathBuf> {
    let dir = match document.parent() {
        Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = ?e, "[EXTRACT] Could not list draft folder for images");
            return Vec::new();
        }
    };
    let mut images: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_image(p))
        .collect();
    images.sort();
    images
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Walks `w:body` and returns one string per non-empty paragraph or table.
///
/// Paragraphs can nest inside a paragraph through text boxes
/// (`w:txbxContent`); the inner one is emitted as its own block and the outer
/// keeps collecting. `mc:Fallback` repeats the `mc:Choice` content and is
/// skipped.
fn parse_body(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut blocks = Vec::new();
    // Nesting depth of w:tbl; paragraphs inside a table belong to a cell.
    let mut table_depth = 0usize;
    // Open paragraphs, innermost last.
    let mut paragraphs: Vec<String> = Vec::new();
    let mut fallback_depth = 0usize;
    let mut in_text = false;
    let mut cell = String::new();
    let mut row: Vec<String> = Vec::new();
    let mut rows: Vec<String> = Vec::new();

    loop {
        let event = reader.read_event()?;
        if fallback_depth > 0 {
            match &event {
                Event::Start(e) if e.name().as_ref() == b"mc:Fallback" => fallback_depth += 1,
                Event::End(e) if e.name().as_ref() == b"mc:Fallback" => fallback_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }
        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"mc:Fallback" => fallback_depth = 1,
                b"w:tbl" => {
                    table_depth += 1;
                    if table_depth == 1 {
                        rows.clear();
                    }
                }
                b"w:tr" if table_depth == 1 => row.clear(),
                b"w:tc" if table_depth == 1 => cell.clear(),
                b"w:p" => paragraphs.push(String::new()),
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => {
                if let Some(paragraph) = paragraphs.last_mut() {
                    match e.name().as_ref() {
                        b"w:tab" => paragraph.push('\t'),
                        b"w:br" | b"w:cr" => paragraph.push('\n'),
                        _ => {}
                    }
                }
            }
            Event::Text(t) if in_text => {
                if let Some(paragraph) = paragraphs.last_mut() {
                    paragraph.push_str(&t.unescape()?);
                }
            }
            Event::CData(t) if in_text => {
                if let Some(paragraph) = paragraphs.last_mut() {
                    paragraph.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    let Some(paragraph) = paragraphs.pop() else {
                        continue;
                    };
                    let text = paragraph.trim();
                    if !text.is_empty() {
                        if table_depth == 0 {
                            blocks.push(text.to_string());
                        } else {
                            if !cell.is_empty() {
                                cell.push(' ');
                            }
                            cell.push_str(text);
                        }
                    }
                }
                b"w:tc" if table_depth == 1 => row.push(cell.trim().replace('\n', " ")),
                b"w:tr" if table_depth == 1 => rows.push(row.join(" | ")),
                b"w:tbl" => {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0 && !rows.is_empty() {
                        let mut block = String::from(TABLE_START);
                        for r in &rows {
                            block.push('\n');
                            block.push_str(r);
                        }
                        block.push('\n');
                        block.push_str(TABLE_END);
                        blocks.push(block);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(blocks)
}
