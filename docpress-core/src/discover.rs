//! Input discovery: which drafts a batch will process, and which exemplar
//! conditions the generation style.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::contract::{DocumentReader, SourceDocument, StyleTemplate};
use crate::error::ConfigurationError;

/// Used when the template folder holds no usable exemplar.
pub const DEFAULT_STYLE: &str = "\
A personal technical blog. Posts open with a short hook paragraph, use \
second-level headings to break up sections, keep paragraphs short, and \
favour concrete examples and code over abstract description. The tone is \
conversational but precise. Posts end with a brief summary of the key \
takeaways.";

const TEMPLATE_TEXT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// Lists the `.docx` drafts in `drafts_folder`, sorted by file name.
///
/// Word lock files (`~$draft.docx`), LibreOffice lock files (`.~lock…`) and
/// other hidden files are skipped.
pub fn discover_drafts(drafts_folder: &Path) -> Result<Vec<SourceDocument>, ConfigurationError> {
    if !drafts_folder.is_dir() {
        return Err(ConfigurationError::MissingDraftsFolder(
            drafts_folder.to_path_buf(),
        ));
    }
    let entries = std::fs::read_dir(drafts_folder).map_err(|source| {
        ConfigurationError::UnreadableDraftsFolder {
            path: drafts_folder.to_path_buf(),
            source,
        }
    })?;

    let mut drafts: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_draft(path))
        .collect();
    drafts.sort();

    info!(
        folder = %drafts_folder.display(),
        count = drafts.len(),
        "[DISCOVER] Found drafts"
    );
    Ok(drafts.into_iter().map(SourceDocument::new).collect())
}

/// A `.docx` that is not a lock or hidden file.
pub fn is_draft(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with("~$") || name.starts_with('.') {
        debug!(file = name, "[DISCOVER] Skipping temporary file");
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("docx"))
        .unwrap_or(false)
}

/// Loads the style exemplar from `template_folder`.
///
/// The first file by name with a text extension (`md`, `markdown`, `txt`) or
/// a `.docx` is used; `.docx` exemplars are read through `reader`. Falls back
/// to [`DEFAULT_STYLE`] when nothing usable is found.
pub fn load_style_template<R>(template_folder: &Path, reader: &R) -> StyleTemplate
where
    R: DocumentReader + ?Sized,
{
    let entries = match std::fs::read_dir(template_folder) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(folder = %template_folder.display(), error = ?e, "[TEMPLATE] Template folder unreadable, using default style");
            return StyleTemplate::new(DEFAULT_STYLE, None);
        }
    };
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && (is_text_template(path) || is_draft(path)))
        .collect();
    candidates.sort();

    for path in candidates {
        let content = if is_text_template(&path) {
            match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %path.display(), error = ?e, "[TEMPLATE] Failed to read template file");
                    continue;
                }
            }
        } else {
            let extracted = reader.read(&path);
            if extracted.extraction_error.is_some() {
                warn!(path = %path.display(), "[TEMPLATE] Failed to extract template document");
                continue;
            }
            extracted.body
        };
        if content.trim().is_empty() {
            continue;
        }
        info!(path = %path.display(), chars = content.chars().count(), "[TEMPLATE] Loaded style template");
        return StyleTemplate::new(content, Some(path));
    }

    warn!(folder = %template_folder.display(), "[TEMPLATE] No template found, using default style");
    StyleTemplate::new(DEFAULT_STYLE, None)
}

fn is_text_template(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            TEMPLATE_TEXT_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
