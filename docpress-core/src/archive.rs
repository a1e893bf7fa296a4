//! Archival Manager: marks a draft as processed by renaming it in place.
//!
//! `drafts/post.docx` becomes `drafts/post.published`, which discovery no
//! longer picks up. An earlier archive of the same name is never replaced:
//! the next free `post.<n>.published` is used instead.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::error::ArchivalError;

/// Where `source` goes once archived with `extension`.
pub fn archived_path(source: &Path, extension: &str) -> PathBuf {
    source.with_extension(extension)
}

/// `archived_path`, or `<stem>.<n>.<extension>` with the lowest `n` that is
/// not taken yet.
pub fn free_archive_path(source: &Path, extension: &str) -> PathBuf {
    let preferred = archived_path(source, extension);
    if !preferred.exists() {
        return preferred;
    }
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut n = 1u32;
    loop {
        let candidate = source.with_file_name(format!("{stem}.{n}.{extension}"));
        if !candidate.exists() {
            debug!(
                taken = %preferred.display(),
                target = %candidate.display(),
                "[ARCHIVE] Archive name taken, using numbered name"
            );
            return candidate;
        }
        n += 1;
    }
}

/// Rename `source` to a free archived name. Must only be called after the
/// post was published.
pub fn archive_source(source: &Path, extension: &str) -> Result<PathBuf, ArchivalError> {
    let target = free_archive_path(source, extension);
    match std::fs::rename(source, &target) {
        Ok(()) => {
            info!(from = %source.display(), to = %target.display(), "[ARCHIVE] Draft archived");
            Ok(target)
        }
        Err(e) => {
            error!(
                from = %source.display(),
                to = %target.display(),
                error = ?e,
                "[ARCHIVE] Failed to archive published draft; it will be picked up again next run"
            );
            Err(ArchivalError {
                from: source.to_path_buf(),
                to: target,
                source: e,
            })
        }
    }
}
