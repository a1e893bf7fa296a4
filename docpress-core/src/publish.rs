//! Publication Writer: puts `<slug>.md` in the staging folder and in the
//! site content folder.
//!
//! Staging is written first. Each file is written to a temp file next to its
//! destination and persisted over it, so a reader never sees half a post.
//! The two writes are not transactional: if the site write fails, the staging
//! copy stays and is reported in [`PublishError::written`].

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{error, info, warn};

use crate::contract::PublishedPost;
use crate::error::{OutputTarget, PublishError};
use crate::metadata::source_marker;

/// Where a post was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub staging_path: PathBuf,
    pub site_path: PathBuf,
    /// The site already had a different post at this slug, from another
    /// draft, which was overwritten.
    pub replaced_different: bool,
}

pub fn write_publication(
    post: &PublishedPost,
    staging_dir: &Path,
    site_content_dir: &Path,
) -> Result<Publication, PublishError> {
    let file_name = post.file_name();
    let staging_path = staging_dir.join(&file_name);
    let site_path = site_content_dir.join(&file_name);

    write_atomic(&staging_path, &post.body).map_err(|source| {
        error!(path = %staging_path.display(), error = ?source, "[PUBLISH] Staging write failed");
        PublishError {
            target: OutputTarget::Staging,
            path: staging_path.clone(),
            written: Vec::new(),
            source,
        }
    })?;
    info!(path = %staging_path.display(), "[PUBLISH] Wrote staging copy");

    let replaced_different = match std::fs::read_to_string(&site_path) {
        Ok(existing) => existing != post.body && !same_source(&existing, post),
        Err(_) => false,
    };
    if replaced_different {
        warn!(
            slug = %post.slug,
            path = %site_path.display(),
            source = %post.source.display(),
            "[PUBLISH] Slug collision: overwriting a different post at this path"
        );
    }

    write_atomic(&site_path, &post.body).map_err(|source| {
        error!(
            path = %site_path.display(),
            staging = %staging_path.display(),
            error = ?source,
            "[PUBLISH] Site write failed; staging copy was already written"
        );
        PublishError {
            target: OutputTarget::Site,
            path: site_path.clone(),
            written: vec![staging_path.clone()],
            source,
        }
    })?;
    info!(path = %site_path.display(), "[PUBLISH] Wrote site post");

    Ok(Publication {
        staging_path,
        site_path,
        replaced_different,
    })
}

/// The post already on the site was published from the same draft, so a new
/// rewrite of it is an update rather than a collision.
fn same_source(existing: &str, post: &PublishedPost) -> bool {
    let Some(previous) = source_marker(existing) else {
        return false;
    };
    post.source
        .file_name()
        .map(|name| name.to_string_lossy() == previous)
        .unwrap_or(false)
}

fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
