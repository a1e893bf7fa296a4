//! Image Relocator: copies a draft's images into the site's static folder,
//! partitioned by publish year and month, and points the post at them.
//!
//! Copies overwrite, so relocating the same draft twice is safe. An image
//! that cannot be copied is skipped and its references are left as they were.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use regex::{Captures, Regex};
use tracing::{debug, info, warn};

use crate::contract::ImageAsset;
use crate::error::ImageCopyError;

/// Placeholder directory the transformer is told to use for images.
pub const PLACEHOLDER_DIR: &str = "images/";

#[derive(Debug)]
pub struct Relocation {
    pub body: String,
    pub copied: Vec<ImageAsset>,
    pub skipped: Vec<ImageCopyError>,
}

/// `<YYYY>/<MM>` for `date`.
pub fn date_partition(date: NaiveDate) -> PathBuf {
    PathBuf::from(format!("{:04}", date.year())).join(format!("{:02}", date.month()))
}

/// Where `source` goes under `static_root` for a post published on `date`.
pub fn plan_asset(source: &Path, static_root: &Path, url_prefix: &str, date: NaiveDate) -> ImageAsset {
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let target_relative = date_partition(date).join(&file_name);
    let target_absolute = static_root.join(&target_relative);
    let url = format!(
        "{}/{:04}/{:02}/{}",
        url_prefix.trim_end_matches('/'),
        date.year(),
        date.month(),
        file_name
    );
    ImageAsset {
        source: source.to_path_buf(),
        file_name,
        target_relative,
        target_absolute,
        url,
    }
}

/// Copy `images` under `static_root` and rewrite `images/<file>` references
/// in `body` to their public URL.
pub fn relocate_images(
    body: &str,
    images: &[PathBuf],
    static_root: &Path,
    url_prefix: &str,
    publish_date: NaiveDate,
) -> Relocation {
    if images.is_empty() {
        return Relocation {
            body: body.to_string(),
            copied: Vec::new(),
            skipped: Vec::new(),
        };
    }

    let mut rewritten = body.to_string();
    let mut copied = Vec::new();
    let mut skipped = Vec::new();

    for source in images {
        let asset = plan_asset(source, static_root, url_prefix, publish_date);
        match copy_asset(&asset) {
            Ok(()) => {
                let (body, references) = rewrite_references(&rewritten, &asset.file_name, &asset.url);
                rewritten = body;
                debug!(
                    image = %asset.file_name,
                    references,
                    target = %asset.target_absolute.display(),
                    "[IMAGES] Relocated image"
                );
                copied.push(asset);
            }
            Err(e) => {
                warn!(image = %source.display(), error = %e, "[IMAGES] Skipping image");
                skipped.push(e);
            }
        }
    }

    info!(
        copied = copied.len(),
        skipped = skipped.len(),
        partition = %date_partition(publish_date).display(),
        "[IMAGES] Relocation finished"
    );
    Relocation {
        body: rewritten,
        copied,
        skipped,
    }
}

/// Replaces every `images/<file_name>` reference in `body` with `url`.
///
/// Relative spellings (`./images/…`, `../images/…`) are consumed whole. A
/// path that merely ends in `images/<file_name>`, such as
/// `assets/images/cat.png`, is left alone.
pub fn rewrite_references(body: &str, file_name: &str, url: &str) -> (String, usize) {
    let pattern = format!(
        r"(^|[^A-Za-z0-9_./-])(?:\.\.?/)*{}{}",
        regex::escape(PLACEHOLDER_DIR),
        regex::escape(file_name)
    );
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            warn!(image = %file_name, error = %e, "[IMAGES] Could not build reference pattern");
            return (body.to_string(), 0);
        }
    };
    let references = re.find_iter(body).count();
    let rewritten = re.replace_all(body, |caps: &Captures| format!("{}{url}", &caps[1]));
    (rewritten.into_owned(), references)
}

fn copy_asset(asset: &ImageAsset) -> Result<(), ImageCopyError> {
    if !asset.source.is_file() {
        return Err(ImageCopyError::Missing(asset.source.clone()));
    }
    let copy_err = |source| ImageCopyError::Copy {
        from: asset.source.clone(),
        to: asset.target_absolute.clone(),
        source,
    };
    if let Some(dir) = asset.target_absolute.parent() {
        std::fs::create_dir_all(dir).map_err(copy_err)?;
    }
    std::fs::copy(&asset.source, &asset.target_absolute).map_err(copy_err)?;
    Ok(())
}
