//! Metadata Resolver: publish date, title and slug for a draft post.
//!
//! Resolution never fails. A missing or unparsable `date` falls back to the
//! run's date, a missing `title` to the source file stem. The slug is a pure
//! function of title and date, so republishing the same draft always lands
//! on the same file.

use std::path::Path;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

/// Frontmatter fence.
pub const FRONTMATTER_FENCE: &str = "+++";

/// TOML comment naming the draft a post was published from.
pub const SOURCE_MARKER: &str = "# source: ";

/// A field that could not be read from the draft and was defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataFallback {
    Date,
    Title,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetadata {
    pub publish_date: NaiveDate,
    pub title: String,
    pub slug: String,
    pub fallbacks: Vec<MetadataFallback>,
}

/// Resolve metadata for `draft`, which came from the document at `source`.
pub fn resolve_metadata(draft: &str, source: &Path, today: NaiveDate) -> ResolvedMetadata {
    let header = frontmatter(draft).unwrap_or(draft);
    let mut fallbacks = Vec::new();

    let publish_date = match field(header, "date").and_then(|raw| parse_date(&raw)) {
        Some(date) => date,
        None => {
            debug!(source = %source.display(), %today, "[METADATA] No usable date, using run date");
            fallbacks.push(MetadataFallback::Date);
            today
        }
    };

    let title = match field(header, "title").filter(|t| !t.trim().is_empty()) {
        Some(title) => title.trim().to_string(),
        None => {
            let stem = source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            debug!(source = %source.display(), stem = %stem, "[METADATA] No title, using file name");
            fallbacks.push(MetadataFallback::Title);
            stem
        }
    };

    let slug = slugify(&title, publish_date);
    info!(slug = %slug, date = %publish_date, fallbacks = fallbacks.len(), "[METADATA] Resolved");
    ResolvedMetadata {
        publish_date,
        title,
        slug,
        fallbacks,
    }
}

/// `YYYY-MM-DD-<title-part>`, or just `YYYY-MM-DD` when nothing of the
/// title survives.
pub fn slugify(title: &str, date: NaiveDate) -> String {
    let mut replaced = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        match c {
            ' ' | '—' => replaced.push('-'),
            '+' => replaced.push_str("plus"),
            '&' => replaced.push_str("and"),
            c if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' => replaced.push(c),
            _ => {}
        }
    }

    let mut collapsed = String::with_capacity(replaced.len());
    for c in replaced.chars() {
        if c == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(c);
    }
    let title_part = collapsed.trim_matches('-');

    let date_part = date.format("%Y-%m-%d");
    if title_part.is_empty() {
        date_part.to_string()
    } else {
        format!("{date_part}-{title_part}")
    }
}

/// The text between the opening and closing `+++` fences, if the draft
/// starts with one.
pub fn frontmatter(draft: &str) -> Option<&str> {
    frontmatter_span(draft).map(|(start, end)| &draft[start..end])
}

/// Byte range of the frontmatter body inside `draft`.
fn frontmatter_span(draft: &str) -> Option<(usize, usize)> {
    let rest = draft.trim_start().strip_prefix(FRONTMATTER_FENCE)?;
    let rest = rest.strip_prefix('\r').unwrap_or(rest);
    let rest = rest.strip_prefix('\n')?;
    let start = draft.len() - rest.len();
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONTMATTER_FENCE {
            return Some((start, start + offset));
        }
        offset += line.len();
    }
    None
}

/// Adds a `# source: <name>` comment as the last frontmatter line, so a later
/// run can tell which draft a post on the site came from. Drafts without
/// frontmatter, or already stamped, are returned unchanged.
pub fn stamp_source(draft: &str, source_name: &str) -> String {
    match frontmatter_span(draft) {
        Some((_, end)) if source_marker(draft).is_none() => {
            let mut stamped = String::with_capacity(draft.len() + SOURCE_MARKER.len() + source_name.len() + 1);
            stamped.push_str(&draft[..end]);
            stamped.push_str(SOURCE_MARKER);
            stamped.push_str(source_name);
            stamped.push('\n');
            stamped.push_str(&draft[end..]);
            stamped
        }
        _ => draft.to_string(),
    }
}

/// The draft name recorded by [`stamp_source`], if any.
pub fn source_marker(post: &str) -> Option<&str> {
    frontmatter(post)?
        .lines()
        .find_map(|line| line.trim_end().strip_prefix(SOURCE_MARKER))
        .map(str::trim)
}

/// Value of a `key = "value"` line. Basic strings may hold TOML escapes
/// (`\"`, `\\`). Single-quoted literals and bare TOML dates
/// (`date = 2025-01-05`) are accepted too.
fn field(text: &str, key: &str) -> Option<String> {
    static FIELD: OnceLock<Regex> = OnceLock::new();
    let re = FIELD.get_or_init(|| {
        Regex::new(
            r#"(?m)^[ \t]*([A-Za-z_]+)[ \t]*=[ \t]*(?:"((?:[^"\\\n]|\\.)*)"|'([^'\n]*)'|([0-9]{4}-[0-9]{2}-[0-9]{2}\S*))[ \t]*\r?$"#,
        )
        .expect("field regex is valid")
    });
    let caps = re.captures_iter(text).find(|caps| &caps[1] == key)?;
    if let Some(basic) = caps.get(2) {
        return Some(unescape_basic(basic.as_str()));
    }
    caps.get(3)
        .or_else(|| caps.get(4))
        .map(|m| m.as_str().to_string())
}

/// Resolves the escapes of a TOML basic string. Unknown escapes are kept
/// verbatim.
fn unescape_basic(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        raw.get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
    })
}
