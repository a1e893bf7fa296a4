//! Content Transformer: one generation request per draft.
//!
//! The prompt carries a truncated copy of the style exemplar and of the
//! extracted body; the persisted content is never truncated. The request is
//! bounded by the configured timeout. An optional polish pass may follow, and
//! its failure only costs quality: the first draft is kept.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::GenerationConfig;
use crate::contract::{DraftPost, StyleTemplate, TextGenerator};
use crate::error::GenerationError;

/// Result of transforming one draft. `polish_error` is set when the optional
/// second pass was attempted and discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    pub draft: DraftPost,
    pub polish_error: Option<GenerationError>,
}

/// Rewrite `body` into a styled post.
pub async fn transform<G>(
    body: &str,
    images: &[PathBuf],
    style: &StyleTemplate,
    generator: &G,
    config: &GenerationConfig,
) -> Result<Transformed, GenerationError>
where
    G: TextGenerator + ?Sized,
{
    let prompt = build_prompt(body, images, style, config);
    info!(
        prompt_chars = prompt.chars().count(),
        "[TRANSFORM] Requesting rewrite from generator"
    );
    let text = generate_bounded(generator, &prompt, config).await?;
    let mut draft = DraftPost { body: text };

    let mut polish_error = None;
    if config.polish {
        let prompt = build_polish_prompt(&draft.body);
        match generate_bounded(generator, &prompt, config).await {
            Ok(polished) => {
                info!("[TRANSFORM] Polish pass applied");
                draft.body = polished;
            }
            Err(e) => {
                warn!(error = %e, "[TRANSFORM] Polish pass failed, keeping first draft");
                polish_error = Some(e);
            }
        }
    }

    Ok(Transformed {
        draft,
        polish_error,
    })
}

/// One generator call under the configured timeout, with the response
/// unwrapped and checked for content.
async fn generate_bounded<G>(
    generator: &G,
    prompt: &str,
    config: &GenerationConfig,
) -> Result<String, GenerationError>
where
    G: TextGenerator + ?Sized,
{
    let response = tokio::time::timeout(config.timeout(), generator.generate(prompt))
        .await
        .map_err(|_| GenerationError::Timeout {
            timeout_secs: config.timeout_secs,
        })??;
    let text = strip_code_fence(&response);
    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text.to_string())
}

/// Prompt for the main rewrite.
pub fn build_prompt(
    body: &str,
    images: &[PathBuf],
    style: &StyleTemplate,
    config: &GenerationConfig,
) -> String {
    let exemplar = truncate_chars(style.content(), config.max_template_chars);
    let content = truncate_chars(body, config.max_body_chars);

    let mut prompt = String::new();
    prompt.push_str(
        "You are an editor turning a rough draft into a finished blog post in Markdown.\n\
         Match the voice, structure and formatting of the style example below.\n\n\
         Start the post with TOML frontmatter fenced by +++ lines containing:\n\
         title = \"...\"\n\
         date = \"YYYY-MM-DD\"\n\
         author = \"...\"\n\
         categories = [\"...\"]\n\
         tags = [\"...\"]\n\n\
         Blocks between [TABLE CONTENT] and [/TABLE] are tables with one row per line \
         and cells separated by |; render them as Markdown tables.\n",
    );

    let names: Vec<String> = images
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    if !names.is_empty() {
        prompt.push_str(
            "Reference each of these images where it fits, using the exact path images/<filename>:\n",
        );
        for name in &names {
            prompt.push_str("- images/");
            prompt.push_str(name);
            prompt.push('\n');
        }
    }

    prompt.push_str("\n--- STYLE EXAMPLE ---\n");
    prompt.push_str(exemplar);
    prompt.push_str("\n--- END STYLE EXAMPLE ---\n\n--- DRAFT ---\n");
    prompt.push_str(content);
    prompt.push_str("\n--- END DRAFT ---\n\nReturn only the finished post.");
    prompt
}

/// Prompt for the optional copy-editing pass.
pub fn build_polish_prompt(draft: &str) -> String {
    format!(
        "Copy-edit the following blog post for grammar, flow and clarity. \
         Keep the +++ frontmatter exactly as it is and keep every image path unchanged. \
         Return only the edited post.\n\n{draft}"
    )
}

/// The first `max` characters of `s`, cut on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Unwraps a response that arrived inside a single fenced code block.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop the info string (```markdown) on the opening line.
    match inner.find('\n') {
        Some(newline) => inner[newline + 1..].trim_end_matches('\n'),
        None => text,
    }
}
