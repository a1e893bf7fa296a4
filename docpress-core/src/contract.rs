//! # contract: data model and capability seams of the publishing pipeline
//!
//! This module holds the plain data passed between stages and the three
//! traits through which the pipeline reaches the outside world:
//!
//! - [`DocumentReader`]: turns a draft on disk into text plus sibling images.
//! - [`TextGenerator`]: the external text-generation capability. One request,
//!   text in, text out; may fail or time out.
//! - [`DeploymentNotifier`]: describes, but never runs, the steps that hand
//!   the published site to CI/CD.
//!
//! ## Mocking & Testing
//! `DocumentReader` and `TextGenerator` are annotated for `mockall`, exported
//! under the default `test-export-mocks` feature so dependent crates can use
//! the generated mocks in their own tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::Serialize;

use crate::error::GenerationError;

/// A draft discovered in the drafts folder. Identity is the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDocument {
    pub path: PathBuf,
}

impl SourceDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File name without extension; the title of last resort.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// What the Document Reader produced for one draft.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    /// Paragraph and table blocks in document order, separated by blank lines.
    pub body: String,
    /// Image files sitting next to the draft, sorted by name.
    pub images: Vec<PathBuf>,
    /// Set when the container could not be read and `body` is a placeholder.
    pub extraction_error: Option<String>,
}

/// Reference post used to condition the generation style. Loaded once per
/// batch and shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleTemplate {
    content: String,
    origin: Option<PathBuf>,
}

impl StyleTemplate {
    pub fn new(content: impl Into<String>, origin: Option<PathBuf>) -> Self {
        Self {
            content: content.into(),
            origin,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// File the exemplar was read from; `None` for the built-in default.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    pub fn is_fallback(&self) -> bool {
        self.origin.is_none()
    }
}

/// Text returned by the Content Transformer. Image references are still
/// placeholders of the form `images/<filename>`.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftPost {
    pub body: String,
}

/// An image that belongs to a draft and its place under the static folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageAsset {
    pub source: PathBuf,
    pub file_name: String,
    /// `<YYYY>/<MM>/<file_name>`
    pub target_relative: PathBuf,
    pub target_absolute: PathBuf,
    /// Public URL written into the post body.
    pub url: String,
}

/// A post that has passed metadata resolution and image rewriting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedPost {
    pub source: PathBuf,
    pub title: String,
    pub publish_date: NaiveDate,
    pub slug: String,
    pub body: String,
    pub images: Vec<ImageAsset>,
}

impl PublishedPost {
    /// `<slug>.md`
    pub fn file_name(&self) -> String {
        format!("{}.md", self.slug)
    }
}

/// Commands an operator runs to ship the published posts. Never executed by
/// the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentPlan {
    pub commands: Vec<String>,
    pub ci_status_url: Option<String>,
    pub live_site_url: Option<String>,
}

/// Opens a draft and extracts its text and sibling images.
///
/// Implementations never fail outward: unreadable drafts come back with a
/// placeholder body and `extraction_error` set.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait DocumentReader: Send + Sync {
    fn read(&self, path: &Path) -> ExtractedDocument;
}

/// The external text-generation capability.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send one prompt, receive one completion.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Describes the delivery steps for a site once a batch is done.
pub trait DeploymentNotifier: Send + Sync {
    fn describe(&self, site_root: &Path, published: &[PublishedPost]) -> DeploymentPlan;
}
