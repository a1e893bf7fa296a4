//! Error taxonomy for the publishing pipeline.
//!
//! Only [`ConfigurationError`] is fatal to a batch. Everything else is scoped to
//! a single document: [`PipelineError`] aborts that document, while
//! [`ExtractionError`], [`ImageCopyError`] and [`ArchivalError`] degrade it and
//! end up as warnings in the run report.

use std::path::PathBuf;

use thiserror::Error;

/// The source container could not be opened or parsed.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to open document: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a valid docx container: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("malformed document xml: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// The text-generation capability did not produce usable output.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    #[error("generation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
    #[error("generation returned an empty response")]
    EmptyResponse,
    #[error("generation endpoint returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("generation request failed: {0}")]
    Transport(String),
}

/// Which of the two publication targets a write was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputTarget {
    Staging,
    Site,
}

impl std::fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputTarget::Staging => f.write_str("staging"),
            OutputTarget::Site => f.write_str("site"),
        }
    }
}

/// A publication write failed. `written` holds outputs that already landed
/// before the failure.
#[derive(Debug, Error)]
#[error("failed to write {target} output {}: {source}", path.display())]
pub struct PublishError {
    pub target: OutputTarget,
    pub path: PathBuf,
    pub written: Vec<PathBuf>,
    #[source]
    pub source: std::io::Error,
}

/// A single image could not be copied into the static folder.
#[derive(Debug, Error)]
pub enum ImageCopyError {
    #[error("image {} no longer exists", .0.display())]
    Missing(PathBuf),
    #[error("failed to copy image {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The source document was published but could not be marked as processed.
#[derive(Debug, Error)]
#[error("failed to archive {} as {}: {source}", from.display(), to.display())]
pub struct ArchivalError {
    pub from: PathBuf,
    pub to: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Startup problems that abort the whole batch.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("drafts folder {} does not exist", .0.display())]
    MissingDraftsFolder(PathBuf),
    #[error("failed to list drafts folder {}: {source}", path.display())]
    UnreadableDraftsFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extract,
    Transform,
    Metadata,
    Images,
    Write,
    Archive,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Extract => "extract",
            Stage::Transform => "transform",
            Stage::Metadata => "metadata",
            Stage::Images => "images",
            Stage::Write => "write",
            Stage::Archive => "archive",
        };
        f.write_str(name)
    }
}

/// Failure that stops processing of one document.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl PipelineError {
    /// The stage at which the document stopped.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Generation(_) => Stage::Transform,
            PipelineError::Publish(_) => Stage::Write,
            PipelineError::Lifecycle(_) => Stage::Archive,
        }
    }
}

/// Attempted document state change that the lifecycle does not allow.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("cannot move document from {from:?} to {to:?}")]
pub struct LifecycleError {
    pub from: crate::pipeline::DocumentState,
    pub to: crate::pipeline::DocumentState,
}
