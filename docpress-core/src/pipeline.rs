//! High-level pipeline: orchestrates extract → transform → metadata → images →
//! write → archive for every draft in the drafts folder.
//!
//! # Responsibilities
//! - Drafts are processed one at a time, in file name order. The site content
//!   and static folders are shared and unlocked; serial processing is what
//!   keeps slug and image directory writes from racing.
//! - Per-document failures are isolated: [`process_document`] returns a
//!   `Result` and the batch driver records it and moves on. Only a
//!   [`ConfigurationError`] aborts the batch.
//! - A draft is archived only after both publication writes succeeded; see
//!   [`DocumentState`].
//! - Once the batch is done, the [`DeploymentNotifier`] describes how to ship
//!   the result. Nothing is committed or pushed.
//!
//! # Navigation
//! - Entrypoint: [`publish_batch`]
//! - One draft: [`process_document`]
//! - Output: [`BatchReport`]

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::archive::archive_source;
use crate::config::PipelineConfig;
use crate::contract::{
    DeploymentNotifier, DeploymentPlan, DocumentReader, PublishedPost, SourceDocument,
    StyleTemplate, TextGenerator,
};
use crate::discover::{discover_drafts, load_style_template};
use crate::error::{ConfigurationError, LifecycleError, PipelineError, Stage};
use crate::images::relocate_images;
use crate::metadata::{resolve_metadata, stamp_source, MetadataFallback};
use crate::publish::write_publication;
use crate::transform::transform;

/// Where a draft is in its life. `Published` is only reached once both
/// writes succeeded, `Archived` only from `Published`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    Pending,
    Published,
    Archived,
}

impl DocumentState {
    pub fn publish(self) -> Result<Self, LifecycleError> {
        match self {
            DocumentState::Pending => Ok(DocumentState::Published),
            from => Err(LifecycleError {
                from,
                to: DocumentState::Published,
            }),
        }
    }

    pub fn archive(self) -> Result<Self, LifecycleError> {
        match self {
            DocumentState::Published => Ok(DocumentState::Archived),
            from => Err(LifecycleError {
                from,
                to: DocumentState::Archived,
            }),
        }
    }
}

/// Something that went wrong without stopping the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DocumentWarning {
    /// The draft could not be read; a placeholder body was transformed.
    Extraction(String),
    /// A metadata field was defaulted.
    MetadataFallback(MetadataFallback),
    /// An image was not copied and its references were left as they were.
    ImageSkipped(String),
    /// The optional polish pass failed and the first draft was kept.
    PolishSkipped(String),
    /// The slug was already used, in this run by `previous` or on the site by
    /// a different post.
    SlugCollision {
        slug: String,
        previous: Option<PathBuf>,
    },
    /// Published, but the draft could not be renamed; the next run will
    /// publish it again.
    Archival(String),
}

impl fmt::Display for DocumentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentWarning::Extraction(e) => write!(f, "extraction fell back to placeholder: {e}"),
            DocumentWarning::MetadataFallback(MetadataFallback::Date) => {
                f.write_str("no usable date, used the run date")
            }
            DocumentWarning::MetadataFallback(MetadataFallback::Title) => {
                f.write_str("no title, used the file name")
            }
            DocumentWarning::ImageSkipped(e) => write!(f, "image skipped: {e}"),
            DocumentWarning::PolishSkipped(e) => write!(f, "polish pass skipped: {e}"),
            DocumentWarning::SlugCollision {
                slug,
                previous: Some(previous),
            } => write!(f, "slug {slug} was already published by {} in this run", previous.display()),
            DocumentWarning::SlugCollision {
                slug,
                previous: None,
            } => write!(f, "slug {slug} overwrote a different existing post"),
            DocumentWarning::Archival(e) => write!(f, "not archived: {e}"),
        }
    }
}

/// A draft that made it through publication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedDocument {
    pub post: PublishedPost,
    pub staging_path: PathBuf,
    pub site_path: PathBuf,
    pub state: DocumentState,
    pub archived_to: Option<PathBuf>,
}

/// Final result for one draft in a batch.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    Processed(ProcessedDocument),
    Failed {
        stage: Stage,
        error: String,
        /// Outputs that were written before the failure.
        partial_outputs: Vec<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
pub struct DocumentReport {
    pub source: PathBuf,
    pub outcome: DocumentOutcome,
    pub warnings: Vec<DocumentWarning>,
}

impl DocumentReport {
    pub fn state(&self) -> DocumentState {
        match &self.outcome {
            DocumentOutcome::Processed(p) => p.state,
            DocumentOutcome::Failed { .. } => DocumentState::Pending,
        }
    }
}

/// Summary of one batch run.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub run_date: NaiveDate,
    /// Exemplar file, or `None` when the built-in style was used.
    pub style_template: Option<PathBuf>,
    pub documents: Vec<DocumentReport>,
    /// Present when at least one post was published.
    pub deployment: Option<DeploymentPlan>,
}

impl BatchReport {
    pub fn published(&self) -> impl Iterator<Item = &ProcessedDocument> {
        self.documents.iter().filter_map(|d| match &d.outcome {
            DocumentOutcome::Processed(p) => Some(p),
            DocumentOutcome::Failed { .. } => None,
        })
    }

    pub fn archived(&self) -> impl Iterator<Item = &ProcessedDocument> {
        self.published()
            .filter(|p| p.state == DocumentState::Archived)
    }

    pub fn failed(&self) -> impl Iterator<Item = &DocumentReport> {
        self.documents
            .iter()
            .filter(|d| matches!(d.outcome, DocumentOutcome::Failed { .. }))
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Run {} ({}): {} draft(s), {} published, {} archived, {} failed",
            self.run_id,
            self.run_date,
            self.documents.len(),
            self.published().count(),
            self.archived().count(),
            self.failed().count()
        )?;
        match &self.style_template {
            Some(path) => writeln!(f, "Style template: {}", path.display())?,
            None => writeln!(f, "Style template: built-in default")?,
        }
        for doc in &self.documents {
            match &doc.outcome {
                DocumentOutcome::Processed(p) => {
                    let state = match p.state {
                        DocumentState::Archived => "published + archived",
                        _ => "published, NOT archived",
                    };
                    writeln!(f, "  [ok]     {} -> {} ({state})", doc.source.display(), p.post.slug)?;
                }
                DocumentOutcome::Failed {
                    stage,
                    error,
                    partial_outputs,
                } => {
                    writeln!(f, "  [failed] {} at {stage}: {error}", doc.source.display())?;
                    for output in partial_outputs {
                        writeln!(f, "           partial output: {}", output.display())?;
                    }
                }
            }
            for warning in &doc.warnings {
                writeln!(f, "           warning: {warning}")?;
            }
        }
        Ok(())
    }
}

/// State of one execution: configuration, style, inputs.
#[derive(Debug)]
pub struct BatchRun<'a> {
    pub run_id: Uuid,
    pub config: &'a PipelineConfig,
    pub today: NaiveDate,
    pub style: StyleTemplate,
    pub documents: Vec<SourceDocument>,
}

impl<'a> BatchRun<'a> {
    /// Validate config, find the drafts and load the style exemplar.
    pub fn prepare<R>(
        config: &'a PipelineConfig,
        reader: &R,
        today: NaiveDate,
    ) -> Result<Self, ConfigurationError>
    where
        R: DocumentReader + ?Sized,
    {
        config.validate()?;
        let documents = discover_drafts(&config.drafts_folder)?;
        let style = load_style_template(&config.template_folder, reader);
        Ok(BatchRun {
            run_id: Uuid::new_v4(),
            config,
            today,
            style,
            documents,
        })
    }

    /// Process every draft in order and describe the deployment.
    pub async fn execute<R, G, N>(self, reader: &R, generator: &G, notifier: &N) -> BatchReport
    where
        R: DocumentReader + ?Sized,
        G: TextGenerator + ?Sized,
        N: DeploymentNotifier + ?Sized,
    {
        let span = info_span!("batch", run_id = %self.run_id);
        async move {
            info!(
                documents = self.documents.len(),
                run_date = %self.today,
                style_fallback = self.style.is_fallback(),
                "[PIPELINE] Starting batch"
            );

            let mut reports = Vec::with_capacity(self.documents.len());
            let mut slugs: HashMap<String, PathBuf> = HashMap::new();

            for doc in &self.documents {
                let mut warnings = Vec::new();
                let span = info_span!("document", path = %doc.path.display());
                let result = process_document(
                    doc,
                    self.config,
                    &self.style,
                    self.today,
                    reader,
                    generator,
                    &mut warnings,
                )
                .instrument(span)
                .await;

                let outcome = match result {
                    Ok(processed) => {
                        if let Some(previous) =
                            slugs.insert(processed.post.slug.clone(), doc.path.clone())
                        {
                            warn!(
                                slug = %processed.post.slug,
                                previous = %previous.display(),
                                current = %doc.path.display(),
                                "[PIPELINE] Two drafts in this run resolved to the same slug"
                            );
                            warnings.push(DocumentWarning::SlugCollision {
                                slug: processed.post.slug.clone(),
                                previous: Some(previous),
                            });
                        }
                        DocumentOutcome::Processed(processed)
                    }
                    Err(e) => {
                        error!(path = %doc.path.display(), stage = %e.stage(), error = %e, "[PIPELINE] Document failed");
                        let partial_outputs = match &e {
                            PipelineError::Publish(p) => p.written.clone(),
                            PipelineError::Generation(_) | PipelineError::Lifecycle(_) => Vec::new(),
                        };
                        DocumentOutcome::Failed {
                            stage: e.stage(),
                            error: e.to_string(),
                            partial_outputs,
                        }
                    }
                };
                reports.push(DocumentReport {
                    source: doc.path.clone(),
                    outcome,
                    warnings,
                });
            }

            let published: Vec<PublishedPost> = reports
                .iter()
                .filter_map(|r| match &r.outcome {
                    DocumentOutcome::Processed(p) => Some(p.post.clone()),
                    DocumentOutcome::Failed { .. } => None,
                })
                .collect();
            let deployment = if published.is_empty() {
                info!("[PIPELINE] Nothing published, no deployment needed");
                None
            } else {
                Some(notifier.describe(&self.config.site.root, &published))
            };

            let report = BatchReport {
                run_id: self.run_id,
                run_date: self.today,
                style_template: self.style.origin().map(|p| p.to_path_buf()),
                documents: reports,
                deployment,
            };
            info!(
                published = report.published().count(),
                archived = report.archived().count(),
                failed = report.failed().count(),
                "[PIPELINE] Batch complete"
            );
            report
        }
        .instrument(span)
        .await
    }
}

/// Run a whole batch against the drafts folder, dated today.
pub async fn publish_batch<R, G, N>(
    config: &PipelineConfig,
    reader: &R,
    generator: &G,
    notifier: &N,
) -> Result<BatchReport, ConfigurationError>
where
    R: DocumentReader + ?Sized,
    G: TextGenerator + ?Sized,
    N: DeploymentNotifier + ?Sized,
{
    let today = chrono::Local::now().date_naive();
    let run = BatchRun::prepare(config, reader, today)?;
    Ok(run.execute(reader, generator, notifier).await)
}

/// Take one draft from `Pending` through publication and, if possible,
/// archival. Non-fatal problems are pushed onto `warnings`.
pub async fn process_document<R, G>(
    doc: &SourceDocument,
    config: &PipelineConfig,
    style: &StyleTemplate,
    today: NaiveDate,
    reader: &R,
    generator: &G,
    warnings: &mut Vec<DocumentWarning>,
) -> Result<ProcessedDocument, PipelineError>
where
    R: DocumentReader + ?Sized,
    G: TextGenerator + ?Sized,
{
    let state = DocumentState::Pending;
    info!(path = %doc.path.display(), "[PIPELINE] Processing draft");

    // Extract
    let extracted = reader.read(&doc.path);
    if let Some(e) = &extracted.extraction_error {
        warnings.push(DocumentWarning::Extraction(e.clone()));
    }

    // Transform
    let transformed = transform(
        &extracted.body,
        &extracted.images,
        style,
        generator,
        &config.generation,
    )
    .await?;
    if let Some(e) = &transformed.polish_error {
        warnings.push(DocumentWarning::PolishSkipped(e.to_string()));
    }

    // Metadata
    let meta = resolve_metadata(&transformed.draft.body, &doc.path, today);
    warnings.extend(
        meta.fallbacks
            .iter()
            .copied()
            .map(DocumentWarning::MetadataFallback),
    );

    // Images
    let relocation = relocate_images(
        &transformed.draft.body,
        &extracted.images,
        &config.site.static_folder,
        &config.site.image_url_prefix,
        meta.publish_date,
    );
    warnings.extend(
        relocation
            .skipped
            .iter()
            .map(|e| DocumentWarning::ImageSkipped(e.to_string())),
    );

    let source_name = doc
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let post = PublishedPost {
        source: doc.path.clone(),
        title: meta.title,
        publish_date: meta.publish_date,
        slug: meta.slug,
        body: stamp_source(&relocation.body, &source_name),
        images: relocation.copied,
    };

    // Write
    let publication = write_publication(
        &post,
        &config.final_draft_folder,
        &config.site.content_folder,
    )?;
    if publication.replaced_different {
        warnings.push(DocumentWarning::SlugCollision {
            slug: post.slug.clone(),
            previous: None,
        });
    }
    let mut state = state.publish()?;
    match serde_json::to_string_pretty(&post) {
        Ok(json) => debug!(json = %json, "[PIPELINE][DEBUG] Published post as JSON"),
        Err(e) => error!(error = ?e, "[PIPELINE][DEBUG] Failed to serialize post as JSON"),
    }

    // Archive
    let archived_to = match archive_source(&doc.path, &config.archive_extension) {
        Ok(path) => {
            state = state.archive()?;
            Some(path)
        }
        Err(e) => {
            warn!(path = %doc.path.display(), error = %e, "[PIPELINE] Published but not archived; reprocess manually");
            warnings.push(DocumentWarning::Archival(e.to_string()));
            None
        }
    };

    info!(slug = %post.slug, state = ?state, "[PIPELINE] Draft done");
    Ok(ProcessedDocument {
        staging_path: publication.staging_path,
        site_path: publication.site_path,
        post,
        state,
        archived_to,
    })
}
