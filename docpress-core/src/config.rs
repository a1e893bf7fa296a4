use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::ConfigurationError;

/// Immutable configuration for one batch run. Built once at startup and
/// passed by reference into every stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Folder scanned for `.docx` drafts.
    #[serde(alias = "DraftsFolder")]
    pub drafts_folder: PathBuf,
    /// Folder holding the style exemplar.
    #[serde(alias = "TemplateFolder")]
    pub template_folder: PathBuf,
    /// Staging folder that keeps a copy of every published post.
    #[serde(alias = "FinalDraftFolder")]
    pub final_draft_folder: PathBuf,
    /// Extension given to a draft once it has been published.
    #[serde(default = "default_archive_extension")]
    pub archive_extension: String,
    pub site: SiteConfig,
    pub generation: GenerationConfig,
}

/// Where the static site lives and how it is reached once deployed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Root of the site repository; deployment commands run against it.
    pub root: PathBuf,
    /// Markdown content folder for posts.
    pub content_folder: PathBuf,
    /// Static folder that serves images under `image_url_prefix`.
    pub static_folder: PathBuf,
    #[serde(default = "default_image_url_prefix")]
    pub image_url_prefix: String,
    #[serde(default)]
    pub ci_status_url: Option<String>,
    #[serde(default)]
    pub live_url: Option<String>,
}

/// Settings for the text-generation capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible API, e.g. `https://api.openai.com/v1`.
    pub endpoint: String,
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Run a second copy-editing request after the main rewrite.
    #[serde(default)]
    pub polish: bool,
    #[serde(default = "default_max_template_chars")]
    pub max_template_chars: usize,
    #[serde(default = "default_max_body_chars")]
    pub max_body_chars: usize,
}

fn default_archive_extension() -> String {
    "published".to_string()
}

fn default_image_url_prefix() -> String {
    "/img".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_template_chars() -> usize {
    4000
}

fn default_max_body_chars() -> usize {
    12000
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PipelineConfig {
    pub fn trace_loaded(&self) {
        info!(
            drafts_folder = %self.drafts_folder.display(),
            template_folder = %self.template_folder.display(),
            final_draft_folder = %self.final_draft_folder.display(),
            site_content = %self.site.content_folder.display(),
            site_static = %self.site.static_folder.display(),
            model = %self.generation.model,
            "Loaded PipelineConfig"
        );
        debug!(?self, "PipelineConfig loaded (full debug)");
    }

    /// Resolves every relative path against `base`, usually the directory of
    /// the config file.
    pub fn resolve_relative_to(mut self, base: &Path) -> Self {
        let join = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.drafts_folder = join(self.drafts_folder);
        self.template_folder = join(self.template_folder);
        self.final_draft_folder = join(self.final_draft_folder);
        self.site.root = join(self.site.root);
        self.site.content_folder = join(self.site.content_folder);
        self.site.static_folder = join(self.site.static_folder);
        self
    }

    /// Checks the settings that would otherwise only fail deep inside a run.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.archive_extension.is_empty()
            || self.archive_extension.contains(&['/', '\\', '.'][..])
        {
            return Err(ConfigurationError::Invalid(format!(
                "archive_extension must be a bare extension, got {:?}",
                self.archive_extension
            )));
        }
        if self.archive_extension.eq_ignore_ascii_case("docx") {
            return Err(ConfigurationError::Invalid(
                "archive_extension must differ from docx, or drafts would be reprocessed".into(),
            ));
        }
        if self.generation.timeout_secs == 0 {
            return Err(ConfigurationError::Invalid(
                "generation.timeout_secs must be greater than zero".into(),
            ));
        }
        if self.generation.model.trim().is_empty() {
            return Err(ConfigurationError::Invalid(
                "generation.model must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Config rooted at `root` with the conventional folder names. Used by
    /// tests and as a starting point for programmatic callers.
    pub fn rooted_at(root: &Path) -> Self {
        PipelineConfig {
            drafts_folder: root.join("drafts"),
            template_folder: root.join("template"),
            final_draft_folder: root.join("final"),
            archive_extension: default_archive_extension(),
            site: SiteConfig {
                root: root.join("site"),
                content_folder: root.join("site/content/posts"),
                static_folder: root.join("site/static/img"),
                image_url_prefix: default_image_url_prefix(),
                ci_status_url: None,
                live_url: None,
            },
            generation: GenerationConfig {
                endpoint: "http://localhost:11434/v1".to_string(),
                model: "llama3".to_string(),
                timeout_secs: default_timeout_secs(),
                polish: false,
                max_template_chars: default_max_template_chars(),
                max_body_chars: default_max_body_chars(),
            },
        }
    }
}
