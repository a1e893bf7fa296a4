//! # docpress CLI Interface
//!
//! Command parsing and wiring for the `docpress` binary. All publishing logic
//! lives in [`docpress_core`]; this module only builds the concrete reader,
//! generator and notifier and prints what comes back.
//!
//! ## Commands
//! - `publish --config <file>`: run one batch over the drafts folder.
//! - `extract <file.docx>`: show what the reader gets out of a draft.
//! - `plan --config <file>`: show the deployment commands for the site.
//!
//! [`run`] is the async entrypoint shared by `main` and the integration tests.
use crate::generate::ChatClient;
use crate::load_config::load_config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docpress_core::contract::{DeploymentNotifier, DocumentReader};
use docpress_core::deploy::GitDeploymentNotifier;
use docpress_core::extract::DocxReader;
use docpress_core::pipeline::publish_batch;
use std::path::PathBuf;

/// CLI for docpress: turn Word drafts into static-site blog posts.
#[derive(Parser)]
#[clap(
    name = "docpress",
    version,
    about = "Rewrite Word drafts into styled blog posts and publish them to a static site"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Publish every draft in the drafts folder
    Publish {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Print the run report as JSON instead of text
        #[clap(long)]
        json: bool,
    },
    /// Print the text and images extracted from one draft
    Extract {
        /// Path to a .docx draft
        path: PathBuf,
    },
    /// Print the deployment commands for the configured site
    Plan {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Publish { config, json } => {
            let config = load_config(config)?;
            tracing::info!(command = "publish", "Starting publishing run");
            let reader = DocxReader::new();
            let generator = ChatClient::new_from_env(&config.generation)?;
            let notifier = GitDeploymentNotifier::from_site(&config.site);

            let report = publish_batch(&config, &reader, &generator, &notifier)
                .await
                .context("Publishing run could not start")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{report}");
                if let Some(plan) = &report.deployment {
                    println!();
                    print!("{plan}");
                }
            }
            tracing::info!(
                command = "publish",
                published = report.published().count(),
                failed = report.failed().count(),
                "Publishing run complete"
            );
            Ok(())
        }
        Commands::Extract { path } => {
            tracing::info!(command = "extract", path = %path.display(), "Extracting draft");
            let extracted = DocxReader::new().read(&path);
            if let Some(e) = &extracted.extraction_error {
                tracing::warn!(command = "extract", error = %e, "Extraction fell back to placeholder");
            }
            println!("{}", extracted.body);
            if !extracted.images.is_empty() {
                println!();
                println!("Images:");
                for image in &extracted.images {
                    println!("  {}", image.display());
                }
            }
            Ok(())
        }
        Commands::Plan { config } => {
            let config = load_config(config)?;
            let notifier = GitDeploymentNotifier::from_site(&config.site);
            let plan = notifier.describe(&config.site.root, &[]);
            print!("{plan}");
            Ok(())
        }
    }
}
