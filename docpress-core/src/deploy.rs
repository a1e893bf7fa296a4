//! Deployment Notifier: tells the operator how to ship a batch.
//!
//! The commit and push stay operator-gated. Nothing here spawns a process;
//! the plan is text to be read and run by hand.

use std::fmt;
use std::path::Path;

use crate::config::SiteConfig;
use crate::contract::{DeploymentNotifier, DeploymentPlan, PublishedPost};

/// Describes a `git add / commit / push` of the site repository.
#[derive(Debug, Clone)]
pub struct GitDeploymentNotifier {
    content_folder: String,
    static_folder: String,
    ci_status_url: Option<String>,
    live_url: Option<String>,
}

impl GitDeploymentNotifier {
    pub fn from_site(site: &SiteConfig) -> Self {
        let relative = |p: &Path| {
            p.strip_prefix(&site.root)
                .unwrap_or(p)
                .display()
                .to_string()
        };
        Self {
            content_folder: relative(&site.content_folder),
            static_folder: relative(&site.static_folder),
            ci_status_url: site.ci_status_url.clone(),
            live_url: site.live_url.clone(),
        }
    }
}

impl DeploymentNotifier for GitDeploymentNotifier {
    fn describe(&self, site_root: &Path, published: &[PublishedPost]) -> DeploymentPlan {
        let root = shell_quote(&site_root.display().to_string());
        let slugs: Vec<&str> = published.iter().map(|p| p.slug.as_str()).collect();
        let message = match published.len() {
            0 => "Publish site updates".to_string(),
            1 => format!("Publish post: {}", slugs.join(", ")),
            n => format!("Publish {n} posts: {}", slugs.join(", ")),
        };
        DeploymentPlan {
            commands: vec![
                format!(
                    "git -C {root} add {} {}",
                    shell_quote(&self.content_folder),
                    shell_quote(&self.static_folder)
                ),
                format!("git -C {root} commit -m {}", shell_quote(&message)),
                format!("git -C {root} push"),
            ],
            ci_status_url: self.ci_status_url.clone(),
            live_site_url: self.live_url.clone(),
        }
    }
}

impl fmt::Display for DeploymentPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "To deploy, run:")?;
        for command in &self.commands {
            writeln!(f, "  {command}")?;
        }
        if let Some(url) = &self.ci_status_url {
            writeln!(f, "CI status: {url}")?;
        }
        if let Some(url) = &self.live_site_url {
            writeln!(f, "Live site: {url}")?;
        }
        Ok(())
    }
}

/// Single-quote for a POSIX shell when the value needs it.
fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:@,+=".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
