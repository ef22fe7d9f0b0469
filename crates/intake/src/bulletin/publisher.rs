//! Bulletin sanitization and publication.

use anyhow::{Context, Result};
use handlebars::Handlebars;
use std::path::{Path, PathBuf};

/// Renders the sanitized bulletin body into the configured template and
/// writes the resulting fragment for the frontend
pub struct BulletinPublisher {
    registry: Handlebars<'static>,
    output_path: PathBuf,
}

impl BulletinPublisher {
    /// Compile the template up front; a broken template is a startup error
    pub fn new(template_path: &Path, output_path: PathBuf) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry
            .register_template_file("motd", template_path)
            .with_context(|| {
                format!(
                    "failed to compile bulletin template {}",
                    template_path.display()
                )
            })?;

        Ok(Self {
            registry,
            output_path,
        })
    }

    /// Strip unsafe markup from the body and write the rendered fragment
    pub async fn publish(&self, body: &str) -> Result<()> {
        let message = ammonia::clean(body);
        let html = self
            .registry
            .render("motd", &serde_json::json!({ "message": message }))
            .context("failed to render bulletin template")?;

        tokio::fs::write(&self.output_path, html)
            .await
            .with_context(|| format!("failed to write {}", self.output_path.display()))?;

        Ok(())
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}
