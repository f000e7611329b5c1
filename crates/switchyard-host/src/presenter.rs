use std::path::Path;

use anyhow::{Context, Result, anyhow};
use handlebars::Handlebars;
use serde_json::Value;

/// Turns an index render payload into a page.
pub trait Presenter: Send + Sync {
    /// `Ok(None)` when no template of that name is registered.
    fn render(&self, template: &str, context: &Value) -> Result<Option<String>>;
}

/// Handlebars in strict mode: a template referencing a key the payload lacks
/// fails instead of rendering blank.
pub struct HandlebarsPresenter {
    registry: Handlebars<'static>,
}

impl Default for HandlebarsPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlebarsPresenter {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        Self { registry }
    }

    pub fn register_string(&mut self, name: &str, source: &str) -> Result<()> {
        self.registry
            .register_template_string(name, source)
            .map_err(|err| anyhow!("invalid template `{name}`: {err}"))
    }

    pub fn register_file(&mut self, name: &str, path: &Path) -> Result<()> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read template {}", path.display()))?;
        self.register_string(name, &source)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }
}

impl Presenter for HandlebarsPresenter {
    fn render(&self, template: &str, context: &Value) -> Result<Option<String>> {
        if !self.registry.has_template(template) {
            return Ok(None);
        }
        let page = self
            .registry
            .render(template, context)
            .map_err(|err| anyhow!("template `{template}` failed to render: {err}"))?;
        Ok(Some(page))
    }
}
