//! Email template rendering
//!
//! Composition talks to a [`TemplateRenderer`], a small session-style interface
//! (init, set variables, pick a template, render). [`TemplateEngine`] is the
//! built-in renderer: `{{variable_name}}` substitution over files stored in the
//! template directory.

use crate::domain::{RendererOptions, TemplateData};
use crate::error::{MailError, Result};
use regex::{Captures, Regex};
use std::collections::HashMap;

lazy_static::lazy_static! {
    /// `{{variable_name}}` placeholder
    static ref PLACEHOLDER_REGEX: Regex = Regex::new(r"\{\{(\w+)\}\}").unwrap();
}

/// Template rendering capability used by the composer
#[cfg_attr(test, mockall::automock)]
pub trait TemplateRenderer: Send {
    /// Prepare the renderer; called once per composition
    fn init(&mut self, options: &RendererOptions) -> Result<()>;

    /// Whether a relative, extension-less template path can be loaded
    fn template_exists(&self, template: &str) -> bool;

    fn set_variables(&mut self, variables: &TemplateData);

    fn set_variable(&mut self, name: &str, value: &str);

    /// Render an inline template string against the current variables
    fn render_string(&self, text: &str) -> Result<String>;

    fn set_template(&mut self, template: &str);

    /// Render the current template against the current variables
    fn render(&self) -> Result<String>;
}

/// Creates a fresh renderer for every composition
pub trait TemplateRendererFactory: Send + Sync {
    fn create(&self) -> Box<dyn TemplateRenderer>;
}

impl<F> TemplateRendererFactory for F
where
    F: Fn() -> Box<dyn TemplateRenderer> + Send + Sync,
{
    fn create(&self) -> Box<dyn TemplateRenderer> {
        self()
    }
}

/// Factory for the built-in [`TemplateEngine`]
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRendererFactory;

impl TemplateRendererFactory for DefaultRendererFactory {
    fn create(&self) -> Box<dyn TemplateRenderer> {
        Box::new(TemplateEngine::new())
    }
}

/// Template rendering engine with variable substitution
#[derive(Debug, Default)]
pub struct TemplateEngine {
    variables: HashMap<String, String>,
    options: Option<RendererOptions>,
    template: Option<String>,
}

impl TemplateEngine {
    /// Create a new template engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Set multiple variables from an iterator
    pub fn set_all<I, K, V>(&mut self, iter: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in iter {
            self.variables.insert(k.into(), v.into());
        }
        self
    }

    /// Substitute {{variable}} with values in one pass over `template`.
    /// Unknown variables are left as-is; inserted values are never expanded again.
    pub fn substitute(&self, template: &str) -> String {
        PLACEHOLDER_REGEX
            .replace_all(template, |caps: &Captures| match self.variables.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    fn options(&self) -> Result<&RendererOptions> {
        self.options.as_ref().ok_or_else(|| {
            MailError::Configuration("Template engine used before init".to_string())
        })
    }
}

impl TemplateRenderer for TemplateEngine {
    fn init(&mut self, options: &RendererOptions) -> Result<()> {
        if !options.template_dir.is_dir() {
            return Err(MailError::Configuration(format!(
                "Template directory {} does not exist",
                options.template_dir.display()
            )));
        }
        self.options = Some(options.clone());
        self.variables.clear();
        self.template = None;
        Ok(())
    }

    fn template_exists(&self, template: &str) -> bool {
        self.options
            .as_ref()
            .is_some_and(|options| options.template_path(template).is_file())
    }

    fn set_variables(&mut self, variables: &TemplateData) {
        self.set_all(variables.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }

    fn set_variable(&mut self, name: &str, value: &str) {
        self.set(name, value);
    }

    fn render_string(&self, text: &str) -> Result<String> {
        Ok(self.substitute(text))
    }

    fn set_template(&mut self, template: &str) {
        self.template = Some(template.to_string());
    }

    fn render(&self) -> Result<String> {
        let template = self
            .template
            .as_deref()
            .ok_or_else(|| MailError::InvalidTemplate("No template selected".to_string()))?;
        let path = self.options()?.template_path(template);

        let source = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MailError::TemplateNotFound(template.to_string()),
            _ => MailError::Io(e),
        })?;

        Ok(self.substitute(&source))
    }
}
