//! Template resolution domain types

use std::collections::HashMap;
use std::path::PathBuf;

/// Variables substituted into subjects and template bodies
pub type TemplateData = HashMap<String, String>;

/// Variable the outer template receives the rendered inner body under
pub const OUTER_CONTENT_VARIABLE: &str = "EMAILCONTENT";

/// Out template used when a request does not name one
pub const DEFAULT_OUTER_TEMPLATE: &str = "default";

/// Name of the per-locale subjects manifest
pub const MANIFEST_FILE: &str = "subjects.xml";

/// A template found by the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    /// Subject line, may itself contain `{{variable}}` placeholders
    pub subject: String,
    /// Locale-qualified template path relative to the template directory,
    /// without extension (`de/contact`, `contact`)
    pub template: String,
}

/// What to compose: template name, data and out template choice
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatRequest {
    pub template: String,
    pub data: TemplateData,
    /// `None` wraps with [`DEFAULT_OUTER_TEMPLATE`], `Some("")` skips wrapping
    pub outer_template: Option<String>,
    /// Deliver the body verbatim as text/plain
    pub plain_text: bool,
}

impl FormatRequest {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, data: TemplateData) -> Self {
        self.data = data;
        self
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(name.into(), value.into());
        self
    }

    pub fn with_outer_template(mut self, name: impl Into<String>) -> Self {
        self.outer_template = Some(name.into());
        self
    }

    pub fn without_outer_template(self) -> Self {
        self.with_outer_template("")
    }

    pub fn as_plain_text(mut self) -> Self {
        self.plain_text = true;
        self
    }

    /// Out template to wrap with, `None` when wrapping is skipped
    pub fn outer_template_name(&self) -> Option<&str> {
        match self.outer_template.as_deref() {
            None => Some(DEFAULT_OUTER_TEMPLATE),
            Some(name) if name.is_empty() => None,
            Some(name) => Some(name),
        }
    }
}

/// Options handed to a renderer on `init`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererOptions {
    pub template_dir: PathBuf,
    /// Template file extension without the dot
    pub extension: String,
    /// Engine specific options
    pub extra: HashMap<String, String>,
}

impl RendererOptions {
    pub fn new(template_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            template_dir: template_dir.into(),
            extension: extension.into(),
            extra: HashMap::new(),
        }
    }

    /// Absolute file path of a relative, extension-less template path
    pub fn template_path(&self, template: &str) -> PathBuf {
        self.template_dir
            .join(format!("{}.{}", template, self.extension))
    }
}
