//! Email composition: template lookup, rendering and out-template wrapping

use super::resolver::TemplateResolver;
use super::templates::{DefaultRendererFactory, TemplateRendererFactory};
use crate::config::FormatterConfig;
use crate::domain::{ComposedMessage, FormatRequest, RendererOptions, OUTER_CONTENT_VARIABLE};
use crate::error::{MailError, Result};
use crate::telemetry::metrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Builds subject + body pairs from locale-aware templates
pub struct EmailFormatter {
    config: FormatterConfig,
    resolver: TemplateResolver,
    renderer: Arc<dyn TemplateRendererFactory>,
}

impl EmailFormatter {
    /// Create a formatter using the built-in template engine
    pub fn new(config: FormatterConfig) -> Result<Self> {
        config.validate()?;

        let resolver = TemplateResolver::new(
            config.template_dir.clone(),
            config.template_extension.clone(),
            config.outer_template_prefix.clone(),
        );

        Ok(Self {
            config,
            resolver,
            renderer: Arc::new(DefaultRendererFactory),
        })
    }

    /// Replace the template renderer
    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRendererFactory>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.config.locale = locale.into();
    }

    pub fn locale(&self) -> &str {
        &self.config.locale
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    pub fn resolver(&self) -> &TemplateResolver {
        &self.resolver
    }

    /// Render the subject and body for a request.
    ///
    /// Out-template wrapping defaults to `default`; an explicit empty name skips it.
    pub fn compose(&self, request: &FormatRequest) -> Result<ComposedMessage> {
        let started = Instant::now();

        if request.template.trim().is_empty() {
            return Err(MailError::InvalidTemplate(
                "No template to format email".to_string(),
            ));
        }

        let locale = self.config.locale.as_str();
        let default_locale = self.config.default_locale.as_str();

        let resolved = self
            .resolver
            .resolve(&request.template, locale, default_locale)?;

        let outer = match request.outer_template_name() {
            Some(name) => Some(
                self.resolver
                    .resolve_outer(name, locale, default_locale)
                    .ok_or_else(|| MailError::TemplateNotFound(name.to_string()))?,
            ),
            None => None,
        };

        let mut renderer = self.renderer.create();
        renderer.init(&self.renderer_options())?;

        if !renderer.template_exists(&resolved.template) {
            return Err(MailError::TemplateNotFound(request.template.clone()));
        }

        renderer.set_variables(&request.data);

        // subjects may carry placeholders too
        let subject = renderer.render_string(&resolved.subject)?;

        renderer.set_template(&resolved.template);
        let mut body = renderer.render()?;

        if let Some(outer) = outer {
            renderer.set_variable(OUTER_CONTENT_VARIABLE, &body);
            renderer.set_template(&outer);
            body = renderer.render()?;
        }

        debug!(
            template = %resolved.template,
            locale,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Composed email"
        );
        metrics::record_compose_duration(started.elapsed());

        Ok(ComposedMessage { subject, body })
    }

    fn renderer_options(&self) -> RendererOptions {
        RendererOptions {
            template_dir: self.config.template_dir.clone(),
            extension: self.config.template_extension.clone(),
            extra: self.config.renderer_options.clone(),
        }
    }
}
