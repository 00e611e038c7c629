//! Mail facade: compose from templates, validate, hand over to a backend

use crate::config::{Config, FormatterConfig};
use crate::domain::{ComposedMessage, Envelope, FormatRequest};
use crate::email::{
    check_arguments, create_backend, EmailBackend, EmailFormatter, TemplateRendererFactory,
};
use crate::error::Result;
use crate::telemetry::metrics;
use std::sync::Arc;
use tracing::{debug, warn};

/// Locale-aware templated mailer bound to one delivery backend
pub struct Mailer {
    formatter: EmailFormatter,
    backend: Arc<dyn EmailBackend>,
}

impl Mailer {
    pub fn new(config: FormatterConfig, backend: Arc<dyn EmailBackend>) -> Result<Self> {
        Ok(Self {
            formatter: EmailFormatter::new(config)?,
            backend,
        })
    }

    /// Build the formatter and the configured backend
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = create_backend(&config.backend)?;
        Self::new(config.formatter.clone(), backend)
    }

    /// Render templates with a custom engine
    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRendererFactory>) -> Self {
        self.formatter = self.formatter.with_renderer(renderer);
        self
    }

    /// Switch the locale used by later compositions
    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.formatter.set_locale(locale);
    }

    pub fn locale(&self) -> &str {
        self.formatter.locale()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    pub fn formatter(&self) -> &EmailFormatter {
        &self.formatter
    }

    /// Compose without sending
    pub fn compose(&self, request: &FormatRequest) -> Result<ComposedMessage> {
        self.formatter.compose(request)
    }

    /// Compose `request` and send the result to `envelope`
    pub async fn format_and_send(&self, request: &FormatRequest, envelope: &Envelope) -> Result<()> {
        let message = self.compose(request)?;
        self.send(&message, envelope, request.plain_text).await
    }

    /// Validate and deliver an already composed message
    pub async fn send(
        &self,
        message: &ComposedMessage,
        envelope: &Envelope,
        as_plain_text: bool,
    ) -> Result<()> {
        let backend = self.backend.backend_name();

        if let Err(e) = check_arguments(message, envelope) {
            warn!(backend, error = %e, "Rejected email before sending");
            metrics::record_failed(backend, e.kind());
            return Err(e);
        }

        debug!(backend, to = %envelope.to, subject = %message.subject, "Sending email");

        match self.backend.send_email(envelope, message, as_plain_text).await {
            Ok(()) => {
                metrics::record_sent(backend);
                Ok(())
            }
            Err(e) => {
                metrics::record_failed(backend, e.kind());
                Err(e)
            }
        }
    }
}
