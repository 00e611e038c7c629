//! Delivery backend trait and factory

use super::{GmailMailer, NativeMailer, NullMailer, SmtpMailer};
use crate::domain::{BackendConfig, ComposedMessage, Envelope};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use validator::Validate;

/// A concrete delivery mechanism.
///
/// Callers validate the envelope and message (see
/// [`check_arguments`](super::address::check_arguments)) before handing them over.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailBackend: Send + Sync {
    /// Deliver one message; an error means the email was not sent
    async fn send_email(
        &self,
        envelope: &Envelope,
        message: &ComposedMessage,
        as_plain_text: bool,
    ) -> Result<()>;

    /// Get the backend name
    fn backend_name(&self) -> &'static str;
}

/// Build the backend described by a configuration
pub fn create_backend(config: &BackendConfig) -> Result<Arc<dyn EmailBackend>> {
    let backend: Arc<dyn EmailBackend> = match config {
        BackendConfig::Null => Arc::new(NullMailer::new()),
        BackendConfig::Smtp(smtp_config) => {
            smtp_config.validate()?;
            Arc::new(SmtpMailer::from_config(smtp_config)?)
        }
        BackendConfig::Gmail(gmail_config) => {
            gmail_config.validate()?;
            Arc::new(GmailMailer::from_config(gmail_config)?)
        }
        BackendConfig::Native(native_config) => {
            native_config.validate()?;
            Arc::new(NativeMailer::new(native_config.clone()))
        }
    };

    Ok(backend)
}
