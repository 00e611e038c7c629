//! Email composition and delivery
//!
//! Composition resolves a template by locale, renders it and optionally wraps it
//! in an out template. Delivery goes through one of the [`EmailBackend`]
//! implementations:
//! - Null (log only)
//! - SMTP (using lettre)
//! - Gmail SMTP with OAuth2
//! - Native (sendmail-compatible program)

pub mod address;
pub mod format;
pub mod gmail;
pub mod native;
pub mod null;
pub mod provider;
pub mod resolver;
pub mod retry;
pub mod smtp;
pub mod templates;

pub use address::{check_arguments, is_valid_email, validate_address};
pub use format::EmailFormatter;
pub use gmail::{GmailMailer, GoogleTokenClient};
pub use native::NativeMailer;
pub use null::NullMailer;
pub use provider::{create_backend, EmailBackend};
pub use resolver::TemplateResolver;
pub use retry::RetryPolicy;
pub use smtp::{LettreTransport, MailTransport, SmtpMailer};
pub use templates::{
    DefaultRendererFactory, TemplateEngine, TemplateRenderer, TemplateRendererFactory,
};
