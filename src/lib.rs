//! Mailcraft - locale-aware templated email
//!
//! Resolves email templates by locale, renders subject and body (optionally
//! wrapped in an out template) and delivers the result through a pluggable
//! backend: log-only, SMTP, Gmail OAuth SMTP or a local sendmail program.

pub mod config;
pub mod domain;
pub mod email;
pub mod error;
pub mod mailer;
pub mod telemetry;

// Re-export commonly used types
pub use config::{Config, FormatterConfig};
pub use domain::{Address, BackendConfig, ComposedMessage, Envelope, FormatRequest};
pub use error::{AddressField, MailError, Result};
pub use mailer::Mailer;
