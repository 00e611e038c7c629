//! Unified error handling for Mailcraft

use std::fmt;
use thiserror::Error;

/// Library-wide result type
pub type Result<T> = std::result::Result<T, MailError>;

/// Address field an [`MailError::InvalidAddress`] refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressField {
    Email,
    From,
    ReplyTo,
    Cc,
    Bcc,
}

impl AddressField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::From => "From",
            Self::ReplyTo => "ReplyTo",
            Self::Cc => "CC",
            Self::Bcc => "BCC",
        }
    }
}

impl fmt::Display for AddressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mail error types
///
/// Any error returned from composing or sending means the email was not sent.
#[derive(Error, Debug)]
pub enum MailError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Email template {0} not found")]
    TemplateNotFound(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Empty content: {0}")]
    EmptyContent(String),

    #[error("{field} address {reason}")]
    InvalidAddress {
        field: AddressField,
        reason: String,
    },

    #[error("Email sending error: {0}")]
    DeliveryFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl MailError {
    pub(crate) fn invalid_address(field: AddressField, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            field,
            reason: reason.into(),
        }
    }

    /// Short machine-readable kind, used as a log/metric label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::TemplateNotFound(_) => "template_not_found",
            Self::InvalidTemplate(_) => "invalid_template",
            Self::EmptyContent(_) => "empty_content",
            Self::InvalidAddress { .. } => "invalid_address",
            Self::DeliveryFailed(_) => "delivery_failed",
            Self::Io(_) => "io",
            Self::Internal(_) => "internal",
        }
    }
}

// Conversion from validation errors
impl From<validator::ValidationErrors> for MailError {
    fn from(errors: validator::ValidationErrors) -> Self {
        MailError::Configuration(errors.to_string())
    }
}
