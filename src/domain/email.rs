//! Email delivery domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Delivery backend configuration - one variant per backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Log-only backend, nothing leaves the process
    #[default]
    Null,

    /// Generic SMTP relay
    Smtp(SmtpConfig),

    /// Gmail SMTP authenticated with an OAuth refresh token
    Gmail(GmailConfig),

    /// Local sendmail-compatible submission program
    Native(NativeMailConfig),
}

impl BackendConfig {
    /// Get the backend type as a string
    pub fn backend_type(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Smtp(_) => "smtp",
            Self::Gmail(_) => "gmail",
            Self::Native(_) => "native",
        }
    }
}

/// Transport security for the SMTP backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SmtpSecurity {
    /// Plain connection
    #[default]
    None,
    /// Upgrade with STARTTLS
    StartTls,
    /// Implicit TLS from the first byte
    Tls,
}

impl SmtpSecurity {
    /// Map the `tls`/`ssl` protocol names used in mail configs
    pub fn from_proto(proto: &str) -> Self {
        match proto.trim().to_ascii_lowercase().as_str() {
            "ssl" | "smtps" => Self::Tls,
            _ => Self::StartTls,
        }
    }
}

/// SMTP configuration for email sending
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct SmtpConfig {
    /// SMTP server host
    #[validate(length(min = 1, max = 255))]
    pub host: String,

    /// SMTP server port (typically 587 for STARTTLS, 465 for TLS, 25 for unencrypted)
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Authenticate with username/password
    #[serde(default = "default_true")]
    pub auth: bool,

    pub username: Option<String>,

    pub password: Option<String>,

    #[serde(default)]
    pub security: SmtpSecurity,
}

/// Gmail OAuth configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct GmailConfig {
    #[validate(length(min = 1))]
    pub client_id: String,

    #[validate(length(min = 1))]
    pub client_secret: String,

    /// Long-lived refresh token issued for the sending account
    #[validate(length(min = 1))]
    pub refresh_token: String,

    /// Sending account, used as the XOAUTH2 user name
    #[validate(email)]
    pub email: String,

    /// Token endpoint, overridable for tests
    #[serde(default = "default_google_token_url")]
    pub token_url: String,
}

/// Native sendmail-style submission configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct NativeMailConfig {
    #[validate(length(min = 1))]
    #[serde(default = "default_sendmail_path")]
    pub sendmail_path: String,

    /// Arguments placed before the `-f{from}` envelope sender flag
    #[serde(default = "default_sendmail_args")]
    pub sendmail_args: Vec<String>,

    /// Value of the X-Mailer header
    #[serde(default = "default_mailer_name")]
    pub mailer_name: String,
}

impl Default for NativeMailConfig {
    fn default() -> Self {
        Self {
            sendmail_path: default_sendmail_path(),
            sendmail_args: default_sendmail_args(),
            mailer_name: default_mailer_name(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_smtp_port() -> u16 {
    25
}

pub(crate) fn default_google_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

pub(crate) fn default_sendmail_path() -> String {
    "/usr/sbin/sendmail".to_string()
}

pub(crate) fn default_sendmail_args() -> Vec<String> {
    vec!["-t".to_string(), "-i".to_string()]
}

pub(crate) fn default_mailer_name() -> String {
    "Mailcraft Mailer".to_string()
}

/// Email address, either a bare string or a display name + address pair.
///
/// A bare string is taken verbatim and may itself be `Name <a@b.com>` or a
/// comma separated list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Address {
    Plain(String),
    Named { name: String, address: String },
}

impl Address {
    pub fn named(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self::Named {
            name: name.into(),
            address: address.into(),
        }
    }

    /// The address part (the whole string for a bare address)
    pub fn address(&self) -> &str {
        match self {
            Self::Plain(s) => s,
            Self::Named { address, .. } => address,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::Plain(_) => None,
            Self::Named { name, .. } => Some(name),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.address().trim().is_empty()
    }

    /// Render for a message header: bare strings as-is, pairs as `name<address>`
    pub fn header_value(&self) -> String {
        match self {
            Self::Plain(s) => s.clone(),
            Self::Named { name, address } => format!("{}<{}>", name, address),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header_value())
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::Plain(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self::Plain(value)
    }
}

/// Recipient and sender metadata for one send
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub to: Address,
    pub from: Address,
    pub reply_to: Option<Address>,
    pub cc: Option<Address>,
    pub bcc: Option<Address>,
}

impl Envelope {
    pub fn new(to: impl Into<Address>, from: impl Into<Address>) -> Self {
        Self {
            to: to.into(),
            from: from.into(),
            reply_to: None,
            cc: None,
            bcc: None,
        }
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<Address>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    pub fn with_cc(mut self, cc: impl Into<Address>) -> Self {
        self.cc = Some(cc.into());
        self
    }

    pub fn with_bcc(mut self, bcc: impl Into<Address>) -> Self {
        self.bcc = Some(bcc.into());
        self
    }

    /// Optional fields that were given a non-blank value
    pub fn reply_to(&self) -> Option<&Address> {
        self.reply_to.as_ref().filter(|a| !a.is_blank())
    }

    pub fn cc(&self) -> Option<&Address> {
        self.cc.as_ref().filter(|a| !a.is_blank())
    }

    pub fn bcc(&self) -> Option<&Address> {
        self.bcc.as_ref().filter(|a| !a.is_blank())
    }
}

/// Finished subject + body pair ready for a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    pub subject: String,
    pub body: String,
}

impl ComposedMessage {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}
