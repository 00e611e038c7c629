//! Pre-send validation of message content and address fields

use crate::domain::{Address, ComposedMessage, Envelope};
use crate::error::{AddressField, MailError, Result};
use regex::Regex;

lazy_static::lazy_static! {
    /// Structural email address pattern
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"(?i)^[_a-z0-9+-]+(\.[_a-z0-9+-]+)*@[a-z0-9-]+(\.[a-z0-9-]+)*(\.[a-z]{2,})$"
    )
    .unwrap();

    /// Address written as `Display Name <address>`, with nothing after the bracket
    static ref BRACKETED_REGEX: Regex = Regex::new(r"^[^<>]*<([^<>]+)>\s*$").unwrap();
}

/// Strip a `Name <address>` wrapper, returning the bare address
pub fn bare_address(value: &str) -> &str {
    match BRACKETED_REGEX.captures(value).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => value.trim(),
    }
}

/// Structural check of a single address
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_REGEX.is_match(bare_address(value))
}

/// Validate one address field. A bare string may be a comma separated list,
/// in which case every element must be non-blank and valid.
pub fn validate_address(address: &Address, field: AddressField) -> Result<()> {
    let value = address.address();

    if value.trim().is_empty() {
        return Err(MailError::invalid_address(field, "can not be empty"));
    }

    if value.contains(',') {
        for element in value.split(',') {
            if element.trim().is_empty() {
                return Err(MailError::invalid_address(
                    field,
                    "list contains an empty element",
                ));
            }
            if !is_valid_email(element) {
                return Err(MailError::invalid_address(field, "has wrong format"));
            }
        }
        return Ok(());
    }

    if !is_valid_email(value) {
        return Err(MailError::invalid_address(field, "has wrong format"));
    }

    Ok(())
}

/// Check that a message can be handed to a backend: subject and body present,
/// every given address field well formed.
pub fn check_arguments(message: &ComposedMessage, envelope: &Envelope) -> Result<()> {
    if message.subject.trim().is_empty() {
        return Err(MailError::EmptyContent(
            "Email subject can not be empty".to_string(),
        ));
    }

    if message.body.trim().is_empty() {
        return Err(MailError::EmptyContent(
            "Email body can not be empty".to_string(),
        ));
    }

    validate_address(&envelope.to, AddressField::Email)?;
    validate_address(&envelope.from, AddressField::From)?;

    if let Some(reply_to) = envelope.reply_to() {
        validate_address(reply_to, AddressField::ReplyTo)?;
    }
    if let Some(cc) = envelope.cc() {
        validate_address(cc, AddressField::Cc)?;
    }
    if let Some(bcc) = envelope.bcc() {
        validate_address(bcc, AddressField::Bcc)?;
    }

    Ok(())
}
