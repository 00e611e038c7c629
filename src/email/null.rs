//! Log-only backend

use super::provider::EmailBackend;
use crate::domain::{Address, ComposedMessage, Envelope};
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Writes every message to the `mailsend` log target instead of delivering it.
/// Useful for development and tests; sending always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMailer;

impl NullMailer {
    pub fn new() -> Self {
        Self
    }
}

fn optional(address: Option<&Address>) -> String {
    address.map(Address::header_value).unwrap_or_default()
}

#[async_trait]
impl EmailBackend for NullMailer {
    async fn send_email(
        &self,
        envelope: &Envelope,
        message: &ComposedMessage,
        as_plain_text: bool,
    ) -> Result<()> {
        info!(
            target: "mailsend",
            to = %envelope.to,
            from = %envelope.from,
            reply_to = %optional(envelope.reply_to()),
            cc = %optional(envelope.cc()),
            bcc = %optional(envelope.bcc()),
            subject = %message.subject,
            plain_text = as_plain_text,
            body = %message.body,
            "Email to {} from {} subject {}",
            envelope.to,
            envelope.from,
            message.subject
        );
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "null"
    }
}
