//! Local submission through a sendmail-compatible program

use super::address::bare_address;
use super::provider::EmailBackend;
use crate::domain::{Address, ComposedMessage, Envelope, NativeMailConfig};
use crate::error::{MailError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Pipes a raw message into `sendmail_path sendmail_args... -f<from>`.
/// A non-zero exit status means the message was not accepted. No retries.
pub struct NativeMailer {
    config: NativeMailConfig,
}

impl NativeMailer {
    pub fn new(config: NativeMailConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NativeMailConfig {
        &self.config
    }

    /// Header block, CRLF separated, without the terminating blank line
    pub(crate) fn build_headers(
        &self,
        envelope: &Envelope,
        message: &ComposedMessage,
        as_plain_text: bool,
    ) -> String {
        let mut headers = vec![
            format!("To: {}", address_header(&envelope.to)),
            format!("Subject: {}", encode_header(&header_text(&message.subject))),
            format!("From: {}", address_header(&envelope.from)),
        ];

        if let Some(reply_to) = envelope.reply_to() {
            headers.push(format!("Reply-To: {}", address_header(reply_to)));
        }
        if let Some(cc) = envelope.cc() {
            headers.push(format!("Cc: {}", address_header(cc)));
        }
        if let Some(bcc) = envelope.bcc() {
            headers.push(format!("Bcc: {}", address_header(bcc)));
        }

        let content_type = if as_plain_text { "text/plain" } else { "text/html" };
        headers.push("MIME-Version: 1.0".to_string());
        headers.push(format!("Content-Type: {}; charset=utf-8", content_type));
        headers.push(format!("X-Mailer: {}", header_text(&self.config.mailer_name)));

        headers.join("\r\n")
    }

    pub(crate) fn build_message(
        &self,
        envelope: &Envelope,
        message: &ComposedMessage,
        as_plain_text: bool,
    ) -> String {
        format!(
            "{}\r\n\r\n{}",
            self.build_headers(envelope, message, as_plain_text),
            message.body
        )
    }

    async fn submit(&self, sender: &str, raw: &str) -> Result<()> {
        let path = &self.config.sendmail_path;

        let mut child = Command::new(path)
            .args(&self.config.sendmail_args)
            .arg(format!("-f{}", sender))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MailError::DeliveryFailed(format!("failed to start {}: {}", path, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(raw.as_bytes()).await {
                // the program may exit before reading everything; its status decides
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(MailError::DeliveryFailed(format!(
                        "failed to write message to {}: {}",
                        path, e
                    )));
                }
            }
        }

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MailError::DeliveryFailed(format!(
                "{} exited with {}: {}",
                path,
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// Envelope sender for `-f`: the bare address of the first From entry
fn envelope_sender(from: &Address) -> &str {
    match from {
        Address::Named { address, .. } => address.trim(),
        Address::Plain(value) => bare_address(value.split(',').next().unwrap_or(value)),
    }
}

/// Header text with line breaks replaced by spaces, so a value can never
/// start a header line of its own
fn header_text(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn address_header(address: &Address) -> String {
    header_text(&address.header_value())
}

/// RFC 2047 encode non-ASCII header text
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

#[async_trait]
impl EmailBackend for NativeMailer {
    async fn send_email(
        &self,
        envelope: &Envelope,
        message: &ComposedMessage,
        as_plain_text: bool,
    ) -> Result<()> {
        let sender = envelope_sender(&envelope.from);
        let raw = self.build_message(envelope, message, as_plain_text);

        debug!(
            target: "mailsend::transport",
            program = %self.config.sendmail_path,
            sender,
            "Submitting message to local mailer"
        );

        if let Err(e) = self.submit(sender, &raw).await {
            error!(target: "mailererror", backend = "native", error = %e, "Email sending failed");
            return Err(e);
        }

        info!(target: "mailsend", to = %envelope.to, subject = %message.subject, "Email handed to local mailer");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "native"
    }
}
