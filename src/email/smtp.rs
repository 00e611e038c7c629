//! SMTP delivery backend using lettre

use super::provider::EmailBackend;
use super::retry::RetryPolicy;
use crate::domain::{Address, ComposedMessage, Envelope, SmtpConfig, SmtpSecurity};
use crate::error::{AddressField, MailError, Result};
use crate::telemetry::metrics;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Submits a built message. Split out of the backends so retry behaviour can
/// be exercised without an SMTP server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Hand the message to the server, returning the failure text on error
    async fn deliver(&self, message: Message) -> std::result::Result<(), String>;
}

/// [`MailTransport`] backed by a lettre SMTP connection pool
pub struct LettreTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl LettreTransport {
    pub fn new(inner: AsyncSmtpTransport<Tokio1Executor>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl MailTransport for LettreTransport {
    async fn deliver(&self, message: Message) -> std::result::Result<(), String> {
        self.inner
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// SMTP relay backend with bounded retries
pub struct SmtpMailer {
    transport: Arc<dyn MailTransport>,
    retry: RetryPolicy,
}

impl SmtpMailer {
    /// Create a new SMTP backend from configuration
    pub fn from_config(config: &SmtpConfig) -> Result<Self> {
        let mut builder = match config.security {
            SmtpSecurity::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
            SmtpSecurity::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailError::Configuration(e.to_string()))?,
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailError::Configuration(e.to_string()))?,
        };

        builder = builder.port(config.port);

        if config.auth {
            if let Some(username) = &config.username {
                let credentials = Credentials::new(
                    username.clone(),
                    config.password.clone().unwrap_or_default(),
                );
                builder = builder.credentials(credentials);
            }
        }

        debug!(
            target: "mailsend::transport",
            host = %config.host,
            port = config.port,
            security = ?config.security,
            auth = config.auth,
            "Configured SMTP transport"
        );

        Ok(Self::with_transport(Arc::new(LettreTransport::new(
            builder.build(),
        ))))
    }

    /// Use a custom transport
    pub fn with_transport(transport: Arc<dyn MailTransport>) -> Self {
        Self {
            transport,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl EmailBackend for SmtpMailer {
    async fn send_email(
        &self,
        envelope: &Envelope,
        message: &ComposedMessage,
        as_plain_text: bool,
    ) -> Result<()> {
        let email = build_message(envelope, message, as_plain_text)?;
        deliver_with_retry(
            self.transport.as_ref(),
            &self.retry,
            self.backend_name(),
            email,
        )
        .await?;

        info!(target: "mailsend", to = %envelope.to, subject = %message.subject, "Email sent via SMTP");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "smtp"
    }
}

/// Submit through `transport`, retrying per `retry`. Exhausting the attempts
/// yields [`MailError::DeliveryFailed`] carrying the last failure.
pub(crate) async fn deliver_with_retry(
    transport: &dyn MailTransport,
    retry: &RetryPolicy,
    backend: &'static str,
    message: Message,
) -> Result<()> {
    let message = &message;

    retry
        .run(|attempt| async move {
            metrics::record_attempt(backend);
            debug!(target: "mailsend::transport", backend, attempt, "Submitting message");
            transport.deliver(message.clone()).await
        })
        .await
        .map_err(|e| {
            error!(
                target: "mailererror",
                backend,
                attempts = retry.max_attempts,
                error = %e,
                "Email sending failed"
            );
            MailError::DeliveryFailed(e)
        })
}

/// Convert an address field to lettre mailboxes. Bare strings may hold a
/// comma separated list and `Name <address>` forms.
fn mailboxes(address: &Address, field: AddressField) -> Result<Vec<Mailbox>> {
    let invalid = |e: lettre::address::AddressError| {
        MailError::invalid_address(field, format!("has wrong format: {}", e))
    };

    match address {
        Address::Named { name, address } => {
            let name = Some(name.trim().to_string()).filter(|n| !n.is_empty());
            let address = address.trim().parse().map_err(invalid)?;
            Ok(vec![Mailbox::new(name, address)])
        }
        Address::Plain(value) => value
            .split(',')
            .map(|element| element.trim().parse::<Mailbox>().map_err(invalid))
            .collect(),
    }
}

/// Build a MIME message: HTML with a generated plain-text alternative, or a
/// single text/plain part when `as_plain_text` is set.
pub(crate) fn build_message(
    envelope: &Envelope,
    message: &ComposedMessage,
    as_plain_text: bool,
) -> Result<Message> {
    let from = mailboxes(&envelope.from, AddressField::From)?;
    let mut builder = Message::builder().subject(message.subject.clone());

    if let Some(sender) = from.first() {
        builder = builder.sender(sender.clone());
    }
    for mailbox in from {
        builder = builder.from(mailbox);
    }
    for mailbox in mailboxes(&envelope.to, AddressField::Email)? {
        builder = builder.to(mailbox);
    }
    if let Some(reply_to) = envelope.reply_to() {
        for mailbox in mailboxes(reply_to, AddressField::ReplyTo)? {
            builder = builder.reply_to(mailbox);
        }
    }
    if let Some(cc) = envelope.cc() {
        for mailbox in mailboxes(cc, AddressField::Cc)? {
            builder = builder.cc(mailbox);
        }
    }
    if let Some(bcc) = envelope.bcc() {
        for mailbox in mailboxes(bcc, AddressField::Bcc)? {
            builder = builder.bcc(mailbox);
        }
    }

    let email = if as_plain_text {
        builder
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
    } else {
        let text_body =
            htmd::convert(&message.body).unwrap_or_else(|_| message.body.clone());
        builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(text_body),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(message.body.clone()),
                ),
        )
    };

    email.map_err(|e| MailError::DeliveryFailed(format!("failed to build email: {}", e)))
}
