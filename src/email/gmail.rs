//! Gmail SMTP backend authenticated with OAuth2 (XOAUTH2)

use super::provider::EmailBackend;
use super::retry::RetryPolicy;
use super::smtp::{build_message, deliver_with_retry, LettreTransport, MailTransport};
use crate::domain::{ComposedMessage, Envelope, GmailConfig};
use crate::error::{MailError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use lettre::{
    transport::smtp::authentication::{Credentials, Mechanism},
    AsyncSmtpTransport, Tokio1Executor,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const GMAIL_SMTP_HOST: &str = "smtp.gmail.com";
pub const GMAIL_SMTP_PORT: u16 = 465;

/// Seconds before expiry at which a cached token is refreshed
const EXPIRY_BUFFER_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| Utc::now() + Duration::seconds(EXPIRY_BUFFER_SECS) >= exp)
    }
}

/// Exchanges the long-lived refresh token for short-lived access tokens,
/// caching the current one until shortly before it expires.
pub struct GoogleTokenClient {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    cached: Mutex<Option<AccessToken>>,
}

impl GoogleTokenClient {
    pub fn new(config: &GmailConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            cached: Mutex::new(None),
        }
    }

    /// Current access token, refreshed when missing or about to expire
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.value.clone());
        }

        let token = self.refresh().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn refresh(&self) -> Result<AccessToken> {
        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", self.refresh_token.as_str());
        params.insert("client_id", self.client_id.as_str());
        params.insert("client_secret", self.client_secret.as_str());

        debug!(target: "mailsend::transport", token_url = %self.token_url, "Refreshing OAuth access token");

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| MailError::DeliveryFailed(format!("OAuth token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let reason = match response.json::<ErrorResponse>().await {
                Ok(error) if error.error_description.is_empty() => error.error,
                Ok(error) => format!("{}: {}", error.error, error.error_description),
                Err(_) => status.to_string(),
            };
            return Err(MailError::DeliveryFailed(format!(
                "OAuth token refresh rejected: {}",
                reason
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            MailError::DeliveryFailed(format!("Invalid OAuth token response: {}", e))
        })?;

        Ok(AccessToken {
            value: token.access_token,
            expires_at: token
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(i64::from(secs))),
        })
    }
}

/// Sends through Gmail's SMTP relay, authenticating as the configured account
pub struct GmailMailer {
    email: String,
    tokens: GoogleTokenClient,
    transport: Option<Arc<dyn MailTransport>>,
    retry: RetryPolicy,
}

impl GmailMailer {
    pub fn from_config(config: &GmailConfig) -> Result<Self> {
        Ok(Self {
            email: config.email.clone(),
            tokens: GoogleTokenClient::new(config),
            transport: None,
            retry: RetryPolicy::default(),
        })
    }

    /// Use a fixed transport instead of connecting to Gmail; the access token
    /// is still obtained on every send
    pub fn with_transport(mut self, transport: Arc<dyn MailTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn connect(&self, access_token: String) -> Result<Arc<dyn MailTransport>> {
        if let Some(transport) = &self.transport {
            return Ok(transport.clone());
        }

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(GMAIL_SMTP_HOST)
            .map_err(|e| MailError::Configuration(e.to_string()))?
            .port(GMAIL_SMTP_PORT)
            .authentication(vec![Mechanism::Xoauth2])
            .credentials(Credentials::new(self.email.clone(), access_token))
            .build();

        Ok(Arc::new(LettreTransport::new(transport)))
    }
}

#[async_trait]
impl EmailBackend for GmailMailer {
    async fn send_email(
        &self,
        envelope: &Envelope,
        message: &ComposedMessage,
        as_plain_text: bool,
    ) -> Result<()> {
        let email = build_message(envelope, message, as_plain_text)?;
        let access_token = self.tokens.access_token().await?;
        let transport = self.connect(access_token)?;

        deliver_with_retry(transport.as_ref(), &self.retry, self.backend_name(), email).await?;

        info!(target: "mailsend", to = %envelope.to, subject = %message.subject, "Email sent via Gmail");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "gmail"
    }
}
