//! Configuration management for Mailcraft

use crate::domain::email::{
    default_google_token_url, default_mailer_name, default_sendmail_args, default_sendmail_path,
};
use crate::domain::{BackendConfig, GmailConfig, NativeMailConfig, SmtpConfig, SmtpSecurity};
use crate::error::{MailError, Result as MailResult};
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Default prefix of out (layout) templates
pub const DEFAULT_OUTER_TEMPLATE_PREFIX: &str = "out_";

/// Default template file extension
pub const DEFAULT_TEMPLATE_EXTENSION: &str = "htm";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Template lookup and rendering
    pub formatter: FormatterConfig,
    /// Delivery backend
    pub backend: BackendConfig,
    /// Logging
    pub telemetry: TelemetryConfig,
}

/// Template lookup configuration
#[derive(Debug, Clone, PartialEq)]
pub struct FormatterConfig {
    /// Directory holding the root templates and locale subdirectories
    pub template_dir: PathBuf,
    /// Preferred locale, blank for none
    pub locale: String,
    /// Locale tried when `locale` has no match, blank for none
    pub default_locale: String,
    pub outer_template_prefix: String,
    /// Template file extension without the dot
    pub template_extension: String,
    /// Passed through to the renderer on init
    pub renderer_options: HashMap<String, String>,
}

impl FormatterConfig {
    /// Create a formatter config; the template directory must exist.
    pub fn new(template_dir: impl Into<PathBuf>) -> MailResult<Self> {
        let config = Self {
            template_dir: template_dir.into(),
            locale: String::new(),
            default_locale: String::new(),
            outer_template_prefix: DEFAULT_OUTER_TEMPLATE_PREFIX.to_string(),
            template_extension: DEFAULT_TEMPLATE_EXTENSION.to_string(),
            renderer_options: HashMap::new(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_default_locale(mut self, default_locale: impl Into<String>) -> Self {
        self.default_locale = default_locale.into();
        self
    }

    pub fn with_outer_template_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.outer_template_prefix = prefix.into();
        self
    }

    pub fn with_template_extension(mut self, extension: impl Into<String>) -> Self {
        self.template_extension = extension.into();
        self
    }

    pub fn with_renderer_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.renderer_options.insert(key.into(), value.into());
        self
    }

    /// Check the template directory is set and exists
    pub fn validate(&self) -> MailResult<()> {
        if self.template_dir.as_os_str().is_empty() {
            return Err(MailError::Configuration(
                "Templates path is not set".to_string(),
            ));
        }
        if !self.template_dir.is_dir() {
            return Err(MailError::Configuration(format!(
                "Templates path {} is not a directory",
                self.template_dir.display()
            )));
        }
        if self.template_extension.trim().is_empty() {
            return Err(MailError::Configuration(
                "Template extension can not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    /// "text" or "json"
    pub log_format: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let template_dir = var("MAILER_TEMPLATE_DIR").context("MAILER_TEMPLATE_DIR is required")?;

        let formatter = FormatterConfig {
            template_dir: PathBuf::from(template_dir),
            locale: var("MAILER_LOCALE").unwrap_or_default(),
            default_locale: var("MAILER_DEFAULT_LOCALE").unwrap_or_default(),
            // an explicitly empty prefix is allowed
            outer_template_prefix: lookup("MAILER_OUTER_TEMPLATE_PREFIX")
                .unwrap_or_else(|| DEFAULT_OUTER_TEMPLATE_PREFIX.to_string()),
            template_extension: var("MAILER_TEMPLATE_EXTENSION")
                .unwrap_or_else(|| DEFAULT_TEMPLATE_EXTENSION.to_string()),
            renderer_options: HashMap::new(),
        };
        formatter.validate()?;

        let backend_type = var("MAILER_BACKEND").unwrap_or_else(|| "null".to_string());
        let backend = match backend_type.to_ascii_lowercase().as_str() {
            "null" | "log" => BackendConfig::Null,
            "smtp" => {
                let auth = var("SMTP_AUTH").map_or(true, |value| parse_flag(&value));
                let secure = var("SMTP_SECURE").is_some_and(|value| parse_flag(&value));
                let security = if secure {
                    SmtpSecurity::from_proto(&var("SMTP_SECURE_PROTO").unwrap_or_default())
                } else {
                    SmtpSecurity::None
                };

                BackendConfig::Smtp(SmtpConfig {
                    host: var("SMTP_HOST").context("SMTP_HOST is required for the smtp backend")?,
                    port: var("SMTP_PORT")
                        .unwrap_or_else(|| "25".to_string())
                        .parse()
                        .context("Invalid SMTP_PORT")?,
                    auth,
                    username: var("SMTP_USERNAME"),
                    password: var("SMTP_PASSWORD"),
                    security,
                })
            }
            "gmail" => BackendConfig::Gmail(GmailConfig {
                client_id: var("GMAIL_CLIENT_ID").context("GMAIL_CLIENT_ID is required")?,
                client_secret: var("GMAIL_CLIENT_SECRET")
                    .context("GMAIL_CLIENT_SECRET is required")?,
                refresh_token: var("GMAIL_REFRESH_TOKEN")
                    .context("GMAIL_REFRESH_TOKEN is required")?,
                email: var("GMAIL_EMAIL").context("GMAIL_EMAIL is required")?,
                token_url: var("GMAIL_TOKEN_URL").unwrap_or_else(default_google_token_url),
            }),
            "native" | "sendmail" => BackendConfig::Native(NativeMailConfig {
                sendmail_path: var("SENDMAIL_PATH").unwrap_or_else(default_sendmail_path),
                sendmail_args: var("SENDMAIL_ARGS")
                    .map(|args| args.split_whitespace().map(str::to_string).collect())
                    .unwrap_or_else(default_sendmail_args),
                mailer_name: var("MAILER_NAME").unwrap_or_else(default_mailer_name),
            }),
            other => bail!("Unknown MAILER_BACKEND: {}", other),
        };

        Ok(Self {
            formatter,
            backend,
            telemetry: TelemetryConfig {
                log_format: var("LOG_FORMAT").unwrap_or_else(|| "text".to_string()),
            },
        })
    }
}

/// Parse yes/no style flags (`y`, `yes`, `true`, `1`, `on`)
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "y" | "yes" | "true" | "1" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn template_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_formatter_config_defaults() {
        let dir = template_dir();
        let config = FormatterConfig::new(dir.path()).unwrap();

        assert_eq!(config.outer_template_prefix, "out_");
        assert_eq!(config.template_extension, "htm");
        assert!(config.locale.is_empty());
        assert!(config.default_locale.is_empty());
    }

    #[test]
    fn test_formatter_config_requires_directory() {
        let err = FormatterConfig::new("/no/such/templates").unwrap_err();
        assert!(matches!(err, MailError::Configuration(_)));

        let err = FormatterConfig::new("").unwrap_err();
        assert!(err.to_string().contains("not set"));
    }

    #[test]
    fn test_formatter_config_builders() {
        let dir = template_dir();
        let config = FormatterConfig::new(dir.path())
            .unwrap()
            .with_locale("de")
            .with_default_locale("en")
            .with_outer_template_prefix("layout_")
            .with_template_extension("html")
            .with_renderer_option("compiledir", "/tmp");

        assert_eq!(config.locale, "de");
        assert_eq!(config.default_locale, "en");
        assert_eq!(config.outer_template_prefix, "layout_");
        assert_eq!(config.template_extension, "html");
        assert_eq!(config.renderer_options["compiledir"], "/tmp");
    }

    #[test]
    fn test_from_lookup_null_backend() {
        let dir = template_dir();
        let path = dir.path().to_str().unwrap();
        let config = Config::from_lookup(lookup_from(&[
            ("MAILER_TEMPLATE_DIR", path),
            ("MAILER_LOCALE", "de"),
            ("MAILER_DEFAULT_LOCALE", "en"),
        ]))
        .unwrap();

        assert_eq!(config.backend, BackendConfig::Null);
        assert_eq!(config.formatter.locale, "de");
        assert_eq!(config.formatter.default_locale, "en");
        assert_eq!(config.telemetry.log_format, "text");
    }

    #[test]
    fn test_from_lookup_requires_template_dir() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("MAILER_TEMPLATE_DIR"));
    }

    #[test]
    fn test_from_lookup_smtp_backend() {
        let dir = template_dir();
        let path = dir.path().to_str().unwrap();
        let config = Config::from_lookup(lookup_from(&[
            ("MAILER_TEMPLATE_DIR", path),
            ("MAILER_BACKEND", "smtp"),
            ("SMTP_HOST", "mail.example.com"),
            ("SMTP_PORT", "465"),
            ("SMTP_USERNAME", "user"),
            ("SMTP_PASSWORD", "secret"),
            ("SMTP_SECURE", "yes"),
            ("SMTP_SECURE_PROTO", "ssl"),
        ]))
        .unwrap();

        match config.backend {
            BackendConfig::Smtp(smtp) => {
                assert_eq!(smtp.host, "mail.example.com");
                assert_eq!(smtp.port, 465);
                assert!(smtp.auth);
                assert_eq!(smtp.username.as_deref(), Some("user"));
                assert_eq!(smtp.security, SmtpSecurity::Tls);
            }
            other => panic!("unexpected backend {:?}", other),
        }
    }

    #[test]
    fn test_from_lookup_smtp_auth_off() {
        let dir = template_dir();
        let path = dir.path().to_str().unwrap();
        let config = Config::from_lookup(lookup_from(&[
            ("MAILER_TEMPLATE_DIR", path),
            ("MAILER_BACKEND", "smtp"),
            ("SMTP_HOST", "localhost"),
            ("SMTP_AUTH", "no"),
        ]))
        .unwrap();

        match config.backend {
            BackendConfig::Smtp(smtp) => {
                assert!(!smtp.auth);
                assert_eq!(smtp.port, 25);
                assert_eq!(smtp.security, SmtpSecurity::None);
            }
            other => panic!("unexpected backend {:?}", other),
        }
    }

    #[test]
    fn test_from_lookup_invalid_port() {
        let dir = template_dir();
        let path = dir.path().to_str().unwrap();
        let err = Config::from_lookup(lookup_from(&[
            ("MAILER_TEMPLATE_DIR", path),
            ("MAILER_BACKEND", "smtp"),
            ("SMTP_HOST", "localhost"),
            ("SMTP_PORT", "not-a-port"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SMTP_PORT"));
    }

    #[test]
    fn test_from_lookup_gmail_backend() {
        let dir = template_dir();
        let path = dir.path().to_str().unwrap();
        let config = Config::from_lookup(lookup_from(&[
            ("MAILER_TEMPLATE_DIR", path),
            ("MAILER_BACKEND", "gmail"),
            ("GMAIL_CLIENT_ID", "client"),
            ("GMAIL_CLIENT_SECRET", "secret"),
            ("GMAIL_REFRESH_TOKEN", "refresh"),
            ("GMAIL_EMAIL", "sender@gmail.com"),
        ]))
        .unwrap();

        assert_eq!(config.backend.backend_type(), "gmail");
    }

    #[test]
    fn test_from_lookup_native_backend() {
        let dir = template_dir();
        let path = dir.path().to_str().unwrap();
        let config = Config::from_lookup(lookup_from(&[
            ("MAILER_TEMPLATE_DIR", path),
            ("MAILER_BACKEND", "native"),
            ("MAILER_NAME", "Acme Mailer"),
        ]))
        .unwrap();

        match config.backend {
            BackendConfig::Native(native) => {
                assert_eq!(native.sendmail_path, "/usr/sbin/sendmail");
                assert_eq!(native.mailer_name, "Acme Mailer");
            }
            other => panic!("unexpected backend {:?}", other),
        }
    }

    #[test]
    fn test_from_lookup_unknown_backend() {
        let dir = template_dir();
        let path = dir.path().to_str().unwrap();
        let err = Config::from_lookup(lookup_from(&[
            ("MAILER_TEMPLATE_DIR", path),
            ("MAILER_BACKEND", "pigeon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("pigeon"));
    }

    #[test]
    fn test_parse_flag() {
        for yes in ["y", "yes", "true", "1", "ON"] {
            assert!(parse_flag(yes), "{}", yes);
        }
        for no in ["n", "no", "false", "0", ""] {
            assert!(!parse_flag(no), "{}", no);
        }
    }

    #[test]
    fn test_telemetry_config_default() {
        assert_eq!(TelemetryConfig::default().log_format, "text");
    }
}
