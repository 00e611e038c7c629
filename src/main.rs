use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mailcraft::{config::Config, telemetry, Address, Envelope, FormatRequest, Mailer};
use tracing::info;

#[derive(Parser)]
#[command(name = "mailcraft")]
#[command(about = "Compose templated emails and send them through the configured backend", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose an email from a template and send it
    Send {
        #[command(flatten)]
        compose: ComposeArgs,
        /// Recipient address, or a comma separated list
        #[arg(long)]
        to: String,
        /// Sender address
        #[arg(long)]
        from: String,
        #[arg(long)]
        reply_to: Option<String>,
        #[arg(long)]
        cc: Option<String>,
        #[arg(long)]
        bcc: Option<String>,
        /// Send the body as text/plain
        #[arg(long)]
        plain: bool,
    },
    /// Print the composed subject and body without sending
    Preview {
        #[command(flatten)]
        compose: ComposeArgs,
    },
}

#[derive(Args)]
struct ComposeArgs {
    /// Template name
    #[arg(short, long)]
    template: String,
    /// Template variable as key=value, repeatable
    #[arg(long = "var", value_parser = parse_var)]
    vars: Vec<(String, String)>,
    /// Locale overriding MAILER_LOCALE
    #[arg(short, long)]
    locale: Option<String>,
    /// Out template to wrap the body with
    #[arg(long)]
    outer: Option<String>,
    /// Do not wrap the body in an out template
    #[arg(long, conflicts_with = "outer")]
    no_outer: bool,
}

impl ComposeArgs {
    fn request(&self) -> FormatRequest {
        let mut request = FormatRequest::new(self.template.clone())
            .with_data(self.vars.iter().cloned().collect());

        if self.no_outer {
            request = request.without_outer_template();
        } else if let Some(outer) = &self.outer {
            request = request.with_outer_template(outer.clone());
        }

        request
    }
}

fn parse_var(value: &str) -> std::result::Result<(String, String), String> {
    value
        .split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got `{}`", value))
}

fn optional(value: Option<String>) -> Option<Address> {
    value.map(Address::from)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    telemetry::init(&config.telemetry);

    let mut mailer = Mailer::from_config(&config).context("Failed to initialise mailer")?;

    match cli.command {
        Commands::Send {
            compose,
            to,
            from,
            reply_to,
            cc,
            bcc,
            plain,
        } => {
            if let Some(locale) = &compose.locale {
                mailer.set_locale(locale.clone());
            }

            let mut request = compose.request();
            if plain {
                request = request.as_plain_text();
            }

            let envelope = Envelope {
                reply_to: optional(reply_to),
                cc: optional(cc),
                bcc: optional(bcc),
                ..Envelope::new(to, from)
            };

            mailer.format_and_send(&request, &envelope).await?;
            info!(
                backend = mailer.backend_name(),
                template = %request.template,
                "Email sent"
            );
        }
        Commands::Preview { compose } => {
            if let Some(locale) = &compose.locale {
                mailer.set_locale(locale.clone());
            }

            let message = mailer.compose(&compose.request())?;
            println!("Subject: {}\n\n{}", message.subject, message.body);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var() {
        assert_eq!(
            parse_var("name=John").unwrap(),
            ("name".to_string(), "John".to_string())
        );
        assert_eq!(
            parse_var("url=https://x.com/?a=b").unwrap(),
            ("url".to_string(), "https://x.com/?a=b".to_string())
        );
        assert!(parse_var("name").is_err());
        assert!(parse_var("=John").is_err());
    }

    #[test]
    fn test_cli_compose_request() {
        let cli = Cli::parse_from([
            "mailcraft", "preview", "--template", "contact", "--var", "name=John", "--no-outer",
        ]);
        let Commands::Preview { compose } = cli.command else {
            panic!("expected preview");
        };
        let request = compose.request();
        assert_eq!(request.template, "contact");
        assert_eq!(request.data["name"], "John");
        assert_eq!(request.outer_template_name(), None);
    }

    #[test]
    fn test_cli_rejects_outer_with_no_outer() {
        let result = Cli::try_parse_from([
            "mailcraft", "preview", "--template", "contact", "--outer", "plain", "--no-outer",
        ]);
        assert!(result.is_err());
    }
}
