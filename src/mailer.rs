//! Outbound email.
//!
//! The contact handler talks to a [`Mailer`] trait object so tests can
//! substitute a recording double; [`SmtpMailer`] is the production
//! implementation on lettre's async SMTP transport. Port 587 gets a
//! STARTTLS upgrade plus credential login; any other port is treated as a
//! plain relay (local dev against a capture server).

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;

/// Sends a plain-text email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// SMTP mailer configured from `[smtp]`.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        if config.host.is_empty() {
            anyhow::bail!("smtp.host must not be empty");
        }

        let transport = if config.port == 587 {
            let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .with_context(|| format!("Invalid SMTP relay host: {}", config.host))?
                .port(config.port)
                .timeout(Some(config.timeout()));

            if let Some(credentials) = &config.credentials {
                let (user, password) = credentials
                    .split_once(':')
                    .context("smtp.credentials must be 'user:password'")?;
                builder = builder.credentials(Credentials::new(
                    user.to_string(),
                    password.to_string(),
                ));
            }

            builder.build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .timeout(Some(config.timeout()))
                .build()
        };

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let from: Mailbox = self
            .from
            .parse()
            .with_context(|| format!("Invalid from address: {}", self.from))?;
        let to: Mailbox = to
            .parse()
            .with_context(|| format!("Invalid recipient address: {}", to))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .context("Failed to build email message")?;

        self.transport
            .send(message)
            .await
            .context("SMTP send failed")?;

        tracing::info!(subject, "contact email sent");
        Ok(())
    }
}
