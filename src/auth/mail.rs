//! Delivery of sign-in links.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;

/// Sends a magic link to an email address.
#[async_trait]
pub trait MagicLinkSender: Send + Sync {
    async fn send(&self, email: &str, link: &str) -> Result<()>;
}

/// Payload posted to the mail webhook.
#[derive(Debug, Serialize)]
struct MailMessage<'a> {
    to: &'a str,
    subject: &'a str,
    text: String,
    link: &'a str,
}

/// Posts each link as JSON to an HTTP endpoint that sends the email.
pub struct WebhookSender {
    client: Client,
    url: String,
}

impl WebhookSender {
    /// Create a sender posting to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl MagicLinkSender for WebhookSender {
    async fn send(&self, email: &str, link: &str) -> Result<()> {
        let message = MailMessage {
            to: email,
            subject: "Your Campus Dialogue Hub sign-in link",
            text: format!("Sign in to Campus Dialogue Hub by opening this link:\n\n{link}\n\nThe link can be used once."),
            link,
        };

        debug!(email = %email, "Posting magic link to mail webhook");

        self.client
            .post(&self.url)
            .json(&message)
            .send()
            .await
            .context("Failed to reach mail webhook")?
            .error_for_status()
            .context("Mail webhook rejected the message")?;

        Ok(())
    }
}

/// Writes links to the log. Used when no mail webhook is configured.
pub struct LogSender;

#[async_trait]
impl MagicLinkSender for LogSender {
    async fn send(&self, email: &str, link: &str) -> Result<()> {
        info!(email = %email, link = %link, "Magic link issued (no mail webhook configured)");
        Ok(())
    }
}

/// Build the sender selected by configuration.
///
/// # Errors
///
/// Returns an error if the webhook sender cannot be created.
pub fn sender_from_config(config: &Config) -> Result<Arc<dyn MagicLinkSender>> {
    match &config.mail_webhook_url {
        Some(url) => Ok(Arc::new(WebhookSender::new(url)?)),
        None => Ok(Arc::new(LogSender)),
    }
}
