//! Outbound mail. Delivery is best-effort: callers dispatch and move on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::task::JoinHandle;

use crate::config::Config;

const WELCOME_SUBJECT: &str = "Welcome to Roster.AI - Your Dating Journey Starts Here!";

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_welcome(&self, to: &str, name: &str) -> anyhow::Result<()>;
}

/// Used when no mail endpoint is configured; records the send in the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_welcome(&self, to: &str, name: &str) -> anyhow::Result<()> {
        tracing::info!(to = %to, name = %name, subject = WELCOME_SUBJECT, "Welcome mail (log only)");
        Ok(())
    }
}

/// Posts the message as JSON to an HTTP mail relay.
pub struct WebhookMailer {
    client: reqwest::Client,
    url: String,
    from: String,
}

impl WebhookMailer {
    pub fn new(url: String, from: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, url, from })
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send_welcome(&self, to: &str, name: &str) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "from": self.from,
                "to": to,
                "subject": WELCOME_SUBJECT,
                "html": welcome_html(name),
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Mail relay error {}: {}", status, body);
        }
        Ok(())
    }
}

pub fn from_config(config: &Config) -> Arc<dyn Mailer> {
    match &config.mail_webhook_url {
        Some(url) => match WebhookMailer::new(url.clone(), config.mail_from.clone()) {
            Ok(mailer) => Arc::new(mailer),
            Err(e) => {
                tracing::warn!(error = %e, "Mail relay client unavailable, falling back to log mailer");
                Arc::new(LogMailer)
            }
        },
        None => Arc::new(LogMailer),
    }
}

/// Send the welcome mail on its own task. Failures are logged and go no
/// further; the returned handle exists for tests.
pub fn dispatch_welcome(mailer: Arc<dyn Mailer>, to: String, name: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        match mailer.send_welcome(&to, &name).await {
            Ok(()) => tracing::debug!(to = %to, "Welcome mail sent"),
            Err(e) => tracing::warn!(to = %to, error = %e, "Welcome mail failed"),
        }
    })
}

fn welcome_html(name: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1>THE ROSTER AI</h1>
  <p>DATING IS A MESS &bull; SORT IT OUT</p>
  <h2>Welcome, {name}!</h2>
  <p>You've just joined Roster.AI. Log your dates, rate the chemistry, and let the insights sort out the rest.</p>
  <ul>
    <li>Add your first date</li>
    <li>Upload a photo for an instant vibe read</li>
    <li>Check your insights once you have a few entries</li>
  </ul>
</div>"#,
        name = escape_html(name)
    )
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
