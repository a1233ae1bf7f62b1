use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::{Notifier, NotifyError};
use crate::api::ApiError;
use crate::config::EmailSettings;
use crate::report::Document;

const MAILGUN_API_BASE: &str = "https://api.mailgun.net/v3";

/// Send timeout in seconds.
const SEND_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SendResponse {
    id: String,
    message: String,
}

/// Sends documents as HTML mail through the Mailgun messages API.
#[derive(Clone)]
pub struct MailgunNotifier {
    client: Client,
    api_key: String,
    domain: String,
    sender: String,
}

impl MailgunNotifier {
    pub fn new(api_key: &str, domain: &str, sender: &str) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            domain: domain.to_string(),
            sender: sender.to_string(),
        })
    }

    /// `None` when no API key is configured.
    pub fn from_settings(email: &EmailSettings) -> Result<Option<Self>, NotifyError> {
        match email.mailgun_api_key.as_deref() {
            Some(key) => Self::new(key, &email.mailgun_domain, &email.sender).map(Some),
            None => Ok(None),
        }
    }

    pub fn messages_url(&self) -> String {
        format!("{}/{}/messages", MAILGUN_API_BASE, self.domain)
    }

    fn form<'a>(
        &'a self,
        document: &'a Document,
        recipients: &'a [String],
    ) -> Vec<(&'static str, &'a str)> {
        let mut form = vec![
            ("from", self.sender.as_str()),
            ("subject", document.subject.as_str()),
            ("html", document.html.as_str()),
        ];
        form.extend(recipients.iter().map(|r| ("to", r.as_str())));
        form
    }
}

#[async_trait]
impl Notifier for MailgunNotifier {
    async fn notify(&self, document: &Document, recipients: &[String]) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth("api", Some(&self.api_key))
            .form(&self.form(document, recipients))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body: ApiError::truncate_body(&body),
            });
        }

        let sent: SendResponse = serde_json::from_str(&body).unwrap_or_default();
        info!(
            subject = %document.subject,
            recipients = recipients.len(),
            id = %sent.id,
            response = %sent.message,
            "Sent report"
        );
        Ok(())
    }
}
