//! Delivering rendered reports.
//!
//! `NotifyPolicy` decides whether a report goes out at all. A `Notifier`
//! delivers a rendered `Document`: by Mailgun, or to an HTML file when mail
//! is switched off.

pub mod file;
pub mod mailgun;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::EmailSettings;
use crate::models::Report;
use crate::report::Document;

pub use file::FileNotifier;
pub use mailgun::MailgunNotifier;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Mail transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Mail service rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to write report to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, document: &Document, recipients: &[String]) -> Result<(), NotifyError>;
}

/// What to do with one report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Deliver,
    /// The report has no new events.
    SkipNothingNew,
    /// Mail is switched off; the report is written to disk instead.
    SkipDisabled,
    SkipNoRecipients,
}

/// Decides per report whether mail goes out.
#[derive(Debug, Clone, Default)]
pub struct NotifyPolicy {
    pub send_email: bool,
    pub recipients: Vec<String>,
}

impl NotifyPolicy {
    pub fn new(send_email: bool, recipients: Vec<String>) -> Self {
        Self {
            send_email,
            recipients,
        }
    }

    pub fn from_settings(email: &EmailSettings) -> Self {
        Self::new(email.enabled, email.recipients.clone())
    }

    pub fn decide(&self, report: &Report) -> Delivery {
        if !report.has_new_events() {
            Delivery::SkipNothingNew
        } else if !self.send_email {
            Delivery::SkipDisabled
        } else if self.recipients.is_empty() {
            Delivery::SkipNoRecipients
        } else {
            Delivery::Deliver
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Achievement, Behaviour, Child, ChildPhoto, Establishment};

    fn report(behaviour: usize, achievement: usize) -> Report {
        Report {
            child: Child::default(),
            photo: ChildPhoto::Missing,
            school: Establishment::default(),
            behaviour: vec![Behaviour::default(); behaviour],
            achievement: vec![Achievement::default(); achievement],
            teachers: vec![],
            teacher_photos: vec![],
        }
    }

    fn enabled() -> NotifyPolicy {
        NotifyPolicy::new(true, vec!["parent@example.com".to_string()])
    }

    #[test]
    fn test_nothing_new_is_never_sent() {
        assert_eq!(enabled().decide(&report(0, 0)), Delivery::SkipNothingNew);
    }

    #[test]
    fn test_one_kind_of_event_is_enough() {
        assert_eq!(enabled().decide(&report(1, 0)), Delivery::Deliver);
        assert_eq!(enabled().decide(&report(0, 2)), Delivery::Deliver);
    }

    #[test]
    fn test_disabled_and_unaddressed() {
        let disabled = NotifyPolicy::new(false, vec!["parent@example.com".to_string()]);
        assert_eq!(disabled.decide(&report(1, 1)), Delivery::SkipDisabled);

        let nobody = NotifyPolicy::new(true, vec![]);
        assert_eq!(nobody.decide(&report(1, 1)), Delivery::SkipNoRecipients);
    }
}
