//! Outgoing mail.
//!
//! Delivery itself is an external concern; the server only talks to the
//! [`Mailer`] trait. `LogMailer` writes messages to the log and `Outbox`
//! keeps them in memory.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail delivery to {to} failed: {reason}")]
    Delivery { to: String, reason: String },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<(), MailError>;
}

#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        info!(to = %message.to, subject = %message.subject, "Mail queued\n{}", message.text);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Outbox {
    sent: Mutex<Vec<MailMessage>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<MailMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn last_to(&self, to: &str) -> Option<MailMessage> {
        self.sent.lock().await.iter().rev().find(|m| m.to == to).cloned()
    }
}

#[async_trait]
impl Mailer for Outbox {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        self.sent.lock().await.push(message);
        Ok(())
    }
}
