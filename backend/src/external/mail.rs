//! Outgoing mail
//!
//! [`Mailer`] is the seam the notifier sends through. [`SmtpMailer`] delivers
//! over SMTP with lettre, [`LogMailer`] drops messages when mail is disabled,
//! and [`MemoryMailer`] records them for tests.

use std::collections::BTreeSet;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Message could not be built: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Transport(String),
}

/// A recipient or sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAddress {
    pub name: Option<String>,
    pub email: String,
}

impl MailAddress {
    pub fn new(name: Option<String>, email: impl Into<String>) -> Self {
        Self {
            name,
            email: email.into(),
        }
    }
}

/// A file attached to a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// One message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: MailAddress,
    /// Display name of the sender; the envelope address is the site's
    pub from_name: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
    pub attachment: Option<MailAttachment>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

// ============================================================================
// SMTP
// ============================================================================

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: Address,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| MailError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };
        let mut builder = builder.port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from_address = parse_address(&config.from_address)?;

        Ok(Self {
            transport: builder.build(),
            from_address,
        })
    }

    fn build_message(&self, mail: OutgoingMail) -> Result<Message, MailError> {
        let from = Mailbox::new(Some(mail.from_name.clone()), self.from_address.clone());
        let to = Mailbox::new(mail.to.name.clone(), parse_address(&mail.to.email)?);

        let body = match mail.html {
            Some(html) => MultiPart::alternative_plain_html(mail.text, html),
            None => MultiPart::mixed().singlepart(SinglePart::plain(mail.text)),
        };

        let body = match mail.attachment {
            Some(attachment) => {
                let content_type = ContentType::parse(&attachment.content_type)
                    .map_err(|e| MailError::Build(e.to_string()))?;
                MultiPart::mixed()
                    .multipart(body)
                    .singlepart(Attachment::new(attachment.filename).body(attachment.bytes, content_type))
            }
            None => body,
        };

        Message::builder()
            .from(from)
            .to(to)
            .subject(mail.subject)
            .multipart(body)
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

fn parse_address(email: &str) -> Result<Address, MailError> {
    email
        .parse::<Address>()
        .map_err(|_| MailError::InvalidAddress(email.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let message = self.build_message(mail)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// Disabled transport
// ============================================================================

/// Accepts every message and only logs it
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        tracing::info!(to = %mail.to.email, subject = %mail.subject, "Mail disabled, message dropped");
        Ok(())
    }
}

// ============================================================================
// Recording transport
// ============================================================================

/// Records delivered messages; addresses in the reject list fail
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    rejected: BTreeSet<String>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose transport refuses the given addresses
    pub fn rejecting<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sent: Mutex::default(),
            rejected: addresses.into_iter().map(Into::into).collect(),
        }
    }

    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if self.rejected.contains(&mail.to.email) {
            return Err(MailError::Transport(format!("{} refused", mail.to.email)));
        }
        self.sent.lock().await.push(mail);
        Ok(())
    }
}
