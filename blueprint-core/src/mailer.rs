//! Outbound mail: a single message with one PDF attachment per call.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use thiserror::Error;

use crate::config::{MailConfig, MailSecurity};

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("No sender address configured")]
    MissingSender,

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

/// A rendered artifact on its way to one recipient.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attachment_name: String,
    pub attachment: Vec<u8>,
}

/// Abstraction over mail transports. Implementations must not retry.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, delivery: Delivery) -> Result<(), MailError>;

    fn name(&self) -> &str;
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| MailError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Build the MIME message: plain-text body plus a PDF attachment.
pub fn build_message(from: &str, delivery: &Delivery) -> Result<Message, MailError> {
    let pdf = ContentType::parse("application/pdf").map_err(|e| MailError::Build(e.to_string()))?;

    Message::builder()
        .from(parse_mailbox(from)?)
        .to(parse_mailbox(&delivery.recipient)?)
        .subject(delivery.subject.clone())
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(delivery.body.clone()))
                .singlepart(
                    Attachment::new(delivery.attachment_name.clone())
                        .body(delivery.attachment.clone(), pdf),
                ),
        )
        .map_err(|e| MailError::Build(e.to_string()))
}

// ============================================================================
// SmtpMailer
// ============================================================================

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    host: String,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let from = config.resolved_from().ok_or(MailError::MissingSender)?;
        // Fail at start-up rather than on the first finalize.
        parse_mailbox(&from)?;

        let builder = match config.security {
            MailSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailError::Transport(e.to_string()))?,
            MailSecurity::Starttls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .map_err(|e| MailError::Transport(e.to_string()))?
            }
            MailSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            }
        };

        let mut builder = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_seconds)));

        if let (Some(user), Some(pass)) = (config.resolved_username(), config.resolved_password()) {
            builder = builder.credentials(Credentials::new(user, pass));
        } else {
            tracing::warn!(host = %config.host, "SMTP credentials not configured; sending unauthenticated");
        }

        Ok(Self {
            transport: builder.build(),
            from,
            host: config.host.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, delivery: Delivery) -> Result<(), MailError> {
        let message = build_message(&self.from, &delivery)?;

        self.transport.send(message).await.map_err(|e| {
            tracing::error!(host = %self.host, error = %e, "SMTP delivery failed");
            MailError::Transport(e.to_string())
        })?;

        tracing::info!(
            recipient = %delivery.recipient,
            bytes = delivery.attachment.len(),
            "Blueprint mailed"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "smtp"
    }
}
