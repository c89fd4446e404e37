//! Email templates and the SMTP mail transport

use async_trait::async_trait;
use chrono::NaiveDate;
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
    models::LoanNotice,
};

/// A message ready to be handed to a mail transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    /// Confirmation sent once a loan has been recorded
    pub fn loan_confirmation(notice: &LoanNotice) -> Self {
        Self {
            to: notice.email.clone(),
            subject: "Book Loaned Successfully".to_string(),
            body: format!(
                "Hello {username},\n\nYou have successfully loaned \"{title}\".\nPlease return it by the due date ({due_date}).",
                username = notice.username,
                title = notice.book_title,
                due_date = notice.due_date,
            ),
        }
    }

    /// Reminder for a loan `overdue_days` past its due date
    pub fn overdue_reminder(notice: &LoanNotice, overdue_days: i64) -> Self {
        Self {
            to: notice.email.clone(),
            subject: "Overdue Loan".to_string(),
            body: format!(
                "Hello {username},\n\nThe book \"{title}\" was due on {due_date} and is overdue by {overdue_days} {unit}.\nPlease return it as soon as possible.",
                username = notice.username,
                title = notice.book_title,
                due_date = notice.due_date,
                overdue_days = overdue_days,
                unit = if overdue_days == 1 { "day" } else { "days" },
            ),
        }
    }
}

/// Whole days between the due date and `today`
pub fn overdue_days(due_date: NaiveDate, today: NaiveDate) -> i64 {
    (today - due_date).num_days()
}

/// Outbound mail. A send can fail for one recipient without affecting others.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> AppResult<()>;
}

/// SMTP transport using the configured relay and sender address
#[derive(Clone)]
pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, mail: &OutgoingMail) -> AppResult<Message> {
        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or("Lectern Library");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(&mail.to)
            .map_err(|e| AppError::Mail(format!("Invalid to address {}: {}", mail.to, e)))?;

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(mail.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(mail.body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<html><body><p>{}</p></body></html>"#,
                                mail.body.replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))
    }

    fn transport(&self) -> AppResult<SmtpTransport> {
        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Mail(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        Ok(mailer_builder.build())
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> AppResult<()> {
        let message = self.build_message(mail)?;
        let transport = self.transport()?;

        // lettre's SMTP transport blocks on network I/O
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| AppError::Internal(format!("Mail task failed: {}", e)))?
            .map_err(|e| AppError::Mail(format!("Failed to send email: {}", e)))?;

        tracing::debug!(recipient = %mail.to, subject = %mail.subject, "Email sent");
        Ok(())
    }
}
