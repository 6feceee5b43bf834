//! Outgoing e-mail.
//!
//! `SmtpNotifier` delivers through lettre; `OutboxNotifier` keeps messages in
//! memory and only logs them, which is what runs when no SMTP host is set.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::{authentication::Credentials, Error as SmtpError},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use parking_lot::Mutex;
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifierError>;
}

#[derive(Template)]
#[template(path = "email/reset_code.html")]
struct ResetCodeHtml<'a> {
    name: &'a str,
    code: &'a str,
    ttl_minutes: u64,
}

#[derive(Template)]
#[template(path = "email/reset_code.txt")]
struct ResetCodeText<'a> {
    name: &'a str,
    code: &'a str,
    ttl_minutes: u64,
}

/// Render the password reset e-mail for one recipient.
pub fn reset_code_notification(
    to: &str,
    name: &str,
    code: &str,
    ttl_minutes: u64,
) -> Result<Notification, NotifierError> {
    let name = if name.trim().is_empty() { "user" } else { name };
    Ok(Notification {
        to: to.to_string(),
        subject: "Password reset - Smart List".to_string(),
        html: ResetCodeHtml {
            name,
            code,
            ttl_minutes,
        }
        .render()?,
        text: ResetCodeText {
            name,
            code,
            ttl_minutes,
        }
        .render()?,
    })
}

#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifierError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        let from = config
            .from_address
            .parse()
            .map_err(|_| NotifierError::InvalidAddress(config.from_address.clone()))?;

        Ok(SmtpNotifier { mailer, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifierError> {
        let to: Mailbox = notification
            .to
            .parse()
            .map_err(|_| NotifierError::InvalidAddress(notification.to.clone()))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notification.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(notification.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(notification.html.clone()),
                    ),
            )?;

        match self.mailer.send(email).await {
            Ok(_) => {
                log::info!("email sent to {}", notification.to);
                Ok(())
            }
            Err(e) => {
                log::error!("failed to send email to {}: {}", notification.to, e);
                Err(e.into())
            }
        }
    }
}

#[derive(Default)]
pub struct OutboxNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl OutboxNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    pub fn last_to(&self, to: &str) -> Option<Notification> {
        self.sent.lock().iter().rev().find(|n| n.to == to).cloned()
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifierError> {
        log::info!(
            "outbox: \"{}\" to {} (not delivered)",
            notification.subject,
            notification.to
        );
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_email_contains_code_and_escapes_name() {
        let notification =
            reset_code_notification("ana@example.com", "<b>Ana</b>", "123456", 15).unwrap();

        assert_eq!(notification.to, "ana@example.com");
        assert!(notification.html.contains("123456"));
        assert!(notification.html.contains("15 minutes"));
        assert!(!notification.html.contains("<b>Ana</b>"));
        assert!(notification.text.contains("Code: 123456"));
    }

    #[test]
    fn blank_name_falls_back_to_generic_greeting() {
        let notification = reset_code_notification("a@b.c", " ", "654321", 15).unwrap();
        assert!(notification.text.starts_with("Hello, user!"));
    }

    #[actix_web::test]
    async fn outbox_records_deliveries() {
        let outbox = OutboxNotifier::new();
        let notification = reset_code_notification("a@b.c", "A", "111111", 15).unwrap();
        outbox.send(&notification).await.unwrap();

        assert_eq!(outbox.sent().len(), 1);
        assert_eq!(outbox.last_to("a@b.c"), Some(notification));
        assert_eq!(outbox.last_to("other@b.c"), None);
    }
}
