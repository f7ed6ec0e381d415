use crate::config::EmailConfig;
use lettre::message::MultiPart;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

#[derive(Debug)]
pub enum EmailError {
    BuildFailed(String),
    SendFailed(String),
}

impl std::fmt::Display for EmailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmailError::BuildFailed(e) => write!(f, "Failed to build email: {}", e),
            EmailError::SendFailed(e) => write!(f, "Failed to send email: {}", e),
        }
    }
}

impl std::error::Error for EmailError {}

impl From<lettre::error::Error> for EmailError {
    fn from(e: lettre::error::Error) -> Self {
        EmailError::BuildFailed(e.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for EmailError {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        EmailError::SendFailed(e.to_string())
    }
}

pub fn build_message(config: &EmailConfig, plain: String, html: String) -> Result<Message, EmailError> {
    let message = Message::builder()
        .from(config.sender.clone())
        .to(config.receiver.clone())
        .subject(config.subject.as_str())
        .multipart(MultiPart::alternative_plain_html(plain, html))?;

    Ok(message)
}

/// Sends over STARTTLS, logging in with the sender address and its app password.
pub fn send(config: &EmailConfig, message: &Message) -> Result<(), EmailError> {
    let credentials = Credentials::new(config.sender.email.to_string(), config.password.clone());

    let mailer = SmtpTransport::starttls_relay(&config.smtp_host)?
        .port(config.smtp_port)
        .credentials(credentials)
        .build();

    info!(host = %config.smtp_host, port = config.smtp_port, to = %config.receiver, "sending email");
    mailer.send(message)?;

    Ok(())
}
