//! Email service for confirmation and password-reset mail.
//!
//! Uses SMTP via lettre for delivery with Askama HTML templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// HTML template for the email-confirmation mail.
#[derive(Template)]
#[template(path = "email/confirmation.html")]
struct ConfirmationEmailHtml<'a> {
    confirmation_link: &'a str,
}

/// Plain text template for the email-confirmation mail.
#[derive(Template)]
#[template(path = "email/confirmation.txt")]
struct ConfirmationEmailText<'a> {
    confirmation_link: &'a str,
}

/// HTML template for the password-reset mail.
#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetEmailHtml<'a> {
    reset_link: &'a str,
}

/// Plain text template for the password-reset mail.
#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetEmailText<'a> {
    reset_link: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send the email-confirmation mail with the given link.
    ///
    /// # Errors
    ///
    /// Returns error if the mail fails to send or a template fails to render.
    pub async fn send_confirmation_email(
        &self,
        to: &str,
        confirmation_link: &str,
    ) -> Result<(), EmailError> {
        let html = ConfirmationEmailHtml { confirmation_link }.render()?;
        let text = ConfirmationEmailText { confirmation_link }.render()?;

        self.send_multipart_email(to, "Email Confirmation", &text, &html)
            .await
    }

    /// Send the password-reset mail with the given link.
    ///
    /// # Errors
    ///
    /// Returns error if the mail fails to send or a template fails to render.
    pub async fn send_password_reset_email(
        &self,
        to: &str,
        reset_link: &str,
    ) -> Result<(), EmailError> {
        let html = PasswordResetEmailHtml { reset_link }.render()?;
        let text = PasswordResetEmailText { reset_link }.render()?;

        self.send_multipart_email(to, "Reset Password", &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_template_embeds_link() {
        let html = ConfirmationEmailHtml {
            confirmation_link: "http://localhost:5264/api/accounts/confirmemail?email=a@b.c&token=t",
        }
        .render()
        .unwrap();
        assert!(html.contains("confirmemail?email=a@b.c&amp;token=t"));

        let text = ConfirmationEmailText {
            confirmation_link: "http://localhost:5264/api/accounts/confirmemail?email=a@b.c&token=t",
        }
        .render()
        .unwrap();
        assert!(text.contains("confirmemail?email=a@b.c&token=t"));
    }

    #[test]
    fn test_reset_template_embeds_link() {
        let html = PasswordResetEmailHtml {
            reset_link: "http://localhost:3000/password?email=a@b.c&token=t",
        }
        .render()
        .unwrap();
        assert!(html.contains("password?email=a@b.c&amp;token=t"));
        assert!(html.contains("24 hours"));
    }
}
