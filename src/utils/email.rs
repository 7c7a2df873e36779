use lettre::message::{MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{instrument, warn};

use crate::config::email::EmailConfig;
use crate::utils::errors::AppError;

/// SMTP email dispatch. All callers that send after a committed transaction
/// go through [`EmailService::send_in_background`], which never fails the
/// surrounding request: delivery errors are logged and dropped.
#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Credentials email for auto-created accounts (teachers, school
    /// managers, parents).
    #[instrument(skip(self, password))]
    pub async fn send_welcome_email(
        &self,
        to_email: &str,
        first_name: &str,
        password: &str,
    ) -> Result<(), AppError> {
        let text_body = format!(
            "Hello {},\n\n\
             Your account has been created in the Ehtimami system.\n\n\
             Email: {}\n\
             Password: {}\n\n\
             Please log in and change your password immediately.\n\n\
             Best regards,\n\
             Ehtimami School Management",
            first_name, to_email, password
        );
        let html_body = self.welcome_template(first_name, to_email, password);

        self.send_email(to_email, "Welcome to Ehtimami System", &text_body, &html_body)
            .await
    }

    #[instrument(skip(self, reset_token))]
    pub async fn send_password_reset_email(
        &self,
        to_email: &str,
        first_name: &str,
        reset_token: &str,
    ) -> Result<(), AppError> {
        let reset_link = format!(
            "{}/auth/reset-password?token={}",
            self.config.frontend_url, reset_token
        );
        let text_body = format!(
            "Hi {},\n\n\
             You requested to reset your password.\n\n\
             Click the link below to reset your password:\n\
             {}\n\n\
             This link will expire in 30 minutes.\n\n\
             If you didn't request this, please ignore this email.\n\n\
             Best regards,\n\
             Ehtimami School Management",
            first_name, reset_link
        );
        let html_body = self.reset_template(first_name, &reset_link);

        self.send_email(to_email, "Reset your password", &text_body, &html_body)
            .await
    }

    #[instrument(skip(self))]
    pub async fn send_password_reset_confirmation(
        &self,
        to_email: &str,
        first_name: &str,
    ) -> Result<(), AppError> {
        let text_body = format!(
            "Hi {},\n\n\
             Your password has been successfully reset.\n\n\
             If you didn't make this change, please contact support immediately.\n\n\
             Best regards,\n\
             Ehtimami School Management",
            first_name
        );
        let html_body = format!(
            "<p>Hi <strong>{}</strong>,</p>\
             <p>Your password has been successfully reset.</p>\
             <p>If you didn't make this change, please contact support immediately.</p>",
            first_name
        );

        self.send_email(
            to_email,
            "Your password has been successfully reset",
            &text_body,
            &html_body,
        )
        .await
    }

    /// Fire-and-forget dispatch after a transaction commit. Failures are
    /// logged, never propagated to the original caller.
    pub fn send_in_background<F, Fut>(&self, job: F)
    where
        F: FnOnce(EmailService) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        if !self.config.enabled {
            return;
        }
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = job(service).await {
                warn!(error = %e.error, "Background email dispatch failed");
            }
        });
    }

    #[instrument(skip(self, html_body, text_body))]
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), AppError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let email = Message::builder()
            .from(from.parse().map_err(|e| {
                AppError::internal(anyhow::anyhow!("Invalid from email: {}", e))
            })?)
            .to(to_email.parse().map_err(|e| {
                AppError::internal(anyhow::anyhow!("Invalid to email: {}", e))
            })?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to build email: {}", e)))?;

        let mailer = if self.config.smtp_username.is_empty() {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            );

            SmtpTransport::relay(&self.config.smtp_host)
                .map_err(|e| {
                    AppError::internal(anyhow::anyhow!("Failed to create SMTP relay: {}", e))
                })?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build()
        };

        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::internal(anyhow::anyhow!("Task join error: {}", e)))?
            .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to send email: {}", e)))?;

        Ok(())
    }

    fn welcome_template(&self, first_name: &str, email: &str, password: &str) -> String {
        format!(
            "<h3>Hello {},</h3>\
             <p>Your account has been created successfully in the Ehtimami system.</p>\
             <p><strong>Email:</strong> {}</p>\
             <p><strong>Password:</strong> {}</p>\
             <p>Please log in and change your password immediately.</p>\
             <p>Best regards,<br/>Ehtimami School Management</p>",
            first_name, email, password
        )
    }

    fn reset_template(&self, first_name: &str, reset_link: &str) -> String {
        format!(
            "<h3>Hi {},</h3>\
             <p>We received a request to reset your password.</p>\
             <p><a href=\"{}\">Reset Password</a></p>\
             <p><strong>This link will expire in 30 minutes.</strong></p>\
             <p>If you didn't request this, please ignore this email.</p>",
            first_name, reset_link
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> EmailService {
        EmailService::new(EmailConfig {
            enabled: false,
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: "noreply@ehtimami.com".to_string(),
            from_name: "Ehtimami".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
        })
    }

    #[test]
    fn test_welcome_template_contains_credentials() {
        let service = test_service();
        let html = service.welcome_template("Sara", "sara@x.com", "a1b2c3d4e5f60718");
        assert!(html.contains("Sara"));
        assert!(html.contains("sara@x.com"));
        assert!(html.contains("a1b2c3d4e5f60718"));
    }

    #[test]
    fn test_reset_template_contains_link() {
        let service = test_service();
        let html = service.reset_template("Omar", "http://localhost:5173/auth/reset-password?token=t");
        assert!(html.contains("reset-password?token=t"));
    }
}
