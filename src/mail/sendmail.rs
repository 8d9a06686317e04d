use std::sync::Arc;

use lettre::{
    Message, SmtpTransport, Transport,
    message::{Mailbox, SinglePart, header},
    transport::{smtp::authentication::Credentials, stub::StubTransport},
};

use crate::config::{Config, MailEncryption, MailTransport};

pub type MailError = Box<dyn std::error::Error + Send + Sync>;

enum Mailer {
    /// `None` when SMTP credentials were not configured.
    Smtp(Option<SmtpTransport>),
    Log(StubTransport),
}

/// Outgoing mail. Cheap to clone; all clones share one transport.
#[derive(Clone)]
pub struct EmailService {
    from: Option<Mailbox>,
    mailer: Arc<Mailer>,
}

impl EmailService {
    pub fn from_config(config: &Config) -> Result<Self, MailError> {
        let from_address = if config.mail_from_address.is_empty() {
            &config.mail_username
        } else {
            &config.mail_from_address
        };
        let from = if from_address.is_empty() {
            None
        } else {
            Some(Mailbox::new(
                Some(config.mail_from_name.clone()),
                from_address.parse()?,
            ))
        };

        let mailer = match config.mail_transport {
            MailTransport::Log => Mailer::Log(StubTransport::new_ok()),
            MailTransport::Smtp if config.mail_username.is_empty() => {
                tracing::warn!("MAIL_USERNAME is not set, outgoing mail will fail");
                Mailer::Smtp(None)
            }
            MailTransport::Smtp => {
                let builder = match config.mail_encryption {
                    MailEncryption::StartTls => SmtpTransport::starttls_relay(&config.mail_host)?,
                    MailEncryption::Ssl => SmtpTransport::relay(&config.mail_host)?,
                    MailEncryption::None => SmtpTransport::builder_dangerous(&config.mail_host),
                };
                let creds =
                    Credentials::new(config.mail_username.clone(), config.mail_password.clone());
                Mailer::Smtp(Some(
                    builder.credentials(creds).port(config.mail_port).build(),
                ))
            }
        };

        Ok(EmailService {
            from,
            mailer: Arc::new(mailer),
        })
    }

    /// Send an HTML email. `template` is filled by replacing each
    /// `{{key}}` placeholder with its value.
    pub async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        template: &str,
        placeholders: &[(&str, String)],
    ) -> Result<(), MailError> {
        let mut html = template.to_string();
        for (key, value) in placeholders {
            html = html.replace(&format!("{{{{{key}}}}}"), value);
        }

        let from = self
            .from
            .clone()
            .ok_or("email configuration is missing")?;

        let email = Message::builder()
            .from(from)
            .to(to_email.parse()?)
            .subject(subject)
            .singlepart(
                SinglePart::builder()
                    .header(header::ContentType::TEXT_HTML)
                    .body(html),
            )?;

        match self.mailer.as_ref() {
            Mailer::Smtp(None) => Err("email configuration is missing".into()),
            Mailer::Smtp(Some(transport)) => {
                // lettre's SMTP transport blocks on network I/O.
                let transport = transport.clone();
                tokio::task::spawn_blocking(move || transport.send(&email)).await??;
                tracing::info!("Email sent to {}", to_email);
                Ok(())
            }
            Mailer::Log(stub) => {
                stub.send(&email)?;
                tracing::info!("Email to {} logged, not sent: {}", to_email, subject);
                Ok(())
            }
        }
    }
}
