use super::sendmail::{EmailService, MailError};
use crate::utils::verification::code_ttl;

const APP_NAME: &str = "RealFreedom";
const VERIFICATION_TEMPLATE: &str = include_str!("templates/verification-code.html");
const WELCOME_TEMPLATE: &str = include_str!("templates/welcome.html");

pub async fn send_verification_code(
    mailer: &EmailService,
    to_email: &str,
    name: Option<&str>,
    code: &str,
) -> Result<(), MailError> {
    let subject = "Your verification code";
    let placeholders = [
        ("name", display_name(name, to_email)),
        ("code", code.to_string()),
        ("minutes", code_ttl().num_minutes().to_string()),
        ("app_name", APP_NAME.to_string()),
    ];

    mailer
        .send_email(to_email, subject, VERIFICATION_TEMPLATE, &placeholders)
        .await
}

pub async fn send_welcome_email(
    mailer: &EmailService,
    to_email: &str,
    name: Option<&str>,
    referral_code: &str,
) -> Result<(), MailError> {
    let subject = format!("Welcome to {APP_NAME}");
    let placeholders = [
        ("name", display_name(name, to_email)),
        ("referral_code", referral_code.to_string()),
        ("app_name", APP_NAME.to_string()),
    ];

    mailer
        .send_email(to_email, &subject, WELCOME_TEMPLATE, &placeholders)
        .await
}

/// Falls back to the local part of the address when no name was given.
fn display_name(name: Option<&str>, email: &str) -> String {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => email.split('@').next().unwrap_or(email).to_string(),
    }
}
