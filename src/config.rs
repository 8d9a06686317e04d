use std::{env, fmt::Display, str::FromStr};

use tracing::warn;

/// How verification mail leaves the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTransport {
    /// Real SMTP delivery through `MAIL_HOST`.
    Smtp,
    /// Mail is rendered and logged, never sent. Used in development and tests.
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailEncryption {
    StartTls,
    Ssl,
    None,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub port: u16,
    pub env: String,
    pub database_url: String,
    pub cors_allowed_origins: Vec<String>,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub files_dir: String,
    pub mail_host: String,
    pub mail_port: u16,
    pub mail_username: String,
    pub mail_password: String,
    pub mail_encryption: MailEncryption,
    pub mail_from_address: String,
    pub mail_from_name: String,
    pub mail_transport: MailTransport,
}

impl Config {
    pub fn init() -> Config {
        let mail_encryption = match var_or("MAIL_ENCRYPTION", "tls").to_lowercase().as_str() {
            "ssl" => MailEncryption::Ssl,
            "none" => MailEncryption::None,
            _ => MailEncryption::StartTls,
        };
        let mail_transport = match var_or("MAIL_TRANSPORT", "smtp").to_lowercase().as_str() {
            "log" => MailTransport::Log,
            _ => MailTransport::Smtp,
        };

        Config {
            server_host: var_or("SERVER_HOST", "0.0.0.0"),
            port: parse_or("SERVER_PORT", 8080),
            env: var_or("ENV", "development"),
            database_url: var_or("DATABASE_URL", "sqlite://./data/freedom.db"),
            cors_allowed_origins: split_origins(&var_or(
                "CORS_ALLOWED_ORIGINS",
                "http://localhost:3000,http://localhost:8098",
            )),
            jwt_secret: var_or("JWT_SECRET_KEY", "change-me-in-production"),
            jwt_maxage: parse_or("JWT_MAXAGE", 86_400),
            files_dir: var_or("FILES_DIR", "./files"),
            mail_host: var_or("MAIL_HOST", "smtp.gmail.com"),
            mail_port: parse_or("MAIL_PORT", 587),
            mail_username: var_or("MAIL_USERNAME", ""),
            mail_password: var_or("MAIL_PASSWORD", ""),
            mail_encryption,
            mail_from_address: var_or("MAIL_FROM_ADDRESS", ""),
            mail_from_name: var_or("MAIL_FROM_NAME", "RealFreedom"),
            mail_transport,
        }
    }

    pub fn is_production(&self) -> bool {
        self.env == "production"
    }
}

fn var_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) if !raw.is_empty() => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default {default}");
            default
        }),
        _ => default,
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
impl Config {
    /// Configuration for in-process tests: in-memory store, mail only logged.
    pub fn for_tests() -> Config {
        Config {
            server_host: "127.0.0.1".to_string(),
            port: 0,
            env: "test".to_string(),
            database_url: "sqlite::memory:".to_string(),
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
            jwt_secret: "test-secret".to_string(),
            jwt_maxage: 3600,
            files_dir: "./files".to_string(),
            mail_host: "localhost".to_string(),
            mail_port: 25,
            mail_username: String::new(),
            mail_password: String::new(),
            mail_encryption: MailEncryption::None,
            mail_from_address: "noreply@example.com".to_string(),
            mail_from_name: "RealFreedom".to_string(),
            mail_transport: MailTransport::Log,
        }
    }
}
