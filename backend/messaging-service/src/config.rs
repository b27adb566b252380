use dotenvy::dotenv;
use std::env;

/// SMTP settings for outbound message-notification email.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

/// Push relay settings. The actual device delivery (APNs/FCM) is owned by the
/// platform push gateway; this service only posts to it.
#[derive(Debug, Clone)]
pub struct PushConfig {
    pub gateway_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub pii_key: String,
    pub smtp: Option<SmtpConfig>,
    pub push: Option<PushConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| crate::error::AppError::Config("JWT_SECRET missing".into()))?;
        let pii_key = env::var("PII_CODEC_KEY")
            .map_err(|_| crate::error::AppError::Config("PII_CODEC_KEY missing".into()))?;

        let smtp = match env::var("SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => Some(SmtpConfig {
                host,
                port: env::var("SMTP_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(587),
                username: env::var("SMTP_USERNAME").unwrap_or_default(),
                password: env::var("SMTP_PASSWORD").unwrap_or_default(),
                from_email: env::var("SMTP_FROM_EMAIL")
                    .unwrap_or_else(|_| "noreply@brightly.app".into()),
                from_name: env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "Brightly".into()),
            }),
            _ => None,
        };

        let push = match env::var("PUSH_GATEWAY_URL") {
            Ok(url) if !url.trim().is_empty() => Some(PushConfig { gateway_url: url }),
            _ => None,
        };

        Ok(Self {
            database_url,
            port,
            jwt_secret,
            pii_key,
            smtp,
            push,
        })
    }
}
