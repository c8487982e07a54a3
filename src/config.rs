use std::env;
use std::fmt;

#[derive(Debug)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_ttl_hours: i64,
    pub password_reset_ttl_minutes: i64,
    pub default_locale: String,
    pub origin: String,
    pub fcm_server_key: Option<String>,
    pub smtp: Option<SmtpConfig>,
    pub subscription_buffer: usize,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(default),
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError("DATABASE_URL must be set".to_string()))?;

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            log::warn!("⚠️  JWT_SECRET not set, using an insecure development secret");
            "default-secret-change-me".to_string()
        });

        let smtp = match optional("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: parsed_or("SMTP_PORT", 587)?,
                username: optional("SMTP_USERNAME"),
                password: optional("SMTP_PASSWORD"),
                from: var_or("SMTP_FROM", "noreply@greenlight.local"),
            }),
            None => None,
        };

        Ok(AppConfig {
            host: var_or("HOST", "0.0.0.0"),
            port: parsed_or("PORT", 3030)?,
            database_url,
            jwt_secret,
            jwt_issuer: var_or("JWT_ISSUER", "greenlight"),
            jwt_audience: var_or("JWT_AUDIENCE", "greenlight-api"),
            jwt_ttl_hours: parsed_or("JWT_TTL_HOURS", 24)?,
            password_reset_ttl_minutes: parsed_or("PASSWORD_RESET_TTL_MINUTES", 60)?,
            default_locale: var_or("DEFAULT_LOCALE", "en-US"),
            origin: var_or("ORIGIN", "http://localhost:3000"),
            fcm_server_key: optional("FCM_SERVER_KEY"),
            smtp,
            subscription_buffer: parsed_or("SUBSCRIPTION_BUFFER", 64)?,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory://")
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: "memory://".into(),
            jwt_secret: "test-secret".into(),
            jwt_issuer: "greenlight".into(),
            jwt_audience: "greenlight-api".into(),
            jwt_ttl_hours: 1,
            password_reset_ttl_minutes: 30,
            default_locale: "en-US".into(),
            origin: "http://localhost:3000".into(),
            fcm_server_key: None,
            smtp: None,
            subscription_buffer: 8,
        }
    }
}
