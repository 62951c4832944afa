use iso_currency::Currency;
use std::env;
use std::str::FromStr;

use crate::validation::validate_currency_code;

/// How expense amounts are checked before they are stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AmountPolicy {
    /// Amounts are stored as given
    #[default]
    Permissive,
    /// Negative amounts are rejected with a validation error
    Strict,
}

impl FromStr for AmountPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(AmountPolicy::Permissive),
            "strict" => Ok(AmountPolicy::Strict),
            other => Err(ConfigError::Invalid {
                key: "AMOUNT_VALIDATION",
                message: format!("expected 'permissive' or 'strict', got '{}'", other),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Longest accepted session lifetime, one year
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 366;

/// Runtime configuration, read from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL URL; the in-memory store is used when absent
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub display_currency: Currency,
    pub amount_policy: AmountPolicy,
    pub session_ttl_hours: i64,
    pub change_buffer: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let port = match lookup("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: "PORT",
                message: e.to_string(),
            })?,
            None => 8080,
        };

        let display_currency = match lookup("DISPLAY_CURRENCY") {
            Some(code) => validate_currency_code(&code).map_err(|e| ConfigError::Invalid {
                key: "DISPLAY_CURRENCY",
                message: e
                    .message
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| code.clone()),
            })?,
            None => Currency::USD,
        };

        let amount_policy = match lookup("AMOUNT_VALIDATION") {
            Some(raw) => raw.parse()?,
            None => AmountPolicy::default(),
        };

        let session_ttl_hours = match lookup("SESSION_TTL_HOURS") {
            Some(raw) => match raw.parse::<i64>() {
                Ok(hours) if (1..=MAX_SESSION_TTL_HOURS).contains(&hours) => hours,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "SESSION_TTL_HOURS",
                        message: format!(
                            "expected between 1 and {} hours, got '{}'",
                            MAX_SESSION_TTL_HOURS, raw
                        ),
                    });
                }
            },
            None => 24,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            jwt_secret,
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            display_currency,
            amount_policy,
            session_ttl_hours,
            change_buffer: 256,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
