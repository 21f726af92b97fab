use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

#[derive(Clone, Debug)]
pub struct Config {
    /// `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub server_addr: String,
    /// Seconds
    pub token_ttl: u64,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,
    pub log_level: String,
}

impl Config {
    /// Defaults for everything except the signing secret.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: None,
            jwt_secret: jwt_secret.into(),
            server_addr: "0.0.0.0:5000".to_string(),
            token_ttl: 86_400,
            rate_login_per_min: 60,
            rate_register_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            log_dir: "logs".to_string(),
            log_level: "debug".to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.trim().is_empty() {
            return Err(anyhow!("JWT_SECRET must not be empty"));
        }
        let defaults = Self::with_secret(jwt_secret);

        let server_addr = match env::var("SERVER_ADDR") {
            Ok(addr) => addr,
            Err(_) => format!("0.0.0.0:{}", parse_var::<u16>("PORT", 5000)?),
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            server_addr,
            token_ttl: parse_var("TOKEN_TTL", defaults.token_ttl)?,
            rate_login_per_min: parse_var("RATE_LOGIN_PER_MIN", defaults.rate_login_per_min)?,
            rate_register_per_min: parse_var("RATE_REGISTER_PER_MIN", defaults.rate_register_per_min)?,
            rate_protected_per_min: parse_var("RATE_PROTECTED_PER_MIN", defaults.rate_protected_per_min)?,
            api_prefix: env::var("API_PREFIX").unwrap_or(defaults.api_prefix),
            log_dir: env::var("LOG_DIR").unwrap_or(defaults.log_dir),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            jwt_secret: defaults.jwt_secret,
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::with_secret("s3cret");
        assert_eq!(config.token_ttl, 86_400);
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.server_addr, "0.0.0.0:5000");
        assert!(config.database_url.is_none());
    }

    #[test]
    fn unset_variable_falls_back() {
        assert_eq!(parse_var::<u32>("PERMITDESK_TEST_UNSET_VAR", 7).unwrap(), 7);
    }
}
