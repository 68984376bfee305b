//! Runtime configuration, read once from the process environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://leads.db?mode=rwc";
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_RESEND_BASE_URL: &str = "https://api.resend.com";
pub const DEFAULT_EMAIL_FROM: &str = "noreply@syncworkflow.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub resend_api_key: SecretString,
    pub resend_base_url: Url,
    pub email_from: String,
    pub admin_token: SecretString,
    pub sentry_dsn: Option<String>,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = match get("HOST") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "HOST",
                reason: format!("'{raw}' is not an IP address"),
            })?,
            None => DEFAULT_HOST,
        };

        let port = match get("PORT").or_else(|| get("BACKEND_PORT")) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                reason: format!("'{raw}' is not a port number"),
            })?,
            None => DEFAULT_PORT,
        };

        let resend_base_url = get("RESEND_BASE_URL")
            .unwrap_or_else(|| DEFAULT_RESEND_BASE_URL.to_string());
        let resend_base_url = Url::parse(&resend_base_url).map_err(|e| ConfigError::Invalid {
            name: "RESEND_BASE_URL",
            reason: e.to_string(),
        })?;

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            host,
            port,
            resend_api_key: get("RESEND_API_KEY")
                .map(SecretString::from)
                .ok_or(ConfigError::Missing("RESEND_API_KEY"))?,
            resend_base_url,
            email_from: get("EMAIL_FROM").unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
            admin_token: get("ADMIN_API_TOKEN")
                .map(SecretString::from)
                .ok_or(ConfigError::Missing("ADMIN_API_TOKEN"))?,
            sentry_dsn: get("SENTRY_DSN"),
            environment: get("APP_ENV").unwrap_or_else(|| "development".to_string()),
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup(&[
            ("RESEND_API_KEY", "re_123"),
            ("ADMIN_API_TOKEN", "admin-secret"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:3001");
        assert_eq!(config.email_from, DEFAULT_EMAIL_FROM);
        assert_eq!(config.resend_base_url.as_str(), "https://api.resend.com/");
        assert_eq!(config.resend_api_key.expose_secret(), "re_123");
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_missing_secrets_rejected() {
        let err = Config::from_lookup(lookup(&[("ADMIN_API_TOKEN", "t")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("RESEND_API_KEY")));

        let err = Config::from_lookup(lookup(&[
            ("RESEND_API_KEY", "re_123"),
            ("ADMIN_API_TOKEN", "   "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ADMIN_API_TOKEN")));
    }

    #[test]
    fn test_backend_port_alias_and_bad_port() {
        let config = Config::from_lookup(lookup(&[
            ("RESEND_API_KEY", "k"),
            ("ADMIN_API_TOKEN", "t"),
            ("BACKEND_PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);

        let err = Config::from_lookup(lookup(&[
            ("RESEND_API_KEY", "k"),
            ("ADMIN_API_TOKEN", "t"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }
}
