//! Process configuration, read from the environment.

use chrono::Duration;
use thiserror::Error;

use gabinete_core::UserId;

const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_INVITE_TTL_DAYS: i64 = 7;
const DEFAULT_TOKEN_TTL_MINUTES: i64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is invalid: {detail}")]
    Invalid { name: &'static str, detail: String },
}

#[derive(Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub bind_addr: String,
    /// Public base URL used in invitation links.
    pub site_url: Option<String>,
    /// Selects the PostgreSQL store; the in-memory store is used otherwise.
    pub database_url: Option<String>,
    pub invite_ttl: Duration,
    /// Lifetime of tokens issued by password login.
    pub token_ttl: Duration,
    /// Users flagged as super-admins at startup.
    pub super_admins: Vec<UserId>,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("site_url", &self.site_url)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("invite_ttl", &self.invite_ttl)
            .field("token_ttl", &self.token_ttl)
            .field("super_admins", &self.super_admins)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source. Empty values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let invite_ttl_days = positive(var("INVITE_TTL_DAYS"), "INVITE_TTL_DAYS", DEFAULT_INVITE_TTL_DAYS, "days")?;
        let token_ttl_minutes =
            positive(var("TOKEN_TTL_MINUTES"), "TOKEN_TTL_MINUTES", DEFAULT_TOKEN_TTL_MINUTES, "minutes")?;

        let super_admins = match var("SUPER_ADMIN_IDS") {
            None => Vec::new(),
            Some(raw) => raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| {
                    s.parse::<UserId>().map_err(|e| ConfigError::Invalid {
                        name: "SUPER_ADMIN_IDS",
                        detail: e.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(Self {
            jwt_secret,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            site_url: var("SITE_URL"),
            database_url: var("DATABASE_URL"),
            invite_ttl: Duration::days(invite_ttl_days),
            token_ttl: Duration::minutes(token_ttl_minutes),
            super_admins,
        })
    }

    /// In-memory configuration with the given secret; used by tests and local runs.
    pub fn for_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            bind_addr: "127.0.0.1:0".to_string(),
            site_url: None,
            database_url: None,
            invite_ttl: Duration::days(DEFAULT_INVITE_TTL_DAYS),
            token_ttl: Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
            super_admins: Vec::new(),
        }
    }
}

fn positive(raw: Option<String>, name: &'static str, default: i64, unit: &str) -> Result<i64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<i64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid {
            name,
            detail: format!("expected a positive number of {unit}, got {raw:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(cfg.invite_ttl, Duration::days(7));
        assert_eq!(cfg.token_ttl, Duration::minutes(60));
        assert!(cfg.site_url.is_none());
        assert!(cfg.database_url.is_none());
        assert!(cfg.super_admins.is_empty());
    }

    #[test]
    fn reads_every_variable() {
        let root = UserId::new();
        let ids = format!("{root}, ");
        let cfg = config(&[
            ("JWT_SECRET", "s3cret"),
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("SITE_URL", "https://gabinete.example.org/"),
            ("DATABASE_URL", "postgres://localhost/gabinete"),
            ("INVITE_TTL_DAYS", "3"),
            ("TOKEN_TTL_MINUTES", "15"),
            ("SUPER_ADMIN_IDS", &ids),
        ])
        .unwrap();
        assert_eq!(cfg.jwt_secret, "s3cret");
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        assert_eq!(cfg.site_url.as_deref(), Some("https://gabinete.example.org/"));
        assert_eq!(cfg.invite_ttl, Duration::days(3));
        assert_eq!(cfg.token_ttl, Duration::minutes(15));
        assert_eq!(cfg.super_admins, vec![root]);
        assert!(!format!("{cfg:?}").contains("postgres://"));
    }

    #[test]
    fn bad_values_are_reported() {
        assert!(matches!(
            config(&[("INVITE_TTL_DAYS", "0")]),
            Err(ConfigError::Invalid { name: "INVITE_TTL_DAYS", .. })
        ));
        assert!(matches!(
            config(&[("TOKEN_TTL_MINUTES", "-5")]),
            Err(ConfigError::Invalid { name: "TOKEN_TTL_MINUTES", .. })
        ));
        assert!(matches!(
            config(&[("SUPER_ADMIN_IDS", "not-a-uuid")]),
            Err(ConfigError::Invalid { name: "SUPER_ADMIN_IDS", .. })
        ));
    }
}
