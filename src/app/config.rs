use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;

use rand::distributions::{Alphanumeric, DistString};
use thiserror::Error;

/// Longest accepted JWT lifetime, ten years.
pub const MAX_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable `{0}` not set")]
    Missing(&'static str),
    #[error("environment variable `{name}` has invalid value `{value}`")]
    Invalid { name: &'static str, value: String },
}

/// Which storage the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgreSQL for entities, redis for opaque tokens.
    Postgres,
    /// Everything in process memory, lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_pool_size: u32,
    pub redis_url: String,
    pub bind_address: String,
    pub port: u16,
    pub jwt_secret: String,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
}

impl Settings {
    /// Reads the settings from the environment, loading a `.env` file first if present.
    pub fn from_env() -> Result<Settings, ConfigError> {
        dotenv::dotenv().ok();
        Settings::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Settings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("STORE_BACKEND") {
            Some(value) => value
                .parse::<StoreBackend>()
                .map_err(|_| ConfigError::Invalid { name: "STORE_BACKEND", value })?,
            None => StoreBackend::Postgres,
        };

        let database_url = lookup("DATABASE_URL");
        if backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let jwt_secret = match lookup("JWT_SECRET") {
            Some(secret) if !secret.is_empty() => secret,
            _ if backend == StoreBackend::Memory => {
                log::warn!("JWT_SECRET not set, using a random secret for this process");
                Alphanumeric.sample_string(&mut rand::thread_rng(), 48)
            }
            _ => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        Ok(Settings {
            backend,
            database_url,
            database_pool_size: parse_within(&lookup, "DATABASE_POOL_SIZE", 10, 1..=u32::MAX)?,
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1/".to_string()),
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            jwt_secret,
            access_ttl_seconds: parse_within(
                &lookup,
                "JWT_ACCESS_TTL_SECONDS",
                300,
                1..=MAX_TTL_SECONDS,
            )?,
            refresh_ttl_seconds: parse_within(
                &lookup,
                "JWT_REFRESH_TTL_SECONDS",
                86_400,
                1..=MAX_TTL_SECONDS,
            )?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

/// Like [`parse_or`], but the value must also fall within `bounds`.
fn parse_within<F, T>(
    lookup: &F,
    name: &'static str,
    default: T,
    bounds: RangeInclusive<T>,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + ToString,
{
    let value = parse_or(lookup, name, default)?;
    if !bounds.contains(&value) {
        return Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_postgres_defaults() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/blog"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(settings.backend, StoreBackend::Postgres);
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.database_pool_size, 10);
        assert_eq!(settings.redis_url, "redis://127.0.0.1/");
        assert_eq!(settings.access_ttl_seconds, 300);
        assert_eq!(settings.refresh_ttl_seconds, 86_400);
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = Settings::from_lookup(lookup_from(&[("JWT_SECRET", "secret")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn test_memory_generates_secret() {
        let settings = Settings::from_lookup(lookup_from(&[("STORE_BACKEND", "memory")])).unwrap();
        assert_eq!(settings.backend, StoreBackend::Memory);
        assert_eq!(settings.jwt_secret.len(), 48);
    }

    #[test]
    fn test_invalid_port() {
        let err = Settings::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "memory"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn test_zero_pool_size() {
        let err = Settings::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "memory"),
            ("DATABASE_POOL_SIZE", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "DATABASE_POOL_SIZE", .. }));
    }

    #[test]
    fn test_ttl_bounds() {
        for (name, value) in [
            ("JWT_ACCESS_TTL_SECONDS", "0"),
            ("JWT_ACCESS_TTL_SECONDS", "-300"),
            ("JWT_ACCESS_TTL_SECONDS", "9223372036854775807"),
            ("JWT_REFRESH_TTL_SECONDS", "9000000000000000"),
        ] {
            let err = Settings::from_lookup(lookup_from(&[("STORE_BACKEND", "memory"), (name, value)]))
                .unwrap_err();
            match err {
                ConfigError::Invalid { name: rejected, value: shown } => {
                    assert_eq!(rejected, name);
                    assert_eq!(shown, value);
                }
                other => panic!("expected invalid {}, got {:?}", name, other),
            }
        }

        let settings = Settings::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_REFRESH_TTL_SECONDS", &MAX_TTL_SECONDS.to_string()),
        ]))
        .unwrap();
        assert_eq!(settings.refresh_ttl_seconds, MAX_TTL_SECONDS);
    }
}
