use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::net::SocketAddr;
use std::str::FromStr;

/// Thirty days.
const MAX_ACCESS_TTL_MINUTES: u64 = 43_200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub run_migrations: bool,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub paseto_access_key: [u8; 32],
    pub access_ttl_minutes: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let store_backend: StoreBackend = env_or_parse("STORE_BACKEND", "postgres")?;
        let database_url = match store_backend {
            StoreBackend::Postgres => Some(env_or_err("DATABASE_URL")?),
            StoreBackend::Memory => std::env::var("DATABASE_URL").ok(),
        };

        Ok(Self {
            http_addr,
            store_backend,
            database_url,
            run_migrations: env_or_parse("RUN_MIGRATIONS", "false")?,
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            paseto_access_key: env_key_32("PASETO_ACCESS_KEY")?,
            access_ttl_minutes: access_ttl(env_or_parse("ACCESS_TTL_MINUTES", "15")?)?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn access_ttl(minutes: u64) -> Result<u64> {
    if !(1..=MAX_ACCESS_TTL_MINUTES).contains(&minutes) {
        return Err(anyhow!(
            "invalid ACCESS_TTL_MINUTES: must be between 1 and {}",
            MAX_ACCESS_TTL_MINUTES
        ));
    }
    Ok(minutes)
}

fn env_key_32(key: &str) -> Result<[u8; 32]> {
    let value = env_or_err(key)?;
    decode_key_32(key, &value)
}

pub fn decode_key_32(key: &str, value: &str) -> Result<[u8; 32]> {
    let decoded = STANDARD
        .decode(value.as_bytes())
        .map_err(|err| anyhow!("invalid {}: {}", key, err))?;
    if decoded.len() != 32 {
        return Err(anyhow!("invalid {}: expected 32 bytes", key));
    }
    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&decoded);
    Ok(key_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_parses_known_names() {
        assert_eq!("memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert_eq!("postgres".parse::<StoreBackend>(), Ok(StoreBackend::Postgres));
        assert!("sqlite".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn key_must_be_32_bytes() {
        let short = STANDARD.encode([7u8; 16]);
        assert!(decode_key_32("PASETO_ACCESS_KEY", &short).is_err());

        let exact = STANDARD.encode([7u8; 32]);
        assert_eq!(decode_key_32("PASETO_ACCESS_KEY", &exact).unwrap(), [7u8; 32]);
    }

    #[test]
    fn access_ttl_is_bounded() {
        assert_eq!(access_ttl(15).unwrap(), 15);
        assert!(access_ttl(0).is_err());
        assert!(access_ttl(u64::MAX).is_err());
    }
}
