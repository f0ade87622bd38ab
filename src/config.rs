use std::str::FromStr;

use anyhow::{bail, Context};
use serde::Deserialize;

/// Which `ProductRepository` backs the running service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" | "mem" => Ok(Self::Memory),
            other => bail!("unknown PRODUCT_STORE `{other}` (expected postgres or memory)"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreKind,
    /// Absent only when the memory store is selected.
    pub db: Option<DbConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = match lookup("PRODUCT_STORE") {
            Some(v) => v.parse::<StoreKind>()?,
            None => StoreKind::Postgres,
        };

        let db = match (store, lookup("DATABASE_URL")) {
            (_, Some(url)) => Some(DbConfig {
                url,
                max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            }),
            (StoreKind::Postgres, None) => bail!("DATABASE_URL must be set for the postgres store"),
            (StoreKind::Memory, None) => None,
        };

        Ok(Self {
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "APP_PORT", 8080)?,
            store,
            db,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: `{raw}`")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_with_database_url() {
        let cfg = AppConfig::from_lookup(vars(&[("DATABASE_URL", "postgres://localhost/db")]))
            .expect("config");
        assert_eq!(cfg.store, StoreKind::Postgres);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8080");
        let db = cfg.db.expect("db config");
        assert_eq!(db.url, "postgres://localhost/db");
        assert_eq!(db.max_connections, 10);
    }

    #[test]
    fn postgres_store_requires_database_url() {
        let err = AppConfig::from_lookup(vars(&[])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn memory_store_needs_no_database() {
        let cfg = AppConfig::from_lookup(vars(&[("PRODUCT_STORE", "memory"), ("APP_PORT", "3000")]))
            .expect("config");
        assert_eq!(cfg.store, StoreKind::Memory);
        assert!(cfg.db.is_none());
        assert_eq!(cfg.port, 3000);
    }

    #[test]
    fn rejects_bad_port_and_unknown_store() {
        let err = AppConfig::from_lookup(vars(&[("PRODUCT_STORE", "memory"), ("APP_PORT", "http")]))
            .unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));

        let err = AppConfig::from_lookup(vars(&[("PRODUCT_STORE", "redis")])).unwrap_err();
        assert!(err.to_string().contains("redis"));
    }
}
