use std::sync::Arc;

use crate::config::{AppConfig, StoreKind};
use crate::db;
use crate::products::repo::{MemoryProductRepository, PgProductRepository, ProductRepository};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub products: Arc<dyn ProductRepository>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let products = match (config.store, config.db.as_ref()) {
            (StoreKind::Postgres, Some(db_config)) => {
                let pool = db::connect(db_config).await?;
                Arc::new(PgProductRepository::new(pool)) as Arc<dyn ProductRepository>
            }
            (StoreKind::Postgres, None) => anyhow::bail!("postgres store selected without DATABASE_URL"),
            (StoreKind::Memory, _) => {
                tracing::warn!("using in-memory product store; data is lost on restart");
                Arc::new(MemoryProductRepository::new()) as Arc<dyn ProductRepository>
            }
        };

        Ok(Self { config, products })
    }

    pub fn from_parts(config: Arc<AppConfig>, products: Arc<dyn ProductRepository>) -> Self {
        Self { config, products }
    }

    /// State over an empty in-memory store, for tests and local runs.
    pub fn in_memory() -> Self {
        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            store: StoreKind::Memory,
            db: None,
        });
        Self::from_parts(config, Arc::new(MemoryProductRepository::new()))
    }
}
