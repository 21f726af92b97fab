use std::sync::Arc;
use std::time::Duration;

use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use tracing::info;

use crate::config::Config;
use crate::store::{MemoryStore, MySqlStore, Store, StoreError};

pub async fn init_db(database_url: &str) -> Result<MySqlPool, StoreError> {
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied");
    Ok(pool)
}

/// MySQL when a database URL is configured, otherwise the in-memory store.
pub async fn init_store(config: &Config) -> Result<Arc<dyn Store>, StoreError> {
    match &config.database_url {
        Some(url) => {
            let pool = init_db(url).await?;
            Ok(Arc::new(MySqlStore::new(pool)))
        }
        None => {
            info!("DATABASE_URL not set, using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
