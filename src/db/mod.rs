pub mod memory;
pub mod pool;
pub mod postgres;
pub mod queries;
pub mod store;

use std::sync::Arc;

pub use memory::MemoryRecordStore;
pub use pool::{create_pool, init_schema};
pub use postgres::PgRecordStore;
pub use store::{Collection, CollectionStat, RecordStore, StoreStatus};

use crate::config::{AppConfig, StoreBackend};
use crate::error::StoreResult;

/// 按配置打开记录存储
pub async fn open_store(config: &AppConfig) -> StoreResult<Arc<dyn RecordStore>> {
    match config.store.backend {
        StoreBackend::Postgres => {
            let store =
                PgRecordStore::connect(&config.database.url, config.database.max_connections)
                    .await?;
            tracing::info!("Database pool created");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory record store, data is lost on shutdown");
            Ok(Arc::new(MemoryRecordStore::new()))
        }
    }
}
