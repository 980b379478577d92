use async_trait::async_trait;
use sqlx::PgPool;

use super::pool::{create_pool, init_schema};
use super::queries;
use super::store::{Collection, CollectionStat, RecordStore, StoreStatus};
use crate::error::StoreResult;
use crate::models::{BankTransaction, Invoice, Match, MatchProposal, Stored};

/// PostgreSQL 存储
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 建立连接池并初始化表结构
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = create_pool(database_url, max_connections).await?;
        init_schema(&pool).await?;
        Ok(Self::new(pool))
    }
}

fn pg_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl RecordStore for PgRecordStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> StoreResult<String> {
        let id = queries::insert_invoice(&self.pool, invoice).await?;
        tracing::debug!("Invoice {} stored as {}", invoice.invoice_number, id);
        Ok(id.to_string())
    }

    async fn list_invoices(&self, limit: usize) -> StoreResult<Vec<Stored<Invoice>>> {
        Ok(queries::list_invoices(&self.pool, pg_limit(limit)).await?)
    }

    async fn insert_transaction(&self, txn: &BankTransaction) -> StoreResult<String> {
        let id = queries::insert_transaction(&self.pool, txn).await?;
        Ok(id.to_string())
    }

    async fn list_transactions(&self, limit: usize) -> StoreResult<Vec<Stored<BankTransaction>>> {
        Ok(queries::list_transactions(&self.pool, pg_limit(limit)).await?)
    }

    async fn insert_match(&self, proposal: &MatchProposal) -> StoreResult<String> {
        let id = queries::insert_match(&self.pool, proposal).await?;
        Ok(id.to_string())
    }

    async fn list_matches(&self, limit: usize) -> StoreResult<Vec<Match>> {
        Ok(queries::list_matches(&self.pool, pg_limit(limit)).await?)
    }

    async fn status(&self) -> StoreStatus {
        let mut collections = Vec::with_capacity(Collection::ALL.len());
        for collection in Collection::ALL {
            match queries::count_rows(&self.pool, collection).await {
                Ok(count) => collections.push(CollectionStat {
                    name: collection.name(),
                    count,
                }),
                Err(e) => {
                    return StoreStatus {
                        backend: self.backend(),
                        connected: false,
                        collections,
                        error: Some(e.to_string()),
                    };
                }
            }
        }
        StoreStatus {
            backend: self.backend(),
            connected: true,
            collections,
            error: None,
        }
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
