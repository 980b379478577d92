use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::store::{Collection, CollectionStat, RecordStore, StoreStatus};
use crate::error::{StoreError, StoreResult};
use crate::models::{BankTransaction, Invoice, Match, MatchProposal, Stored};

/// 内存存储 (开发与测试用)
///
/// ID 为单调递增整数, 列表按 ID 排序即插入顺序。
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    next_id: AtomicU64,
    invoices: DashMap<u64, Invoice>,
    transactions: DashMap<u64, BankTransaction>,
    matches: DashMap<u64, Match>,
    closed: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> StoreResult<u64> {
        self.ensure_open()?;
        Ok(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("memory store is closed".to_string()));
        }
        Ok(())
    }
}

/// 按 ID 升序取前 limit 条
fn ordered<T: Clone>(map: &DashMap<u64, T>, limit: usize) -> Vec<(u64, T)> {
    let mut rows: Vec<(u64, T)> = map.iter().map(|e| (*e.key(), e.value().clone())).collect();
    rows.sort_by_key(|(id, _)| *id);
    rows.truncate(limit);
    rows
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> StoreResult<String> {
        let id = self.allocate_id()?;
        self.invoices.insert(id, invoice.clone());
        Ok(id.to_string())
    }

    async fn list_invoices(&self, limit: usize) -> StoreResult<Vec<Stored<Invoice>>> {
        self.ensure_open()?;
        Ok(ordered(&self.invoices, limit)
            .into_iter()
            .map(|(id, inv)| Stored::new(id.to_string(), inv))
            .collect())
    }

    async fn insert_transaction(&self, txn: &BankTransaction) -> StoreResult<String> {
        let id = self.allocate_id()?;
        self.transactions.insert(id, txn.clone());
        Ok(id.to_string())
    }

    async fn list_transactions(&self, limit: usize) -> StoreResult<Vec<Stored<BankTransaction>>> {
        self.ensure_open()?;
        Ok(ordered(&self.transactions, limit)
            .into_iter()
            .map(|(id, txn)| Stored::new(id.to_string(), txn))
            .collect())
    }

    async fn insert_match(&self, proposal: &MatchProposal) -> StoreResult<String> {
        let id = self.allocate_id()?;
        self.matches.insert(
            id,
            Match {
                id: id.to_string(),
                proposal: proposal.clone(),
                matched_at: Utc::now(),
            },
        );
        Ok(id.to_string())
    }

    async fn list_matches(&self, limit: usize) -> StoreResult<Vec<Match>> {
        self.ensure_open()?;
        Ok(ordered(&self.matches, limit).into_iter().map(|(_, m)| m).collect())
    }

    async fn status(&self) -> StoreStatus {
        let connected = !self.closed.load(Ordering::Acquire);
        let collections = Collection::ALL
            .iter()
            .map(|c| CollectionStat {
                name: c.name(),
                count: match c {
                    Collection::Invoice => self.invoices.len(),
                    Collection::BankTransaction => self.transactions.len(),
                    Collection::Match => self.matches.len(),
                } as i64,
            })
            .collect();
        StoreStatus {
            backend: self.backend(),
            connected,
            collections,
            error: None,
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    #[tokio::test]
    async fn lists_in_insertion_order_with_limit() {
        let store = MemoryRecordStore::new();
        for i in 0..5 {
            store
                .insert_transaction(&BankTransaction::new(
                    format!("txn {}", i),
                    BigDecimal::from(i),
                ))
                .await
                .unwrap();
        }

        let listed = store.list_transactions(3).await.unwrap();
        let descriptions: Vec<_> = listed.iter().map(|t| t.record.description.as_str()).collect();
        assert_eq!(descriptions, vec!["txn 0", "txn 1", "txn 2"]);
        assert_ne!(listed[0].id, listed[1].id);
    }

    #[tokio::test]
    async fn stores_matches_with_timestamp() {
        let store = MemoryRecordStore::new();
        let proposal = MatchProposal {
            invoice_number: "INV-1".to_string(),
            bank_transaction_id: "7".to_string(),
            confidence: 1.0,
            reason: None,
        };
        let id = store.insert_match(&proposal).await.unwrap();

        let matches = store.list_matches(10).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, id);
        assert_eq!(matches[0].proposal, proposal);
    }

    #[tokio::test]
    async fn closed_store_rejects_writes() {
        let store = MemoryRecordStore::new();
        store.close().await;

        let err = store
            .insert_invoice(&Invoice::new("INV-1", "Acme", BigDecimal::from(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(!store.status().await.connected);
    }
}
