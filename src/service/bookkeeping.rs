use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::db::{Collection, RecordStore, StoreStatus};
use crate::error::{AppError, StoreError, StoreResult};
use crate::models::{BankTransaction, Invoice, Match, MatchProposal, Stored};
use crate::service::export::write_matches_csv;
use crate::service::reconciler::{ReconcileStats, Reconciler};

/// 读取上限
#[derive(Debug, Clone, Copy)]
pub struct FetchLimits {
    pub invoices: usize,
    pub transactions: usize,
}

/// 对账服务: 存储读写 + 匹配引擎编排
pub struct BookkeepingService {
    store: Arc<dyn RecordStore>,
    reconciler: Reconciler,
    match_limits: FetchLimits,
    persist_matches: bool,
    write_timeout: Duration,
}

impl BookkeepingService {
    pub fn new(store: Arc<dyn RecordStore>, reconciler: Reconciler) -> Self {
        Self {
            store,
            reconciler,
            match_limits: FetchLimits {
                invoices: 500,
                transactions: 1000,
            },
            persist_matches: true,
            write_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(store: Arc<dyn RecordStore>, config: &AppConfig) -> Self {
        let reconciler = Reconciler::new(config.engine.scoring_rules())
            .with_parallel_threshold(config.engine.parallel_threshold);
        Self {
            store,
            reconciler,
            match_limits: FetchLimits {
                invoices: config.api.match_invoice_limit,
                transactions: config.api.match_transaction_limit,
            },
            persist_matches: config.engine.persist_matches,
            write_timeout: Duration::from_secs(config.store.write_timeout_secs),
        }
    }

    pub fn with_persist_matches(mut self, persist: bool) -> Self {
        self.persist_matches = persist;
        self
    }

    /// 带超时的写入
    async fn timed_write<F>(&self, collection: Collection, write: F) -> StoreResult<String>
    where
        F: std::future::Future<Output = StoreResult<String>>,
    {
        match tokio::time::timeout(self.write_timeout, write).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    "✗ write to {} timed out (>{:?})",
                    collection.name(),
                    self.write_timeout
                );
                Err(StoreError::Timeout {
                    collection: collection.name(),
                })
            }
        }
    }

    pub async fn submit_invoice(&self, mut invoice: Invoice) -> Result<String, AppError> {
        invoice.validate()?;
        invoice.fill_line_totals();
        let id = self
            .timed_write(Collection::Invoice, self.store.insert_invoice(&invoice))
            .await?;
        tracing::info!("Invoice {} created with id {}", invoice.invoice_number, id);
        Ok(id)
    }

    pub async fn list_invoices(&self, limit: usize) -> Result<Vec<Stored<Invoice>>, AppError> {
        Ok(self.store.list_invoices(limit).await?)
    }

    pub async fn submit_transaction(&self, txn: BankTransaction) -> Result<String, AppError> {
        txn.validate()?;
        let id = self
            .timed_write(Collection::BankTransaction, self.store.insert_transaction(&txn))
            .await?;
        tracing::info!("Bank transaction created with id {}", id);
        Ok(id)
    }

    pub async fn list_transactions(
        &self,
        limit: usize,
    ) -> Result<Vec<Stored<BankTransaction>>, AppError> {
        Ok(self.store.list_transactions(limit).await?)
    }

    pub async fn list_matches(&self, limit: usize) -> Result<Vec<Match>, AppError> {
        Ok(self.store.list_matches(limit).await?)
    }

    pub async fn status(&self) -> StoreStatus {
        self.store.status().await
    }

    /// 完整对账流程: 读取 -> 匹配 -> (可选) 持久化
    ///
    /// 任一步失败都整体返回错误, 不返回部分结果。
    pub async fn reconcile(&self) -> Result<(Vec<MatchProposal>, ReconcileStats), AppError> {
        let (invoices, transactions) = futures::try_join!(
            self.store.list_invoices(self.match_limits.invoices),
            self.store.list_transactions(self.match_limits.transactions),
        )?;

        tracing::info!(
            "开始对账: {} 张发票, {} 条银行流水",
            invoices.len(),
            transactions.len()
        );

        let invoices: Vec<Invoice> = invoices.into_iter().map(|s| s.record).collect();
        let reconciler = self.reconciler.clone();
        // CPU 密集计算放到阻塞线程池
        let outcome =
            tokio::task::spawn_blocking(move || reconciler.run(&invoices, &transactions)).await?;

        if self.persist_matches {
            self.persist(&outcome.proposals).await?;
        }

        Ok((outcome.proposals, outcome.stats))
    }

    /// 逐条写入匹配结果; 失败时已计算的建议仍保留在日志中
    async fn persist(&self, proposals: &[MatchProposal]) -> Result<(), AppError> {
        for (idx, proposal) in proposals.iter().enumerate() {
            let written = self
                .timed_write(Collection::Match, self.store.insert_match(proposal))
                .await;
            if let Err(e) = written {
                tracing::error!(
                    "✗ Persisting match {}/{} failed ({} -> {}): {}",
                    idx + 1,
                    proposals.len(),
                    proposal.invoice_number,
                    proposal.bank_transaction_id,
                    e
                );
                for pending in &proposals[idx..] {
                    tracing::warn!(
                        "Unsaved proposal: {} -> {} ({:.2})",
                        pending.invoice_number,
                        pending.bank_transaction_id,
                        pending.confidence
                    );
                }
                return Err(e.into());
            }
        }
        tracing::info!("✓ Persisted {} matches", proposals.len());
        Ok(())
    }

    /// 导出已持久化匹配为 CSV
    pub async fn export_matches_csv(&self, limit: usize) -> Result<Vec<u8>, AppError> {
        let matches = self.store.list_matches(limit).await?;
        let mut buf = Vec::new();
        write_matches_csv(&matches, &mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryRecordStore;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn invoice(number: &str, total: i64) -> Invoice {
        Invoice::new(number, "Acme", BigDecimal::from(total)).with_invoice_date(day(1))
    }

    fn service() -> BookkeepingService {
        BookkeepingService::new(Arc::new(MemoryRecordStore::new()), Reconciler::default())
    }

    #[tokio::test]
    async fn reconcile_persists_each_proposal() {
        let svc = service();
        svc.submit_invoice(invoice("INV-1", 100)).await.unwrap();
        svc.submit_invoice(invoice("INV-2", 50)).await.unwrap();
        let txn_id = svc
            .submit_transaction(
                BankTransaction::new("ACME PAYMENT", BigDecimal::from(100)).with_date(day(3)),
            )
            .await
            .unwrap();

        let (proposals, stats) = svc.reconcile().await.unwrap();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].bank_transaction_id, txn_id);
        assert_eq!(stats.unmatched, 1);

        let stored = svc.list_matches(10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].proposal, proposals[0]);
    }

    #[tokio::test]
    async fn reconcile_without_persistence_leaves_store_untouched() {
        let svc = service().with_persist_matches(false);
        svc.submit_invoice(invoice("INV-1", 10)).await.unwrap();
        let txn = BankTransaction::new("pay", BigDecimal::from(10)).with_date(day(20));
        svc.submit_transaction(txn).await.unwrap();

        let (proposals, _) = svc.reconcile().await.unwrap();
        assert_eq!(proposals[0].confidence, 0.6);
        assert!(svc.list_matches(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_records_never_reach_the_store() {
        let svc = service();
        let err = svc.submit_invoice(invoice("INV-1", -5)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(svc.list_invoices(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_on_load_fails_the_whole_run() {
        let store = Arc::new(MemoryRecordStore::new());
        let svc = BookkeepingService::new(store.clone(), Reconciler::default());
        svc.submit_invoice(invoice("INV-1", 10)).await.unwrap();
        store.close().await;

        let err = svc.reconcile().await.unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::Unavailable(_))));
    }
}
