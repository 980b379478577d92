use async_trait::async_trait;
use serde::Serialize;

use crate::error::StoreResult;
use crate::models::{BankTransaction, Invoice, Match, MatchProposal, Stored};

/// 记录集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Invoice,
    BankTransaction,
    Match,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Invoice,
        Collection::BankTransaction,
        Collection::Match,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Invoice => "invoice",
            Collection::BankTransaction => "banktransaction",
            Collection::Match => "match",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Collection::Invoice => "invoices",
            Collection::BankTransaction => "bank_transactions",
            Collection::Match => "matches",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionStat {
    pub name: &'static str,
    pub count: i64,
}

/// 存储状态报告
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub backend: &'static str,
    pub connected: bool,
    pub collections: Vec<CollectionStat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 记录存储: 引擎之外的读写协作方
///
/// 列表按插入顺序返回, 最多 `limit` 条。
#[async_trait]
pub trait RecordStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn insert_invoice(&self, invoice: &Invoice) -> StoreResult<String>;

    async fn list_invoices(&self, limit: usize) -> StoreResult<Vec<Stored<Invoice>>>;

    async fn insert_transaction(&self, txn: &BankTransaction) -> StoreResult<String>;

    async fn list_transactions(&self, limit: usize) -> StoreResult<Vec<Stored<BankTransaction>>>;

    async fn insert_match(&self, proposal: &MatchProposal) -> StoreResult<String>;

    async fn list_matches(&self, limit: usize) -> StoreResult<Vec<Match>>;

    async fn status(&self) -> StoreStatus;

    /// 释放连接等资源
    async fn close(&self);
}
