use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 已存储记录: 存储层分配的不透明 ID + 记录本身
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stored<T> {
    pub id: String,
    #[serde(flatten)]
    pub record: T,
}

impl<T> Stored<T> {
    pub fn new(id: impl Into<String>, record: T) -> Self {
        Self {
            id: id.into(),
            record,
        }
    }
}

/// 匹配建议 (引擎输出, 尚未持久化)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchProposal {
    pub invoice_number: String,
    pub bank_transaction_id: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// 已持久化的匹配
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub id: String,
    #[serde(flatten)]
    pub proposal: MatchProposal,
    pub matched_at: DateTime<Utc>,
}
