use chrono::NaiveDate;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{round_confidence, AmountKey, BankTransaction, Invoice, MatchProposal, Stored};

/// 评分规则
///
/// 金额一致是硬性前提 (得基础分), 日期接近在窗口内时加分。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringRules {
    pub amount_match_score: f64,
    pub date_proximity_bonus: f64,
    pub date_window_days: i64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            amount_match_score: 0.6,
            date_proximity_bonus: 0.4,
            date_window_days: 7,
        }
    }
}

/// 单个候选的得分与说明
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub score: f64,
    pub reason: String,
}

impl ScoringRules {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.amount_match_score >= 0.0) || !(self.date_proximity_bonus >= 0.0) {
            return Err("scoring weights must be >= 0".to_string());
        }
        if self.amount_match_score + self.date_proximity_bonus > 1.0 {
            return Err(format!(
                "amount_match_score + date_proximity_bonus must be <= 1, got {}",
                self.amount_match_score + self.date_proximity_bonus
            ));
        }
        if self.date_window_days < 0 {
            return Err("date_window_days must be >= 0".to_string());
        }
        Ok(())
    }

    /// 对一个金额已一致的候选评分
    pub fn score(
        &self,
        invoice_date: Option<NaiveDate>,
        txn_date: Option<NaiveDate>,
    ) -> CandidateScore {
        let (Some(inv), Some(txn)) = (invoice_date, txn_date) else {
            return CandidateScore {
                score: self.amount_match_score,
                reason: "Amount matches".to_string(),
            };
        };

        let days = txn.signed_duration_since(inv).num_days().abs();
        if days <= self.date_window_days {
            CandidateScore {
                score: self.amount_match_score + self.date_proximity_bonus,
                reason: format!("Amount matches and dates within {} days", days),
            }
        } else {
            CandidateScore {
                score: self.amount_match_score,
                reason: format!("Amount matches but dates {} days apart", days),
            }
        }
    }
}

/// 单次对账统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    pub invoices: usize,
    pub transactions: usize,
    pub buckets: usize,
    pub proposed: usize,
    pub unmatched: usize,
}

#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub proposals: Vec<MatchProposal>,
    pub stats: ReconcileStats,
}

/// 按金额分桶的流水索引, 桶内保持输入顺序
struct AmountIndex<'a> {
    buckets: IndexMap<AmountKey, Vec<&'a Stored<BankTransaction>>>,
}

impl<'a> AmountIndex<'a> {
    fn build(transactions: &'a [Stored<BankTransaction>]) -> Self {
        let mut buckets: IndexMap<AmountKey, Vec<&'a Stored<BankTransaction>>> = IndexMap::new();
        for txn in transactions {
            let Some(key) = AmountKey::from_amount(&txn.record.amount) else {
                tracing::warn!("Transaction {} amount out of range, skipping", txn.id);
                continue;
            };
            buckets.entry(key).or_default().push(txn);
        }
        Self { buckets }
    }

    fn candidates(&self, key: AmountKey) -> &[&'a Stored<BankTransaction>] {
        self.buckets.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// 对账引擎: 无状态, 同步, 不做 I/O
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    rules: ScoringRules,
    parallel_threshold: Option<usize>,
}

impl Reconciler {
    pub fn new(rules: ScoringRules) -> Self {
        Self {
            rules,
            parallel_threshold: None,
        }
    }

    /// 发票数达到阈值时按发票并行评分; 0 表示始终串行
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = (threshold > 0).then_some(threshold);
        self
    }

    pub fn run(
        &self,
        invoices: &[Invoice],
        transactions: &[Stored<BankTransaction>],
    ) -> ReconcileOutcome {
        let index = AmountIndex::build(transactions);

        let parallel = self
            .parallel_threshold
            .is_some_and(|threshold| invoices.len() >= threshold);

        // rayon 的 collect 保持输入顺序
        let proposals: Vec<MatchProposal> = if parallel {
            invoices
                .par_iter()
                .filter_map(|inv| self.best_candidate(inv, &index))
                .collect()
        } else {
            invoices
                .iter()
                .filter_map(|inv| self.best_candidate(inv, &index))
                .collect()
        };

        let stats = ReconcileStats {
            invoices: invoices.len(),
            transactions: transactions.len(),
            buckets: index.buckets.len(),
            proposed: proposals.len(),
            unmatched: invoices.len() - proposals.len(),
        };

        tracing::info!(
            "Reconcile finished: invoices: {}, transactions: {}, buckets: {}, \
             proposed: {}, unmatched: {}, parallel: {}",
            stats.invoices,
            stats.transactions,
            stats.buckets,
            stats.proposed,
            stats.unmatched,
            parallel
        );

        ReconcileOutcome { proposals, stats }
    }

    /// 在同金额候选中选最高分; 同分时保留桶内最先出现者
    fn best_candidate(&self, invoice: &Invoice, index: &AmountIndex<'_>) -> Option<MatchProposal> {
        let Some(key) = AmountKey::from_amount(&invoice.total) else {
            tracing::warn!("Invoice {} total out of range, skipping", invoice.invoice_number);
            return None;
        };
        let candidates = index.candidates(key);
        if candidates.is_empty() {
            tracing::debug!("Invoice {} total {} has no candidates", invoice.invoice_number, key);
            return None;
        }

        let mut best: Option<(&Stored<BankTransaction>, CandidateScore)> = None;
        for &txn in candidates {
            let scored = self.rules.score(invoice.invoice_date, txn.record.date);
            let is_better = match &best {
                None => true,
                Some((_, current)) => scored.score > current.score,
            };
            if is_better {
                best = Some((txn, scored));
            }
        }

        best.map(|(txn, scored)| MatchProposal {
            invoice_number: invoice.invoice_number.clone(),
            bank_transaction_id: txn.id.clone(),
            confidence: round_confidence(scored.score),
            reason: Some(scored.reason),
        })
    }
}

/// 使用默认规则对账
pub fn reconcile(
    invoices: &[Invoice],
    transactions: &[Stored<BankTransaction>],
) -> Vec<MatchProposal> {
    Reconciler::default().run(invoices, transactions).proposals
}
