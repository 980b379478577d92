pub mod bookkeeping;
pub mod export;
pub mod reconciler;

pub use bookkeeping::BookkeepingService;
pub use reconciler::{reconcile, ReconcileOutcome, ReconcileStats, Reconciler, ScoringRules};
