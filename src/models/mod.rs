pub mod amount;
pub mod date;
pub mod invoice;
pub mod result;
pub mod transaction;

pub use amount::{round_confidence, round_money, AmountKey};
pub use date::parse_record_date;
pub use invoice::{Invoice, InvoiceLine};
pub use result::{Match, MatchProposal, Stored};
pub use transaction::BankTransaction;
