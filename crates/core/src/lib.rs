pub mod invoice;
pub mod statement;
pub mod transaction;

pub use invoice::Invoice;
pub use statement::{ParsedStatement, SkipReason, StatementHeader, StatementSummary};
pub use transaction::{Transaction, TransactionStatus, TransactionType};
