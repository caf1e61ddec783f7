pub mod classify;
pub mod fingerprint;
pub mod header;
pub mod pipeline;
pub mod segment;
pub mod value;
pub mod vendors;

pub use classify::classify_description;
pub use fingerprint::{MemoryIndex, TransactionIndex, transaction_fingerprint};
pub use header::{extract_header, extract_summary};
pub use pipeline::{PlainTextExtractor, StatementPipeline, TextExtractor};
pub use segment::{ParserConfig, extract_transactions};
pub use vendors::{
    StaticRuleStore, TomlRuleStore, VendorMatch, VendorMatcher, VendorRule, VendorRuleStore,
    apply_vendor_matches, unmatched_vendor_names,
};
