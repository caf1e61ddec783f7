pub mod ai;
pub mod engine;
pub mod score;
pub(crate) mod util;

pub use ai::{AiMatchError, AiMatchRequest, AiMatchResponse, ClaudeMatcher, InvoiceMatchAi, MockMatcher};
pub use engine::{
    BatchMatchSummary, MatchCandidate, MatchDecision, MatchMethod, auto_match_transaction,
    auto_match_transactions, find_invoice_candidates, match_by_rules, score_candidates,
};
pub use score::{
    AUTO_ACCEPT_THRESHOLD, SUGGESTION_THRESHOLD, amount_score, amounts_match, date_score,
    normalize_amount, supplier_score,
};
