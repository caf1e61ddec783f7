use chrono::NaiveDate;
use serde::Serialize;

use decont_core::{Invoice, Transaction, TransactionStatus};

use crate::ai::{AiMatchRequest, InvoiceMatchAi};
use crate::score::{
    AUTO_ACCEPT_THRESHOLD, SCORE_DATE_SAME_MONTH, SCORE_DATE_SAME_WEEK,
    SCORE_DATE_WITHIN_60_DAYS, SCORE_EXACT_AMOUNT, SCORE_SUPPLIER_EXACT, SUGGESTION_THRESHOLD,
    amount_score, date_score, supplier_score,
};

/// How many ranked candidates a suggestion (or the AI shortlist) carries.
pub const SUGGESTION_LIMIT: usize = 3;

/// Top-two total scores closer than this cannot be separated
/// deterministically: one date-tier on the point scale.
const TIED_SCORE_MARGIN: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Rule,
    Score,
    Ai,
}

/// One scored invoice candidate — ephemeral, lives only within a
/// reconciliation call.
#[derive(Debug, Clone, Serialize)]
pub struct MatchCandidate {
    pub invoice_id: i64,
    pub invoice_date: Option<NaiveDate>,
    pub amount_score: f64,
    pub date_score: f64,
    pub supplier_score: f64,
    pub total_score: f64,
    /// Normalized against the signals this transaction actually carries.
    pub confidence: f64,
    pub reasons: Vec<String>,
}

/// The outcome of matching one transaction.
#[derive(Debug, Clone, Serialize)]
pub struct MatchDecision {
    pub transaction_id: Option<i64>,
    pub auto_accepted: bool,
    pub invoice_id: Option<i64>,
    pub confidence: f64,
    pub method: Option<MatchMethod>,
    pub reasons: Vec<String>,
    /// Next-best candidates offered alongside a suggestion.
    pub alternatives: Vec<MatchCandidate>,
}

impl MatchDecision {
    fn accepted(transaction_id: Option<i64>, candidate: &MatchCandidate, method: MatchMethod) -> Self {
        Self {
            transaction_id,
            auto_accepted: true,
            invoice_id: Some(candidate.invoice_id),
            confidence: candidate.confidence,
            method: Some(method),
            reasons: candidate.reasons.clone(),
            alternatives: Vec::new(),
        }
    }

    fn unmatched(transaction_id: Option<i64>) -> Self {
        Self {
            transaction_id,
            auto_accepted: false,
            invoice_id: None,
            confidence: 0.0,
            method: None,
            reasons: Vec::new(),
            alternatives: Vec::new(),
        }
    }
}

/// The highest total score achievable given the signals this transaction
/// carries, so a transaction without supplier information is not penalized
/// against one that has it.
fn max_achievable_score(txn: &Transaction) -> f64 {
    let mut max = SCORE_EXACT_AMOUNT + SCORE_DATE_SAME_WEEK;
    if txn.matched_supplier.is_some() {
        max += SCORE_SUPPLIER_EXACT;
    }
    max
}

/// Score every invoice against the transaction and rank the non-zero
/// candidates, best first. Ties break toward the most recent invoice.
pub fn find_invoice_candidates(txn: &Transaction, invoices: &[Invoice]) -> Vec<MatchCandidate> {
    let max_score = max_achievable_score(txn);
    let mut candidates: Vec<MatchCandidate> = invoices
        .iter()
        .filter_map(|invoice| {
            let amount = invoice
                .value_in(&txn.currency)
                .map(|value| amount_score(value, txn.amount))
                .unwrap_or(0.0);
            let date = date_score(Some(txn.transaction_date), invoice.invoice_date);
            let supplier =
                supplier_score(txn.matched_supplier.as_deref(), invoice.supplier.as_deref());
            let total = amount + date + supplier;
            if total <= 0.0 {
                return None;
            }

            let mut reasons = Vec::new();
            if amount == SCORE_EXACT_AMOUNT {
                reasons.push("Exact amount match".to_string());
            } else if amount > 0.0 && amount >= crate::score::SCORE_CLOSE_AMOUNT {
                reasons.push("Close amount match (within 1%)".to_string());
            } else if amount > 0.0 {
                reasons.push("Approximate amount match (within 5%)".to_string());
            }
            if date == SCORE_DATE_SAME_WEEK {
                reasons.push("Paid within a week of the invoice date".to_string());
            } else if date == SCORE_DATE_SAME_MONTH {
                reasons.push("Paid within a month of the invoice date".to_string());
            } else if date == SCORE_DATE_WITHIN_60_DAYS {
                reasons.push("Paid within 60 days of the invoice date".to_string());
            }
            if supplier == SCORE_SUPPLIER_EXACT {
                reasons.push("Supplier matches exactly".to_string());
            } else if supplier > 0.0 {
                reasons.push("Supplier name is similar".to_string());
            }

            Some(MatchCandidate {
                invoice_id: invoice.id,
                invoice_date: invoice.invoice_date,
                amount_score: amount,
                date_score: date,
                supplier_score: supplier,
                total_score: total,
                confidence: if max_score > 0.0 { total / max_score } else { 0.0 },
                reasons,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.total_score
            .partial_cmp(&a.total_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.invoice_date.cmp(&a.invoice_date))
    });
    candidates
}

/// Bounded ranking, for suggestion lists and the AI shortlist.
pub fn score_candidates(
    txn: &Transaction,
    invoices: &[Invoice],
    limit: usize,
) -> Vec<MatchCandidate> {
    let mut candidates = find_invoice_candidates(txn, invoices);
    candidates.truncate(limit);
    candidates
}

/// Rule layer: the top candidate must corroborate on all three signals at
/// once and clear the auto-accept threshold.
pub fn match_by_rules(txn: &Transaction, invoices: &[Invoice]) -> Option<MatchDecision> {
    let ranked = find_invoice_candidates(txn, invoices);
    let top = ranked.first()?;
    if top.amount_score > 0.0
        && top.date_score > 0.0
        && top.supplier_score > 0.0
        && top.confidence >= AUTO_ACCEPT_THRESHOLD
    {
        tracing::debug!(invoice_id = top.invoice_id, "rule layer accepted match");
        return Some(MatchDecision::accepted(txn.id, top, MatchMethod::Rule));
    }
    None
}

/// Tiered decision policy: rule layer, then the full score ranking, then the
/// opt-in AI fallback, else unmatched. Stateless — safe to call concurrently
/// per transaction.
pub fn auto_match_transaction(
    txn: &Transaction,
    invoices: &[Invoice],
    ai: Option<&dyn InvoiceMatchAi>,
) -> MatchDecision {
    if let Some(decision) = match_by_rules(txn, invoices) {
        return decision;
    }

    let ranked = find_invoice_candidates(txn, invoices);
    let top = ranked.first();

    if let Some(top) = top {
        if top.confidence >= AUTO_ACCEPT_THRESHOLD {
            tracing::debug!(invoice_id = top.invoice_id, "score layer accepted match");
            return MatchDecision::accepted(txn.id, top, MatchMethod::Score);
        }
    }
    let suggestion = top.filter(|t| t.confidence >= SUGGESTION_THRESHOLD);

    let closely_tied = ranked.len() >= 2
        && (ranked[0].total_score - ranked[1].total_score).abs() < TIED_SCORE_MARGIN;

    if let Some(backend) = ai {
        if (suggestion.is_none() || closely_tied) && !ranked.is_empty() {
            let shortlist = &ranked[..ranked.len().min(SUGGESTION_LIMIT)];
            match backend.best_match(&AiMatchRequest::new(txn, shortlist)) {
                Ok(verdict) => {
                    if let Some(invoice_id) = verdict.invoice_id {
                        if verdict.confidence >= SUGGESTION_THRESHOLD {
                            return MatchDecision {
                                transaction_id: txn.id,
                                auto_accepted: verdict.confidence >= AUTO_ACCEPT_THRESHOLD,
                                invoice_id: Some(invoice_id),
                                confidence: verdict.confidence,
                                method: Some(MatchMethod::Ai),
                                reasons: vec![verdict.reasoning],
                                alternatives: ranked
                                    .iter()
                                    .filter(|c| c.invoice_id != invoice_id)
                                    .take(SUGGESTION_LIMIT)
                                    .cloned()
                                    .collect(),
                            };
                        }
                    }
                    // The model declined or was unsure — keep whatever the
                    // score layer had.
                }
                Err(e) => {
                    tracing::warn!(error = %e, "AI fallback failed, degrading to score result");
                }
            }
        }
    }

    if let Some(top) = suggestion {
        return MatchDecision {
            transaction_id: txn.id,
            auto_accepted: false,
            invoice_id: Some(top.invoice_id),
            confidence: top.confidence,
            method: Some(MatchMethod::Score),
            reasons: top.reasons.clone(),
            alternatives: ranked.iter().skip(1).take(SUGGESTION_LIMIT).cloned().collect(),
        };
    }

    MatchDecision::unmatched(txn.id)
}

#[derive(Debug, Default, Serialize)]
pub struct BatchMatchSummary {
    pub matched: usize,
    pub suggested: usize,
    pub unmatched: usize,
    pub results: Vec<MatchDecision>,
}

/// Batch entry point. Transactions already resolved or ignored are skipped;
/// the rest are matched independently — there is no ordering dependency
/// between them.
pub fn auto_match_transactions(
    transactions: &[Transaction],
    invoices: &[Invoice],
    ai: Option<&dyn InvoiceMatchAi>,
) -> BatchMatchSummary {
    let mut summary = BatchMatchSummary::default();

    for txn in transactions {
        if matches!(
            txn.status,
            TransactionStatus::Resolved | TransactionStatus::Ignored
        ) {
            continue;
        }

        let decision = auto_match_transaction(txn, invoices, ai);
        if decision.auto_accepted {
            summary.matched += 1;
        } else if decision.invoice_id.is_some() {
            summary.suggested += 1;
        } else {
            summary.unmatched += 1;
        }
        summary.results.push(decision);
    }

    tracing::debug!(
        matched = summary.matched,
        suggested = summary.suggested,
        unmatched = summary.unmatched,
        "batch match complete"
    );
    summary
}
