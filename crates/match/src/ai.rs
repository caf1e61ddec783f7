use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use decont_core::Transaction;

use crate::engine::MatchCandidate;

const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum AiMatchError {
    #[error("AI matcher not configured: {0}")]
    NotConfigured(String),
    #[error("AI request failed: {0}")]
    Transport(String),
    #[error("AI returned a malformed response: {0}")]
    Malformed(String),
}

/// The transaction summary sent to the fallback — never the raw statement.
#[derive(Debug, Clone, Serialize)]
pub struct AiTransactionSummary {
    pub amount: Decimal,
    pub currency: String,
    pub transaction_date: NaiveDate,
    pub description: String,
    pub vendor_name: Option<String>,
    pub matched_supplier: Option<String>,
}

/// One shortlisted candidate with its deterministic scores and reasons.
#[derive(Debug, Clone, Serialize)]
pub struct AiCandidate {
    pub invoice_id: i64,
    pub invoice_date: Option<NaiveDate>,
    pub total_score: f64,
    pub confidence: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AiMatchRequest {
    pub transaction: AiTransactionSummary,
    pub candidates: Vec<AiCandidate>,
}

impl AiMatchRequest {
    pub fn new(txn: &Transaction, candidates: &[MatchCandidate]) -> Self {
        Self {
            transaction: AiTransactionSummary {
                amount: txn.amount,
                currency: txn.currency.clone(),
                transaction_date: txn.transaction_date,
                description: txn.description.clone(),
                vendor_name: txn.vendor_name.clone(),
                matched_supplier: txn.matched_supplier.clone(),
            },
            candidates: candidates
                .iter()
                .map(|c| AiCandidate {
                    invoice_id: c.invoice_id,
                    invoice_date: c.invoice_date,
                    total_score: c.total_score,
                    confidence: c.confidence,
                    reasons: c.reasons.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiMatchResponse {
    pub invoice_id: Option<i64>,
    pub confidence: f64,
    pub reasoning: String,
}

/// Last-resort matcher. A plain synchronous call with a hard timeout — the
/// caller's concurrency model is an integration detail, not part of this
/// contract.
pub trait InvoiceMatchAi: Send + Sync {
    fn best_match(&self, request: &AiMatchRequest) -> Result<AiMatchResponse, AiMatchError>;
}

// ── Mock backend (used for tests) ─────────────────────────────────────────────

pub struct MockMatcher {
    outcome: Result<AiMatchResponse, String>,
}

impl MockMatcher {
    pub fn returning(response: AiMatchResponse) -> Self {
        Self {
            outcome: Ok(response),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
        }
    }
}

impl InvoiceMatchAi for MockMatcher {
    fn best_match(&self, _request: &AiMatchRequest) -> Result<AiMatchResponse, AiMatchError> {
        match &self.outcome {
            Ok(r) => Ok(r.clone()),
            Err(e) => Err(AiMatchError::Transport(e.clone())),
        }
    }
}

// ── Anthropic backend ─────────────────────────────────────────────────────────

/// Matches against the Anthropic messages API. The model is instructed to
/// reply with a single JSON object; anything else is a malformed response
/// and degrades the transaction to unmatched at the call site.
pub struct ClaudeMatcher {
    api_key: String,
    model: String,
    endpoint: String,
    timeout: Duration,
}

impl ClaudeMatcher {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn prompt(request: &AiMatchRequest) -> Result<String, AiMatchError> {
        let payload = serde_json::to_string_pretty(request)
            .map_err(|e| AiMatchError::Malformed(e.to_string()))?;
        Ok(format!(
            "You match bank transactions to outstanding invoices.\n\
             Given the transaction and the scored candidate invoices below, \
             pick the invoice being paid, or null if none fits.\n\n\
             {payload}\n\n\
             Reply with exactly one JSON object, no other text:\n\
             {{\"best_match_invoice_id\": <id or null>, \"confidence\": <0.0-1.0>, \"reasoning\": \"<one sentence>\"}}"
        ))
    }
}

impl InvoiceMatchAi for ClaudeMatcher {
    fn best_match(&self, request: &AiMatchRequest) -> Result<AiMatchResponse, AiMatchError> {
        if self.api_key.is_empty() {
            return Err(AiMatchError::NotConfigured("missing API key".into()));
        }
        if request.candidates.is_empty() {
            // Nothing to choose from.
            return Ok(AiMatchResponse {
                invoice_id: None,
                confidence: 0.0,
                reasoning: "no candidates provided".into(),
            });
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| AiMatchError::Transport(e.to_string()))?;

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": 500,
            "messages": [{ "role": "user", "content": Self::prompt(request)? }],
        });

        let response = client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .map_err(|e| AiMatchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AiMatchError::Transport(format!("status {status}")));
        }

        let value: serde_json::Value = response
            .json()
            .map_err(|e| AiMatchError::Malformed(e.to_string()))?;
        let text = value["content"][0]["text"]
            .as_str()
            .ok_or_else(|| AiMatchError::Malformed("missing content text".into()))?;

        parse_reply(text)
    }
}

/// Extract the structured verdict from the model's reply. Models sometimes
/// wrap the object in prose or code fences, so everything outside the
/// outermost braces is discarded.
fn parse_reply(text: &str) -> Result<AiMatchResponse, AiMatchError> {
    #[derive(Deserialize)]
    struct Wire {
        best_match_invoice_id: Option<i64>,
        confidence: f64,
        #[serde(default)]
        reasoning: String,
    }

    let start = text
        .find('{')
        .ok_or_else(|| AiMatchError::Malformed("no JSON object in reply".into()))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| AiMatchError::Malformed("no JSON object in reply".into()))?;
    let wire: Wire = serde_json::from_str(&text[start..=end])
        .map_err(|e| AiMatchError::Malformed(e.to_string()))?;

    Ok(AiMatchResponse {
        invoice_id: wire.best_match_invoice_id,
        confidence: wire.confidence.clamp(0.0, 1.0),
        reasoning: wire.reasoning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reply_plain_object() {
        let r = parse_reply(
            r#"{"best_match_invoice_id": 7, "confidence": 0.95, "reasoning": "amount and supplier align"}"#,
        )
        .unwrap();
        assert_eq!(r.invoice_id, Some(7));
        assert_eq!(r.confidence, 0.95);
        assert_eq!(r.reasoning, "amount and supplier align");
    }

    #[test]
    fn parse_reply_null_invoice() {
        let r = parse_reply(
            r#"{"best_match_invoice_id": null, "confidence": 0.2, "reasoning": "nothing fits"}"#,
        )
        .unwrap();
        assert_eq!(r.invoice_id, None);
    }

    #[test]
    fn parse_reply_tolerates_code_fences() {
        let r = parse_reply(
            "Here is my answer:\n```json\n{\"best_match_invoice_id\": 3, \"confidence\": 0.8, \"reasoning\": \"ok\"}\n```",
        )
        .unwrap();
        assert_eq!(r.invoice_id, Some(3));
    }

    #[test]
    fn parse_reply_clamps_confidence() {
        let r = parse_reply(r#"{"best_match_invoice_id": 1, "confidence": 1.7, "reasoning": ""}"#)
            .unwrap();
        assert_eq!(r.confidence, 1.0);
    }

    #[test]
    fn parse_reply_rejects_prose() {
        assert!(matches!(
            parse_reply("I could not decide."),
            Err(AiMatchError::Malformed(_))
        ));
    }

    #[test]
    fn parse_reply_rejects_wrong_shape() {
        assert!(matches!(
            parse_reply(r#"{"invoice": "seven"}"#),
            Err(AiMatchError::Malformed(_))
        ));
    }

    #[test]
    fn claude_matcher_requires_api_key() {
        let matcher = ClaudeMatcher::new("");
        let request = AiMatchRequest {
            transaction: AiTransactionSummary {
                amount: "-100".parse().unwrap(),
                currency: "RON".into(),
                transaction_date: NaiveDate::from_ymd_opt(2025, 12, 20).unwrap(),
                description: "POS purchase".into(),
                vendor_name: None,
                matched_supplier: None,
            },
            candidates: vec![],
        };
        assert!(matches!(
            matcher.best_match(&request),
            Err(AiMatchError::NotConfigured(_))
        ));
    }

    #[test]
    fn empty_candidate_list_short_circuits() {
        let matcher = ClaudeMatcher::new("key");
        let request = AiMatchRequest {
            transaction: AiTransactionSummary {
                amount: "-100".parse().unwrap(),
                currency: "RON".into(),
                transaction_date: NaiveDate::from_ymd_opt(2025, 12, 20).unwrap(),
                description: "POS purchase".into(),
                vendor_name: None,
                matched_supplier: None,
            },
            candidates: vec![],
        };
        let r = matcher.best_match(&request).unwrap();
        assert_eq!(r.invoice_id, None);
        assert!(r.reasoning.contains("No candidates") || r.reasoning.contains("no candidates"));
    }
}
