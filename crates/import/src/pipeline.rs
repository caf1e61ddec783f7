use decont_core::ParsedStatement;

use crate::fingerprint::{TransactionIndex, filter_new};
use crate::header::{extract_header, extract_summary};
use crate::segment::{ParserConfig, extract_transactions};
use crate::vendors::{VendorMatcher, apply_vendor_matches};

/// Upstream text extraction — a byte-stream-to-string collaborator.
/// Best effort: an extraction failure yields an empty string, which the
/// parser treats as "zero transactions", not an error.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> String;
}

/// Passthrough extractor for already-extracted uploads (and tests).
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// Orchestrates one statement upload: extract text → header + summary →
/// segment into transactions → vendor-match → optional dedup filter.
///
/// Parsing is synchronous and strictly line-ordered. Concurrent uploads may
/// run in independent threads; the only shared state is the vendor matcher.
pub struct StatementPipeline<E: TextExtractor> {
    extractor: E,
    config: ParserConfig,
}

impl<E: TextExtractor> StatementPipeline<E> {
    pub fn new(extractor: E, config: ParserConfig) -> Self {
        Self { extractor, config }
    }

    /// Parse raw statement bytes without vendor annotation.
    pub fn parse_bytes(&self, bytes: &[u8], filename: Option<&str>) -> ParsedStatement {
        let text = self.extractor.extract_text(bytes);
        self.parse_text(&text, filename)
    }

    /// Parse pre-extracted statement text.
    pub fn parse_text(&self, text: &str, filename: Option<&str>) -> ParsedStatement {
        if text.trim().is_empty() {
            tracing::warn!("statement text is empty, emitting zero transactions");
            return ParsedStatement {
                filename: filename.map(|f| f.to_string()),
                ..ParsedStatement::default()
            };
        }

        let header = extract_header(text);
        let summary = extract_summary(text);
        let (transactions, skipped) = extract_transactions(text, &header, &self.config, filename);
        tracing::debug!(
            transactions = transactions.len(),
            skipped = skipped.len(),
            "parsed statement"
        );

        ParsedStatement {
            header,
            summary,
            transactions,
            skipped,
            filename: filename.map(|f| f.to_string()),
        }
    }

    /// Full ingestion: parse, vendor-match, and drop already-recorded
    /// transactions when an index is supplied.
    pub fn ingest(
        &self,
        bytes: &[u8],
        filename: Option<&str>,
        vendors: &VendorMatcher,
        index: Option<&dyn TransactionIndex>,
    ) -> ParsedStatement {
        let mut statement = self.parse_bytes(bytes, filename);
        apply_vendor_matches(&mut statement.transactions, vendors);
        if let Some(index) = index {
            statement.transactions = filter_new(std::mem::take(&mut statement.transactions), index);
        }
        statement
    }
}
