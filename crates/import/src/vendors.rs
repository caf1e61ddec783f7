use std::path::PathBuf;
use std::sync::{Arc, OnceLock, RwLock};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use decont_core::{Transaction, TransactionStatus, TransactionType};

/// A regex-to-supplier mapping used to recognize recurring payees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorRule {
    pub id: Option<i64>,
    pub pattern: String,
    pub supplier_name: String,
    pub supplier_vat: Option<String>,
    pub template_id: Option<i64>,
}

#[derive(Debug, Error)]
pub enum RuleStoreError {
    #[error("rule store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read rule file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse rule file: {0}")]
    Parse(String),
}

/// Source of vendor rules — read-mostly, reloaded on demand.
pub trait VendorRuleStore: Send + Sync {
    fn load_rules(&self) -> Result<Vec<VendorRule>, RuleStoreError>;
}

/// Fixed in-memory rule set.
pub struct StaticRuleStore {
    rules: Vec<VendorRule>,
}

impl StaticRuleStore {
    pub fn new(rules: Vec<VendorRule>) -> Self {
        Self { rules }
    }
}

impl VendorRuleStore for StaticRuleStore {
    fn load_rules(&self) -> Result<Vec<VendorRule>, RuleStoreError> {
        Ok(self.rules.clone())
    }
}

/// File-backed rule store: a TOML document of `[[rule]]` tables.
pub struct TomlRuleStore {
    path: PathBuf,
}

#[derive(Deserialize)]
struct RuleFile {
    #[serde(default)]
    rule: Vec<VendorRule>,
}

impl TomlRuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl VendorRuleStore for TomlRuleStore {
    fn load_rules(&self) -> Result<Vec<VendorRule>, RuleStoreError> {
        let content = std::fs::read_to_string(&self.path)?;
        let file: RuleFile =
            toml::from_str(&content).map_err(|e| RuleStoreError::Parse(e.to_string()))?;
        Ok(file.rule)
    }
}

/// A rule paired with its precompiled regex.
struct CompiledVendorRule {
    rule: VendorRule,
    regex: Regex,
}

/// The result of matching one description against the vendor registry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VendorMatch {
    pub matched: bool,
    /// Best-effort readable name, present even when no rule matched.
    pub vendor_name: Option<String>,
    pub supplier_name: Option<String>,
    pub supplier_vat: Option<String>,
    pub template_id: Option<i64>,
    pub rule_id: Option<i64>,
}

/// Thread-safe registry of compiled vendor rules.
///
/// Readers share an immutable snapshot; a reload compiles the new rule list
/// on a private copy and publishes it with a single pointer swap, so a
/// concurrent reader sees either the old list or the full new one, never a
/// mix and never a partially-built set.
pub struct VendorMatcher {
    store: Box<dyn VendorRuleStore>,
    cache: RwLock<Option<Arc<Vec<CompiledVendorRule>>>>,
}

impl VendorMatcher {
    pub fn new(store: impl VendorRuleStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            cache: RwLock::new(None),
        }
    }

    fn compile(rules: Vec<VendorRule>) -> Vec<CompiledVendorRule> {
        rules
            .into_iter()
            .filter_map(|rule| {
                match RegexBuilder::new(&rule.pattern).case_insensitive(true).build() {
                    Ok(regex) => Some(CompiledVendorRule { rule, regex }),
                    Err(e) => {
                        // A bad rule is excluded, never propagated.
                        tracing::error!(pattern = %rule.pattern, error = %e, "invalid vendor rule regex");
                        None
                    }
                }
            })
            .collect()
    }

    fn snapshot(&self) -> Result<Arc<Vec<CompiledVendorRule>>, RuleStoreError> {
        if let Some(rules) = self
            .cache
            .read()
            .expect("vendor rule cache lock poisoned")
            .as_ref()
        {
            return Ok(Arc::clone(rules));
        }

        // Compile off-lock; first publisher wins if two loaders race.
        let compiled = Arc::new(Self::compile(self.store.load_rules()?));
        tracing::info!(count = compiled.len(), "loaded vendor rules");
        let mut guard = self.cache.write().expect("vendor rule cache lock poisoned");
        let published = guard.get_or_insert_with(|| compiled);
        Ok(Arc::clone(published))
    }

    /// Force a reload from the store. Readers keep the old snapshot until the
    /// swap and are only blocked for its duration.
    pub fn reload(&self) -> Result<usize, RuleStoreError> {
        let compiled = Arc::new(Self::compile(self.store.load_rules()?));
        let count = compiled.len();
        *self.cache.write().expect("vendor rule cache lock poisoned") = Some(compiled);
        tracing::info!(count, "reloaded vendor rules");
        Ok(count)
    }

    /// Drop the cached snapshot; the next match loads fresh rules.
    pub fn invalidate(&self) {
        *self.cache.write().expect("vendor rule cache lock poisoned") = None;
    }

    /// Resolve a transaction description to a vendor, and to a known supplier
    /// identity when a rule matches. A store failure degrades to "unmatched".
    pub fn match_description(&self, description: &str) -> VendorMatch {
        let mut result = VendorMatch::default();
        if description.is_empty() {
            return result;
        }

        result.vendor_name = extract_vendor_name(description);

        let rules = match self.snapshot() {
            Ok(rules) => rules,
            Err(e) => {
                tracing::error!(error = %e, "vendor rules unavailable");
                return result;
            }
        };

        for compiled in rules.iter() {
            if compiled.regex.is_match(description) {
                result.matched = true;
                result.supplier_name = Some(compiled.rule.supplier_name.clone());
                result.supplier_vat = compiled.rule.supplier_vat.clone();
                result.template_id = compiled.rule.template_id;
                result.rule_id = compiled.rule.id;
                tracing::debug!(
                    supplier = %compiled.rule.supplier_name,
                    "vendor rule matched"
                );
                return result;
            }
        }

        result
    }
}

/// Well-known payee signatures, checked in order; first match wins.
fn signature_table() -> &'static Vec<(Regex, &'static str)> {
    static TABLE: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        [
            (r"FACEBK\s*\*\w+", "FACEBK"),
            (r"GOOGLE\s*\*\s*ADS\d+", "GOOGLE ADS"),
            (r"GOOGLE\s*CLOUD\s*\w+", "GOOGLE CLOUD"),
            (r"CLAUDE\.AI\s*\w*", "CLAUDE.AI"),
            (r"OPENAI\s*\*\s*CHATGPT\s*\w*", "OPENAI CHATGPT"),
            (r"DIGITALOCEAN\.?COM?", "DIGITALOCEAN"),
            (r"DREAMSTIME\.?COM?", "DREAMSTIME"),
            (r"SHOPIFY\s*\*\s*\d+", "SHOPIFY"),
            (r"Intuit\s*Mailchimp", "MAILCHIMP"),
            (r"ANCPI\s*NETOPIA", "ANCPI"),
            (r"tarom\.ro", "TAROM"),
            (r"ONRC", "ONRC"),
            (r"MPY\*hisky", "HISKY"),
            (r"ANIMA\s*WINGS", "ANIMA WINGS"),
            (r"AWESOME\s*PROJECTS", "AWESOME PROJECTS"),
            (r"AIRALO", "AIRALO"),
        ]
        .into_iter()
        .map(|(pattern, name)| {
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .expect("invalid vendor signature");
            (regex, name)
        })
        .collect()
    })
}

fn fallback_name_pattern() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    // A capitalized token sequence following a YYYY.MM.DD timestamp.
    R.get_or_init(|| {
        Regex::new(r"\d{4}\.\d{2}\.\d{2}\s+([A-Z][A-Za-z0-9.*]+(?:\s+[A-Z][A-Za-z0-9]+)?)")
            .expect("invalid regex")
    })
}

/// Best-effort readable vendor name from a raw description.
pub fn extract_vendor_name(description: &str) -> Option<String> {
    if description.is_empty() {
        return None;
    }

    for (regex, name) in signature_table() {
        if regex.is_match(description) {
            return Some((*name).to_string());
        }
    }

    fallback_name_pattern()
        .captures(description)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Annotate parsed transactions with vendor matches and set their status:
/// internal top-ups are auto-ignored, everything else starts pending.
pub fn apply_vendor_matches(transactions: &mut [Transaction], matcher: &VendorMatcher) {
    for txn in transactions.iter_mut() {
        let vendor = matcher.match_description(&txn.description);
        txn.vendor_name = vendor.vendor_name;
        txn.matched_supplier = vendor.supplier_name;
        txn.status = if txn.transaction_type == TransactionType::Internal {
            TransactionStatus::Ignored
        } else {
            TransactionStatus::Pending
        };
    }
}

/// Unique, sorted vendor names of still-pending transactions — feed for
/// suggesting new rules to create.
pub fn unmatched_vendor_names(transactions: &[Transaction]) -> Vec<String> {
    let mut names: Vec<String> = transactions
        .iter()
        .filter(|t| t.status == TransactionStatus::Pending)
        .filter_map(|t| t.vendor_name.clone())
        .collect();
    names.sort();
    names.dedup();
    names
}
