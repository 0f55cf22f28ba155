// 🔍 EntityExtractor - Pattern matching over context windows
// IBAN-like account ids, BIC bank codes, dates, and European-notation amounts

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

// ============================================================================
// PATTERNS
// ============================================================================

fn account_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Country code, two check digits, 10-30 alphanumerics (IBAN-shaped,
    // no checksum validation at this stage)
    RE.get_or_init(|| Regex::new(r"\b[A-Z]{2}\d{2}[A-Z0-9]{10,30}\b").unwrap())
}

fn bank_code_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // BIC/SWIFT shape: 8 or 11 characters
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Z]{4}[A-Z]{2}[A-Z0-9]{2}(?:[A-Z0-9]{3})?\b").unwrap()
    })
}

fn date_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // ISO (2024-03-15) plus the day-first notations (15/03/2024, 15.03.2024)
    RE.get_or_init(|| {
        Regex::new(r"\b\d{4}-\d{2}-\d{2}\b|\b\d{2}/\d{2}/\d{4}\b|\b\d{2}\.\d{2}\.\d{4}\b")
            .unwrap()
    })
}

fn amount_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // European notation: '.' groups thousands, ',' starts decimals.
    // Bare integers count too ("999" has no separators at all).
    RE.get_or_init(|| {
        Regex::new(r"\b\d{1,3}(?:\.\d{3})+,\d{2}\b|\b\d+,\d{2}\b|\b\d+\b").unwrap()
    })
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// Extraction - Entities found in one context window
///
/// Identifiers are deduplicated (the same account twice in one window is one
/// fact). Amounts stay positional and undeduplicated: the first amount in the
/// window is the inferred transfer amount, so order matters.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Deduplicated, first-seen order
    pub account_ids: Vec<String>,
    /// Deduplicated, first-seen order
    pub bank_codes: Vec<String>,
    /// Deduplicated, first-seen order
    pub dates: Vec<String>,
    /// NOT deduplicated; normalized to plain decimal strings
    pub amounts: Vec<String>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.account_ids.is_empty()
            && self.bank_codes.is_empty()
            && self.dates.is_empty()
            && self.amounts.is_empty()
    }
}

/// Run all pattern matchers over one context string.
pub fn extract_entities(context: &str) -> Extraction {
    let account_ids = dedup_matches(account_pattern(), context);

    // An IBAN match can contain a BIC-shaped substring; drop bank codes that
    // are really fragments of an already-matched account id
    let bank_codes = dedup_matches(bank_code_pattern(), context)
        .into_iter()
        .filter(|code| !account_ids.iter().any(|acc| acc.contains(code.as_str())))
        .collect();

    let mut date_spans: Vec<(usize, usize)> = Vec::new();
    let mut seen_dates = HashSet::new();
    let mut dates = Vec::new();
    for m in date_pattern().find_iter(context) {
        date_spans.push((m.start(), m.end()));
        let value = m.as_str().trim().to_string();
        if seen_dates.insert(value.clone()) {
            dates.push(value);
        }
    }

    // Date fragments are digit runs too; a bare-integer match inside a date
    // span is part of the date, not money. Dropping them keeps the first
    // amount in the window the actual amount.
    let amounts = amount_pattern()
        .find_iter(context)
        .filter(|m| {
            !date_spans
                .iter()
                .any(|&(start, end)| m.start() < end && start < m.end())
        })
        .map(|m| normalize_amount(m.as_str()))
        .collect();

    Extraction {
        account_ids,
        bank_codes,
        dates,
        amounts,
    }
}

/// Collect matches in order of first appearance, dropping repeats.
fn dedup_matches(pattern: &Regex, text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for m in pattern.find_iter(text) {
        let value = m.as_str().trim().to_string();
        if seen.insert(value.clone()) {
            out.push(value);
        }
    }
    out
}

/// Normalize a European-notation amount to a plain decimal string:
/// `"1.234,56"` → `"1234.56"`, `"10,00"` → `"10.00"`, `"999"` → `"999"`.
pub fn normalize_amount(raw: &str) -> String {
    raw.trim().replace('.', "").replace(',', ".")
}

// ============================================================================
// TESTS
// ============================================================================
