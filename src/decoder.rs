// 🔡 Decoder - Best-effort chunk decoding
// Total function: every byte chunk decodes to usable text, no errors

use std::borrow::Cow;

// ============================================================================
// ENCODING LABEL
// ============================================================================

/// Encoding - Which candidate decoding won for a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Multi-byte variable-width candidate (decoded with replacement on
    /// invalid sequences)
    Utf8,
    /// Single-byte fallback: every byte maps to exactly one char, so this
    /// candidate can never fail
    Latin1,
}

impl Encoding {
    /// Stable label carried into emitted records
    pub fn label(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Latin1 => "latin-1",
        }
    }
}

/// Decoded - Output of one chunk decode
#[derive(Debug, Clone)]
pub struct Decoded {
    pub text: String,
    pub encoding: Encoding,
}

// ============================================================================
// DECODE
// ============================================================================

/// Decode one chunk, trying candidates in order and keeping the best score.
/// Ties go to the earlier candidate.
///
/// Chunks are decoded independently: a multi-byte sequence that straddles a
/// chunk boundary may come out mangled on both sides. Extraction works at
/// line/context granularity, so it tolerates this.
pub fn decode_chunk(bytes: &[u8]) -> Decoded {
    if bytes.is_empty() {
        return Decoded {
            text: String::new(),
            encoding: Encoding::Utf8,
        };
    }

    let utf8 = match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    };
    let utf8_score = score_candidate(&utf8);

    let latin1 = decode_latin1(bytes);
    let latin1_score = score_candidate(&latin1);

    if utf8_score >= latin1_score {
        Decoded {
            text: utf8,
            encoding: Encoding::Utf8,
        }
    } else {
        Decoded {
            text: latin1,
            encoding: Encoding::Latin1,
        }
    }
}

/// Score a candidate decoding: ratio of printable/whitespace chars to total,
/// penalized by replacement markers left behind by lossy decoding.
///
/// Pure function so the heuristic is testable on its own.
pub fn score_candidate(text: &str) -> f64 {
    let mut total = 0usize;
    let mut printable = 0usize;
    let mut replacements = 0usize;

    for c in text.chars() {
        total += 1;
        if c == '\u{FFFD}' {
            replacements += 1;
        } else if c.is_whitespace() || !c.is_control() {
            printable += 1;
        }
    }

    if total == 0 {
        return 1.0;
    }

    let printable_ratio = printable as f64 / total as f64;
    let replacement_ratio = replacements as f64 / total as f64;

    printable_ratio - replacement_ratio
}

/// Latin-1: byte value == code point. Never fails.
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

// ============================================================================
// TESTS
// ============================================================================
