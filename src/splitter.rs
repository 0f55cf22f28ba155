// ✂️ LineSplitter - Logical line reconstruction with tail carry-over
// Dump files separate records with newlines AND assorted control bytes

// ============================================================================
// DELIMITERS
// ============================================================================

/// Soft record separators seen in semi-structured binary dumps: the textual
/// newline variants plus a handful of control bytes that pad fixed-width
/// regions between text fields.
const SEPARATORS: &[char] = &[
    '\n',       // LF
    '\r',       // CR
    '\u{0000}', // NUL padding
    '\u{000B}', // vertical tab
    '\u{000C}', // form feed
    '\u{001C}', // file separator
    '\u{001D}', // group separator
    '\u{001E}', // record separator
    '\u{001F}', // unit separator
];

/// SplitOutcome - Completed lines plus the fragment carried to the next chunk
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    /// Whitespace-collapsed, trimmed, non-empty lines
    pub lines: Vec<String>,
    /// Raw trailing fragment; never assumed complete. Prepend it to the next
    /// chunk's decoded text before the next split.
    pub tail: String,
}

// ============================================================================
// SPLIT
// ============================================================================

/// Split `tail + decoded` into completed lines and a new tail.
///
/// The last fragment after splitting is always held back as the tail, even
/// when it looks complete; only a trailing separator proves completeness,
/// and then the tail comes back empty.
pub fn split_lines(tail: &str, decoded: &str) -> SplitOutcome {
    let mut combined = String::with_capacity(tail.len() + decoded.len());
    combined.push_str(tail);
    combined.push_str(decoded);

    let mut pieces: Vec<&str> = combined.split(SEPARATORS).collect();
    // split() always yields at least one element
    let new_tail = pieces.pop().unwrap_or("").to_string();

    let lines = pieces
        .into_iter()
        .map(collapse_whitespace)
        .filter(|l| !l.is_empty())
        .collect();

    SplitOutcome {
        lines,
        tail: new_tail,
    }
}

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// TESTS
// ============================================================================
