// 🪟 ContextWindower - Joined neighborhoods of lines
// Dump text splits related fields across adjacent lines; a small window
// recovers the correlation at O(lines × radius) cost

/// Default number of neighbor lines taken on each side of a line.
pub const DEFAULT_WINDOW_RADIUS: usize = 2;

/// Build one context string per line: the space-join of lines in the
/// inclusive range `[i - radius, i + radius]`, clamped to the list bounds.
pub fn context_windows(lines: &[String], radius: usize) -> Vec<String> {
    lines
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let start = i.saturating_sub(radius);
            let end = (i + radius + 1).min(lines.len());
            lines[start..end].join(" ")
        })
        .collect()
}
