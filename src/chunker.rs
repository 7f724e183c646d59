//! Component D: splits source text into ordered, stable, reversible chunks.

/// Split `text` on LF into groups of exactly `lines_per_chunk` lines (the
/// last group may be shorter). Rejoined with LF, chunking is
/// content-preserving up to trailing-newline normalization.
pub fn chunk(text: &str, lines_per_chunk: usize) -> Vec<String> {
    assert!(lines_per_chunk > 0, "lines_per_chunk must be positive");

    // A single trailing newline is conventional EOL, not an empty final line.
    let trimmed = text.strip_suffix('\n').unwrap_or(text);
    let lines: Vec<&str> = trimmed.split('\n').collect();
    lines
        .chunks(lines_per_chunk)
        .map(|group| group.join("\n"))
        .collect()
}
