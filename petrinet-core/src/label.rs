//! Label generation over a set of labels already in use.

/// Returns `prefix<N>` for the lowest N not yet taken.
pub fn sequence_label(prefix: &str, taken: impl Fn(&str) -> bool) -> String {
    (0u64..)
        .map(|n| format!("{}{}", prefix, n))
        .find(|label| !taken(label))
        .unwrap_or_else(|| prefix.to_string())
}

/// Resolves a label collision by bumping a trailing number.
///
/// `foo` becomes `foo1`, `foo1` becomes `foo2`, `foo9` becomes `foo10`,
/// repeating until a free label is found.
pub fn next_free_label(label: &str, taken: impl Fn(&str) -> bool) -> String {
    let mut candidate = label.to_string();
    while taken(&candidate) {
        candidate = bump_suffix(&candidate);
    }
    candidate
}

fn bump_suffix(label: &str) -> String {
    let stem = label.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &label[stem.len()..];
    match digits.parse::<u64>() {
        Ok(n) => format!("{}{}", stem, n + 1),
        // Empty or too long to parse.
        Err(_) => format!("{}1", label),
    }
}
