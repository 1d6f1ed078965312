//! Shared utility functions

/// Truncate to at most `max_chars` characters, never splitting a code point
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Short, stable fallback id (`prefix-N`) for items supplied without one
#[must_use]
pub fn fallback_id(prefix: &str, index: usize) -> String {
    format!("{}-{}", prefix, index + 1)
}
