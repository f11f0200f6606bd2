//! UTF-8 safe text truncation shared by compaction, memory previews and
//! the core-memory builder.

/// Byte offset of the `max_chars`-th character, or `None` when `text` has
/// at most `max_chars` characters.
pub fn char_cut(text: &str, max_chars: usize) -> Option<usize> {
    text.char_indices().nth(max_chars).map(|(i, _)| i)
}

/// Keep the first `max_chars` characters of `text`, appending `marker`
/// when anything was cut. Returns the result and whether it was truncated.
pub fn truncate_chars(text: &str, max_chars: usize, marker: &str) -> (String, bool) {
    match char_cut(text, max_chars) {
        None => (text.to_string(), false),
        Some(cut) => {
            let mut out = String::with_capacity(cut + marker.len());
            out.push_str(&text[..cut]);
            out.push_str(marker);
            (out, true)
        }
    }
}
