// src/util.rs — Small string helpers

/// Clip `s` to at most `max_len` bytes without splitting a UTF-8 character.
///
/// Used to keep provider error bodies short in messages and logs.
pub fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
