//! UTF-8-safe string slicing helpers, grounded on the teacher's
//! `utils/string_utils.rs`.

/// Truncate `s` to at most `max_chars` Unicode scalar values, never
/// splitting a multi-byte character.
#[inline]
#[must_use]
pub fn safe_truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        None => s,
        Some((byte_idx, _)) => &s[..byte_idx],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_at_char_boundary() {
        assert_eq!(safe_truncate_chars("hello world", 5), "hello");
    }

    #[test]
    fn leaves_short_strings_untouched() {
        assert_eq!(safe_truncate_chars("hi", 100), "hi");
    }

    #[test]
    fn does_not_split_multibyte_chars() {
        let text = "héllo";
        assert_eq!(safe_truncate_chars(text, 2), "hé");
    }
}
