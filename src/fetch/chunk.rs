//! Markdown chunking (spec.md §4.5, §8).
//!
//! Operates over `Vec<char>` rather than raw byte slices so that cut
//! points never land inside a multi-byte character.

pub const DEFAULT_CHUNK_SIZE: usize = 6_000;
const OVERLAP: usize = 200;
const MIN_FRAGMENT: usize = 50;

/// Split `text` into chunks of at most `chunk_size` chars, overlapping by
/// up to [`OVERLAP`] chars at each boundary. If `native_token_count` is
/// known and `native_token_count * 4 <= chunk_size`, the whole text is
/// returned as a single chunk without scanning for boundaries.
#[must_use]
pub fn chunk(text: &str, native_token_count: Option<usize>, chunk_size: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if let Some(tokens) = native_token_count {
        if tokens * 4 <= chunk_size {
            return vec![text.to_string()];
        }
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let mut raw_chunks = Vec::new();
    let mut start = 0usize;
    while start < chars.len() {
        let remaining = chars.len() - start;
        if remaining <= chunk_size {
            raw_chunks.push(chars[start..].iter().collect::<String>());
            break;
        }

        let window_start = start + chunk_size / 2;
        let window_end = (start + chunk_size).min(chars.len());
        let cut = find_cut(&chars, window_start, window_end);

        raw_chunks.push(chars[start..cut].iter().collect::<String>());
        let next_start = cut.saturating_sub(OVERLAP);
        start = if next_start > start { next_start } else { cut };
    }

    let filtered: Vec<String> =
        raw_chunks.into_iter().filter(|c| c.chars().count() >= MIN_FRAGMENT).collect();

    if filtered.is_empty() {
        vec![text.to_string()]
    } else {
        filtered
    }
}

/// Find the best split point in `[window_start, window_end)`: heading
/// boundary (`\n#`) preferred, paragraph boundary (`\n\n`) next, line
/// boundary (`\n`) last, else a hard cut at `window_end`.
fn find_cut(chars: &[char], window_start: usize, window_end: usize) -> usize {
    let window_end = window_end.min(chars.len());
    if window_start >= window_end {
        return window_end;
    }

    let mut heading = None;
    let mut paragraph = None;
    let mut line = None;

    for i in (window_start..window_end).rev() {
        if chars[i] != '\n' {
            continue;
        }
        if heading.is_none() && chars.get(i + 1) == Some(&'#') {
            heading = Some(i);
        }
        if paragraph.is_none() && chars.get(i + 1) == Some(&'\n') {
            paragraph = Some(i);
        }
        if line.is_none() {
            line = Some(i);
        }
        if heading.is_some() {
            break;
        }
    }

    heading.or(paragraph).or(line).unwrap_or(window_end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_when_under_size() {
        let text = "short document";
        assert_eq!(chunk(text, None, DEFAULT_CHUNK_SIZE), vec![text.to_string()]);
    }

    #[test]
    fn single_chunk_when_native_tokens_fit() {
        let text = "x".repeat(10_000);
        let chunks = chunk(&text, Some(100), DEFAULT_CHUNK_SIZE);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn splits_long_text_on_heading_boundary() {
        let mut text = String::new();
        text.push_str(&"a".repeat(3_500));
        text.push_str("\n# Next Section\n");
        text.push_str(&"b".repeat(3_500));
        let chunks = chunk(&text, None, 6_000);
        assert!(chunks.len() >= 2);
        assert!(chunks[1].trim_start().starts_with('#'));
    }

    #[test]
    fn splitting_never_yields_a_fragment_below_minimum() {
        let text = "a".repeat(6_100) + "\n\n" + &"b".repeat(40);
        let chunks = chunk(&text, None, 6_000);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() >= 50));
    }

    #[test]
    fn never_returns_empty_for_nonempty_input() {
        let text = "a".repeat(20_000);
        let chunks = chunk(&text, None, 6_000);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk("", None, 6_000).is_empty());
    }
}
