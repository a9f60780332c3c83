// Text helpers shared by planner, agents and generators

/// Collapse whitespace and truncate at a word boundary.
///
/// When the collapsed text exceeds `width` chars, whole words are dropped
/// from the end until the remainder plus `placeholder` fits. Widths are
/// counted in chars, not bytes.
pub fn shorten(text: &str, width: usize, placeholder: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let collapsed = words.join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let budget = width.saturating_sub(placeholder.chars().count());
    let mut out = String::new();
    let mut used = 0usize;
    for word in words {
        let extra = if out.is_empty() { 0 } else { 1 };
        let len = word.chars().count();
        if used + extra + len > budget {
            break;
        }
        if extra == 1 {
            out.push(' ');
        }
        out.push_str(word);
        used += extra + len;
    }

    if out.is_empty() {
        return placeholder.trim_start().to_string();
    }
    out.push_str(placeholder);
    out
}

/// First `limit` chars of `text`.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Render `items` as markdown bullets, or `empty` when there are none.
pub fn bullet_lines(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorten_keeps_short_text_collapsed() {
        assert_eq!(shorten("a  b\n\nc", 20, "..."), "a b c");
    }

    #[test]
    fn test_shorten_cuts_at_word_boundary() {
        assert_eq!(shorten("hello world again", 12, "..."), "hello...");
    }

    #[test]
    fn test_shorten_counts_chars_not_bytes() {
        let text = "가나다 라마바 사아자";
        assert_eq!(shorten(text, 10, "..."), "가나다 라마바...");
    }

    #[test]
    fn test_shorten_single_long_word() {
        assert_eq!(shorten("abcdefghijkl", 5, "..."), "...");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("가나다라", 2), "가나");
        assert_eq!(truncate_chars("ab", 5), "ab");
    }

    #[test]
    fn test_bullet_lines() {
        assert_eq!(bullet_lines(&[], "- 없음"), "- 없음");
        assert_eq!(
            bullet_lines(&["a".to_string(), "b".to_string()], "- 없음"),
            "- a\n- b"
        );
    }
}
