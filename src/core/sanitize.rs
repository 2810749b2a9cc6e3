// src/core/sanitize.rs

pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space { out.push(' '); prev_space = true; }
        } else { out.push(ch); prev_space = false; }
    }
    out.trim().to_string()
}

/// Case-insensitive substring test. Both sides are lowercased, so "TECHNICAL REVIEW" matches.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Letters, digits and single spaces only; cut to `max` chars.
/// "Technical Review - Air Permit #12/3" → "Technical Review Air Permit 123"
pub fn sanitize_title(title: &str, max: usize) -> String {
    let kept: String = title
        .chars()
        .map(|ch| if ch.is_alphanumeric() { ch } else if ch.is_whitespace() || ch == '-' || ch == '_' { ' ' } else { '\0' })
        .filter(|&ch| ch != '\0')
        .collect();
    let clean = normalize_ws(&kept);
    let cut: String = clean.chars().take(max).collect();
    cut.trim_end().to_string()
}

/// Identifier part of a file name: ASCII alphanumerics only.
pub fn sanitize_identifier(id: &str) -> String {
    let out: String = id.chars().filter(char::is_ascii_alphanumeric).collect();
    if out.is_empty() { s!("unknown") } else { out }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_keeps_letters_digits_spaces() {
        assert_eq!(sanitize_title("Technical Review - Air Permit #12/3", 80), "Technical Review Air Permit 123");
        assert_eq!(sanitize_title("  a\t\tb  ", 80), "a b");
        assert_eq!(sanitize_title("***", 80), "");
    }

    #[test]
    fn title_is_cut_without_trailing_space() {
        assert_eq!(sanitize_title("abcd efgh", 5), "abcd");
    }

    #[test]
    fn identifier_fallback() {
        assert_eq!(sanitize_identifier("555"), "555");
        assert_eq!(sanitize_identifier("../"), "unknown");
    }

    #[test]
    fn contains_ci_any_casing() {
        assert!(contains_ci("TECHNICAL REVIEW memo", "technical review"));
        assert!(!contains_ci("Technical Memo", "technical review"));
    }
}
