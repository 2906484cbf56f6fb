//! Small text scanning helpers shared by the encodings and the matcher.

pub const WHITESPACE: &str = " \n\t";

/// Whether every char of `text` is drawn from `allowed`. True for empty text.
pub fn contains_only(text: &str, allowed: &str) -> bool {
    text.chars().all(|c| allowed.contains(c))
}

/// Longest prefix of `text` made only of chars from `allowed`.
pub fn head_match<'a>(text: &'a str, allowed: &str) -> &'a str {
    head_match_while(text, |c| allowed.contains(c))
}

pub fn head_match_while(text: &str, predicate: impl Fn(char) -> bool) -> &str {
    let end = text
        .char_indices()
        .find(|&(_, c)| !predicate(c))
        .map_or(text.len(), |(i, _)| i);
    &text[..end]
}

/// Prefix of `text` before the first occurence of `delimiter`, the whole text if there is none.
pub fn head_match_until<'a>(text: &'a str, delimiter: &str) -> &'a str {
    match text.find(delimiter) {
        Some(end) => &text[..end],
        None => text,
    }
}

pub fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub fn skip_whitespace(text: &str) -> usize {
    head_match_while(text, |c| c.is_ascii_whitespace()).len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_match() {
        assert_eq!(head_match("aababc", "ab"), "aabab");
        assert_eq!(head_match("cab", "ab"), "");
        assert_eq!(head_match("", "ab"), "");
        assert_eq!(head_match("ééa", "é"), "éé");
    }

    #[test]
    fn test_helpers() {
        assert!(contains_only("abba", "ab"));
        assert!(!contains_only("abc", "ab"));
        assert!(contains_only("", "ab"));
        assert_eq!(head_match_until("rule list,[x]", ","), "rule list");
        assert_eq!(head_match_until("rule list", ","), "rule list");
        assert_eq!(skip_whitespace(" \n\t x"), 4);
    }
}
