use std::sync::LazyLock;

use regex::Regex;

/// A name split into first/last components. `is_complete` is false when the
/// input had fewer than two whitespace-separated tokens (middle tokens, if
/// any, are discarded — only first and last survive).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedName {
    pub first: String,
    pub last: String,
    pub is_complete: bool,
}

pub fn parse_name(name: &str) -> ParsedName {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return ParsedName::default();
    }
    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    if parts.len() < 2 {
        return ParsedName {
            first: parts.first().copied().unwrap_or("").to_string(),
            last: String::new(),
            is_complete: false,
        };
    }
    ParsedName {
        first: parts[0].to_string(),
        last: parts[parts.len() - 1].to_string(),
        is_complete: true,
    }
}

/// Mirrors Python's `str.title()`: each run of alphabetic characters gets
/// its first letter capitalized and the rest lowercased, with any
/// non-alphabetic character (space, hyphen, apostrophe) resetting the
/// word boundary. Used before roster lookups, since stored names are
/// title-cased.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[.,'"()]"#).unwrap());

/// Lowercase, collapse whitespace, and strip `. , ' " ( )`. Hyphens are kept.
pub fn normalize_name(name: &str) -> String {
    let collapsed = name.trim().to_lowercase();
    let collapsed: String = collapsed.split_whitespace().collect::<Vec<_>>().join(" ");
    PUNCTUATION.replace_all(&collapsed, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_name_handles_middle_tokens() {
        let parsed = parse_name("Mary Jane Smith");
        assert_eq!(parsed.first, "Mary");
        assert_eq!(parsed.last, "Smith");
        assert!(parsed.is_complete);
    }

    #[test]
    fn parse_name_single_token_is_incomplete() {
        let parsed = parse_name("Cher");
        assert_eq!(parsed.first, "Cher");
        assert_eq!(parsed.last, "");
        assert!(!parsed.is_complete);
    }

    #[test]
    fn parse_name_empty_input() {
        let parsed = parse_name("   ");
        assert_eq!(parsed, ParsedName::default());
    }

    #[test]
    fn normalize_name_strips_punctuation_and_case() {
        assert_eq!(normalize_name("  O'Brien, Jr.  "), "obrien jr");
        assert_eq!(normalize_name("Simon-Harris"), "simon-harris");
        assert_eq!(normalize_name("Mary   Jane"), "mary jane");
    }

    #[test]
    fn title_case_matches_python_str_title() {
        assert_eq!(title_case("mary"), "Mary");
        assert_eq!(title_case("VAN DER BERG"), "Van Der Berg");
        assert_eq!(title_case("o'brien"), "O'Brien");
        assert_eq!(title_case("simon-harris"), "Simon-Harris");
    }
}
