/// Split a last name into lowercase words on whitespace and hyphens.
///
/// "Simon-Harris" -> ["simon", "harris"], "De La Cruz" -> ["de", "la", "cruz"]
pub fn split_last_name_words(last_name: &str) -> Vec<String> {
    last_name
        .trim()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// True if `search_last` is the database last name exactly, or is a suffix
/// of it word-by-word (handles compound/hyphenated surnames).
pub fn last_name_matches(search_last: &str, db_last: &str) -> bool {
    let search_words = split_last_name_words(search_last);
    let db_words = split_last_name_words(db_last);

    if search_words.is_empty() || db_words.is_empty() {
        return false;
    }

    if search_words == db_words {
        return true;
    }

    if search_words.len() <= db_words.len() {
        let suffix = &db_words[db_words.len() - search_words.len()..];
        if suffix == search_words.as_slice() {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_matches_compound_surnames() {
        assert!(last_name_matches("Zarlin", "Simons Zarlin"));
        assert!(last_name_matches("Harris", "Simon-Harris"));
        assert!(last_name_matches("Cruz", "De La Cruz"));
        assert!(last_name_matches("La Cruz", "De La Cruz"));
    }

    #[test]
    fn exact_match() {
        assert!(last_name_matches("Zarlin", "Zarlin"));
    }

    #[test]
    fn rejects_substring_that_is_not_word_suffix() {
        assert!(!last_name_matches("Smith", "Goldsmith"));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(!last_name_matches("", "Zarlin"));
        assert!(!last_name_matches("Zarlin", ""));
    }
}
