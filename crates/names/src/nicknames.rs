use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Sets of interchangeable first names (full name plus common nicknames).
pub static DEFAULT_NICKNAME_GROUPS: LazyLock<Vec<HashSet<&'static str>>> = LazyLock::new(|| {
    [
        &["mike", "michael"][..],
        &["matt", "matthew"],
        &["ben", "benjamin"],
        &["sam", "samuel"],
        &["kate", "katie", "katherine", "kathryn", "catherine"],
        &["liz", "elizabeth", "beth", "lizzie"],
        &["alex", "alexander", "alexandra"],
        &["chris", "christopher", "christina", "christine"],
        &["dan", "daniel", "danny"],
        &["rob", "robert", "robbie", "bobby", "bob"],
        &["nick", "nicholas", "nicky"],
        &["tom", "thomas", "tommy"],
        &["will", "william", "willy", "billy", "bill"],
        &["dave", "david", "davey"],
        &["john", "johnny", "jack"],
        &["joe", "joseph", "joey"],
        &["steve", "steven", "stephen"],
        &["andy", "andrew", "drew"],
        &["jim", "james", "jimmy", "jamie"],
        &["tim", "timothy", "timmy"],
        &["pete", "peter"],
        &["greg", "gregory"],
        &["josh", "joshua"],
        &["zach", "zachary", "zack"],
        &["jake", "jacob"],
        &["maddie", "madison", "madeline", "madeleine"],
        &["abby", "abigail", "abbey"],
        &["becca", "rebecca", "becky", "rebekah"],
        &["jess", "jessica", "jessie"],
        &["jen", "jennifer", "jenny"],
        &["sara", "sarah"],
        &["rachael", "rachel"],
        &["rick", "richard", "ricky", "dick"],
        &["chuck", "charles", "charlie"],
        &["ted", "theodore", "teddy"],
        &["ed", "edward", "eddie"],
        &["frank", "francis"],
        &["hank", "henry"],
        &["jerry", "jerome", "gerald"],
        &["larry", "lawrence"],
        &["pat", "patrick", "patricia"],
        &["ron", "ronald", "ronnie"],
        &["terry", "terence", "teresa"],
        &["tony", "anthony"],
        &["vince", "vincent", "vinny"],
    ]
    .into_iter()
    .map(|group| group.iter().copied().collect())
    .collect()
});

/// Common spelling variations that aren't really nicknames. Bidirectional.
pub static SPELLING_VARIATIONS: LazyLock<HashMap<&'static str, Vec<&'static str>>> =
    LazyLock::new(|| {
        [
            ("blooma", vec!["bluma", "blouma"]),
            ("bluma", vec!["blooma", "blouma"]),
            ("chloe", vec!["chloey", "khloe"]),
            ("zoe", vec!["zoey", "zooey", "zoie"]),
            ("sarah", vec!["sara"]),
            ("sara", vec!["sarah"]),
            ("rachel", vec!["rachael"]),
            ("rachael", vec!["rachel"]),
            ("rebecca", vec!["rebekah", "becca"]),
            ("rebekah", vec!["rebecca"]),
            ("katherine", vec!["kathryn", "catherine"]),
            ("kathryn", vec!["katherine", "catherine"]),
            ("catherine", vec!["katherine", "kathryn"]),
            ("stephen", vec!["steven"]),
            ("steven", vec!["stephen"]),
            ("jeffrey", vec!["geoffrey"]),
            ("geoffrey", vec!["jeffrey"]),
            ("philip", vec!["phillip"]),
            ("phillip", vec!["philip"]),
            ("bryan", vec!["brian"]),
            ("brian", vec!["bryan"]),
            ("shaun", vec!["shawn", "sean"]),
            ("shawn", vec!["shaun", "sean"]),
            ("sean", vec!["shaun", "shawn"]),
        ]
        .into_iter()
        .collect()
    });

/// Custom nickname groups sourced from configuration, keyed by full name ->
/// variations, converted to the same set-of-interchangeable-names shape as
/// [`DEFAULT_NICKNAME_GROUPS`].
pub fn groups_from_overrides(overrides: &HashMap<String, Vec<String>>) -> Vec<HashSet<String>> {
    let mut groups = Vec::new();
    let mut processed = HashSet::new();

    for (full_name, nicknames) in overrides {
        let full_lower = full_name.to_lowercase();
        if processed.contains(&full_lower) {
            continue;
        }
        let mut group: HashSet<String> = HashSet::new();
        group.insert(full_lower.clone());
        group.extend(nicknames.iter().map(|n| n.to_lowercase()));
        processed.extend(group.iter().cloned());
        groups.push(group);
    }

    groups
}

fn default_groups_as_owned() -> Vec<HashSet<String>> {
    DEFAULT_NICKNAME_GROUPS
        .iter()
        .map(|group| group.iter().map(|s| s.to_string()).collect())
        .collect()
}

/// Returns the override groups if provided and non-empty, else the defaults.
pub fn nickname_groups(overrides: Option<&HashMap<String, Vec<String>>>) -> Vec<HashSet<String>> {
    match overrides {
        Some(map) if !map.is_empty() => groups_from_overrides(map),
        _ => default_groups_as_owned(),
    }
}

/// All nickname and spelling variations of `name`, excluding `name` itself.
pub fn find_nickname_variations(
    name: &str,
    overrides: Option<&HashMap<String, Vec<String>>>,
) -> Vec<String> {
    let name_lower = name.to_lowercase();
    let mut variations: HashSet<String> = HashSet::new();

    for group in nickname_groups(overrides) {
        if group.contains(&name_lower) {
            variations.extend(group.into_iter().filter(|n| n != &name_lower));
            break;
        }
    }

    if let Some(spellings) = SPELLING_VARIATIONS.get(name_lower.as_str()) {
        variations.extend(spellings.iter().map(|s| s.to_string()));
    }

    variations.into_iter().collect()
}

/// True if two names match exactly, via a shared nickname group, or via the
/// bidirectional spelling-variation table.
pub fn names_match_via_nicknames(
    name1: &str,
    name2: &str,
    overrides: Option<&HashMap<String, Vec<String>>>,
) -> bool {
    let name1_lower = name1.to_lowercase();
    let name1_lower = name1_lower.trim();
    let name2_lower = name2.to_lowercase();
    let name2_lower = name2_lower.trim();

    if name1_lower == name2_lower {
        return true;
    }

    for group in nickname_groups(overrides) {
        if group.contains(name1_lower) && group.contains(name2_lower) {
            return true;
        }
    }

    if let Some(variants) = SPELLING_VARIATIONS.get(name1_lower) {
        if variants.contains(&name2_lower) {
            return true;
        }
    }
    if let Some(variants) = SPELLING_VARIATIONS.get(name2_lower) {
        if variants.contains(&name1_lower) {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_within_a_nickname_group() {
        assert!(names_match_via_nicknames("Mike", "Michael", None));
        assert!(names_match_via_nicknames("bob", "ROBERT", None));
    }

    #[test]
    fn matches_via_spelling_variation() {
        assert!(names_match_via_nicknames("Sarah", "sara", None));
        assert!(names_match_via_nicknames("zoe", "Zoey", None));
    }

    #[test]
    fn rejects_unrelated_names() {
        assert!(!names_match_via_nicknames("Mike", "Sarah", None));
    }

    #[test]
    fn override_groups_replace_defaults() {
        let mut overrides = HashMap::new();
        overrides.insert("alexandra".to_string(), vec!["ali".to_string()]);
        assert!(names_match_via_nicknames("alexandra", "Ali", Some(&overrides)));
        // "alex" is only in the default group, not in the override set.
        assert!(!names_match_via_nicknames("alexandra", "alex", Some(&overrides)));
    }

    #[test]
    fn variations_exclude_the_input_name() {
        let variations = find_nickname_variations("mike", None);
        assert!(variations.contains(&"michael".to_string()));
        assert!(!variations.contains(&"mike".to_string()));
    }
}
