/// Soundex code for `name`: first letter kept, consonants mapped to digits,
/// vowels/H/W/Y dropped, consecutive duplicate digits collapsed, padded or
/// truncated to 4 characters. Empty input yields `"0000"`.
pub fn soundex(name: &str) -> String {
    if name.is_empty() {
        return "0000".to_string();
    }

    let upper: Vec<char> = name.to_uppercase().chars().collect();
    let mut code = String::new();
    code.push(upper[0]);

    let mapping = |c: char| -> &'static str {
        match c {
            'B' | 'F' | 'P' | 'V' => "1",
            'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => "2",
            'D' | 'T' => "3",
            'L' => "4",
            'M' | 'N' => "5",
            'R' => "6",
            _ => "0",
        }
    };

    let mut last_digit = mapping(upper[0]);
    for &letter in &upper[1..] {
        let digit = mapping(letter);
        if digit != "0" && digit != last_digit {
            code.push_str(digit);
        }
        last_digit = digit;
    }

    code.truncate(4);
    while code.len() < 4 {
        code.push('0');
    }
    code
}

const REPLACEMENTS: &[(&str, &str)] = &[
    ("DGE", "J"),
    ("TIO", "SH"),
    ("TIA", "SH"),
    ("TCH", "CH"),
    ("CK", "K"),
    ("PH", "F"),
    ("GH", ""),
    ("TH", "T"),
    ("Q", "K"),
    ("V", "F"),
    ("Z", "S"),
    ("X", "KS"),
    ("C", "K"),
    ("H", ""),
];

/// Simplified (non-canonical) Metaphone code for `name`: strips non-letters,
/// rewrites a handful of prefixes and ordered digraphs, then collapses
/// consecutive duplicate letters.
pub fn metaphone(name: &str) -> String {
    let letters_only: String = name.chars().filter(|c| c.is_alphabetic()).collect::<String>().to_uppercase();
    if letters_only.is_empty() {
        return String::new();
    }

    let mut result = letters_only;
    if result.starts_with("KN") || result.starts_with("GN") || result.starts_with("PN") {
        result = format!("N{}", &result[2..]);
    } else if result.starts_with("WR") {
        result = format!("R{}", &result[2..]);
    }

    for (old, new) in REPLACEMENTS {
        result = result.replace(old, new);
    }

    let mut simplified = String::new();
    let mut last_char: Option<char> = None;
    for ch in result.chars() {
        if Some(ch) != last_char {
            simplified.push(ch);
            last_char = Some(ch);
        }
    }
    simplified
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soundex_classic_examples() {
        assert_eq!(soundex("Robert"), "R163");
        assert_eq!(soundex("Rupert"), "R163");
        assert_eq!(soundex("Ashcraft"), "A226");
    }

    #[test]
    fn soundex_empty_input() {
        assert_eq!(soundex(""), "0000");
    }

    #[test]
    fn soundex_pads_short_names() {
        assert_eq!(soundex("Lee"), "L000");
    }

    #[test]
    fn metaphone_collapses_silent_and_duplicate_letters() {
        assert_eq!(metaphone("Knight"), "NIT");
        assert_eq!(metaphone("Philip"), "FILIP");
    }

    #[test]
    fn metaphone_empty_input() {
        assert_eq!(metaphone(""), "");
        assert_eq!(metaphone("123"), "");
    }
}
