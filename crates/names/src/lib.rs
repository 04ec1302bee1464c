pub mod lastname;
pub mod nicknames;
pub mod normalize;
pub mod phonetic;

pub use lastname::{last_name_matches, split_last_name_words};
pub use nicknames::{find_nickname_variations, names_match_via_nicknames, nickname_groups};
pub use normalize::{normalize_name, parse_name, title_case, ParsedName};
pub use phonetic::{metaphone, soundex};
