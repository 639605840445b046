//! Keyword term construction
//!
//! Builds FTS5 match expressions from loose user input. Every word that is
//! not a plain FTS5 bareword is quoted, so user text can never inject query
//! syntax; wildcards and operators are only ever added here.

/// FTS5 operators that must be quoted when they appear as user words
const RESERVED_WORDS: [&str; 4] = ["AND", "OR", "NOT", "NEAR"];

/// Default token distance for proximity queries
pub const PROXIMITY_DISTANCE: usize = 10;

fn is_bareword_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii()
}

/// Whether the word yields at least one index token
fn has_token_chars(word: &str) -> bool {
    word.chars().any(|c| c.is_alphanumeric())
}

/// Split a query into whitespace-separated words that can match something
pub fn query_words(raw: &str) -> Vec<&str> {
    raw.split_whitespace().filter(|w| has_token_chars(w)).collect()
}

/// Quote a word unless it is a plain bareword. Inner quotes are doubled.
pub fn escape_word(word: &str) -> String {
    let plain = word.chars().all(is_bareword_char) && !RESERVED_WORDS.contains(&word);
    if plain && !word.is_empty() {
        word.to_string()
    } else {
        format!("\"{}\"", word.replace('"', "\"\""))
    }
}

/// Escape a word and make it a prefix match.
///
/// Trailing `*` typed by the user is kept as the single wildcard marker.
pub fn wildcard_word(word: &str) -> String {
    let body = word.trim_end_matches('*');
    if body.is_empty() {
        return String::new();
    }
    format!("{}*", escape_word(body))
}

/// Normalize a raw query into the primary match term.
///
/// - Empty (after trimming) stays empty: no search is performed.
/// - A leading `#` is an exact tag lookup and passes through unchanged.
/// - Otherwise each word is escaped and prefix-wildcarded, joined by spaces
///   (implicit AND).
pub fn normalize_term(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return trimmed.to_string();
    }
    query_words(trimmed)
        .into_iter()
        .map(wildcard_word)
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The whole trimmed query as one quoted phrase
pub fn exact_phrase(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    format!("\"{}\"", trimmed.replace('"', "\"\""))
}

/// Wildcarded words joined with an explicit `AND`
pub fn all_words_term(words: &[&str]) -> String {
    join_words(words, wildcard_word, " AND ")
}

/// Escaped words joined with `OR`, no wildcards
pub fn any_word_term(words: &[&str]) -> String {
    join_words(words, escape_word, " OR ")
}

/// `NEAR(w1 w2 ..., distance)` over escaped words
pub fn proximity_term(words: &[&str], distance: usize) -> String {
    let inner = join_words(words, escape_word, " ");
    if inner.is_empty() {
        return inner;
    }
    format!("NEAR({inner}, {distance})")
}

fn join_words(words: &[&str], build: fn(&str) -> String, separator: &str) -> String {
    words
        .iter()
        .filter(|w| has_token_chars(w))
        .map(|w| build(w))
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}
