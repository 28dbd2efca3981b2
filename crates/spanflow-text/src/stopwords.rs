//! English stopword list used by the standard analyzer.

/// Classic English stop set (articles, conjunctions, auxiliaries).
pub const ENGLISH: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is",
    "it", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
    "these", "they", "this", "to", "was", "will", "with",
];

pub fn is_english_stopword(term: &str) -> bool {
    ENGLISH.binary_search(&term).is_ok()
}
