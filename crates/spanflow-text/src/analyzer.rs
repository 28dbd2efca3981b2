//! Word analyzers with offsets and positions.
//!
//! Words come from Unicode word segmentation (UAX #29) and are lowercased.
//! `standard` drops English stopwords but keeps their positions; `simple`
//! keeps every word.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::AnalyzerError;
use crate::stopwords;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerKind {
    Standard,
    Simple,
}

impl FromStr for AnalyzerKind {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(AnalyzerKind::Standard),
            "simple" => Ok(AnalyzerKind::Simple),
            _ => Err(AnalyzerError::Unknown(s.to_string())),
        }
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyzerKind::Standard => f.write_str("standard"),
            AnalyzerKind::Simple => f.write_str("simple"),
        }
    }
}

/// One analyzed word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Normalized (lowercased) term.
    pub term: String,
    /// Byte offset of the word in the source text.
    pub start: usize,
    pub end: usize,
    /// Word position, counting stopwords.
    pub position: usize,
    pub is_stopword: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Analyzer {
    kind: AnalyzerKind,
}

impl Analyzer {
    pub fn new(kind: AnalyzerKind) -> Self {
        Self { kind }
    }

    pub fn standard() -> Self {
        Self::new(AnalyzerKind::Standard)
    }

    /// Resolve an analyzer by its configured name.
    pub fn by_name(name: &str) -> Result<Self, AnalyzerError> {
        name.parse().map(Self::new)
    }

    pub fn kind(&self) -> AnalyzerKind {
        self.kind
    }

    pub fn is_stopword(&self, term: &str) -> bool {
        match self.kind {
            AnalyzerKind::Standard => stopwords::is_english_stopword(term),
            AnalyzerKind::Simple => false,
        }
    }

    /// Every word in `text`, stopwords flagged but retained.
    pub fn tokens_with_stopwords(&self, text: &str) -> Vec<Token> {
        text.unicode_word_indices()
            .enumerate()
            .map(|(position, (start, word))| {
                let term = word.to_lowercase();
                let is_stopword = self.is_stopword(&term);
                Token {
                    term,
                    start,
                    end: start + word.len(),
                    position,
                    is_stopword,
                }
            })
            .collect()
    }

    /// Searchable words in `text`: stopwords removed, positions preserved.
    pub fn tokens(&self, text: &str) -> Vec<Token> {
        self.tokens_with_stopwords(text)
            .into_iter()
            .filter(|t| !t.is_stopword)
            .collect()
    }

    /// Distinct searchable terms of a query.
    pub fn term_set(&self, text: &str) -> BTreeSet<String> {
        self.tokens(text).into_iter().map(|t| t.term).collect()
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_and_positions_skip_punctuation() {
        let tokens = Analyzer::standard().tokens_with_stopwords("Book, the Doctor!");
        let summary: Vec<_> = tokens
            .iter()
            .map(|t| (t.term.as_str(), t.start, t.end, t.position, t.is_stopword))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("book", 0, 4, 0, false),
                ("the", 6, 9, 1, true),
                ("doctor", 10, 16, 2, false),
            ]
        );
    }

    #[test]
    fn stopwords_keep_position_gaps() {
        let tokens = Analyzer::standard().tokens("nice and beautiful person");
        let positions: Vec<_> = tokens.iter().map(|t| (t.term.as_str(), t.position)).collect();
        assert_eq!(positions, vec![("nice", 0), ("beautiful", 2), ("person", 3)]);
    }

    #[test]
    fn simple_analyzer_keeps_stopwords() {
        let terms = Analyzer::by_name("simple").unwrap().term_set("The cat and THE hat");
        assert_eq!(
            terms.into_iter().collect::<Vec<_>>(),
            vec!["and", "cat", "hat", "the"]
        );
    }

    #[test]
    fn unknown_name_is_an_error() {
        assert_eq!(
            Analyzer::by_name("fancy").unwrap_err(),
            AnalyzerError::Unknown("fancy".into())
        );
        assert_eq!(Analyzer::by_name(" Standard ").unwrap().kind(), AnalyzerKind::Standard);
    }

    #[test]
    fn non_ascii_offsets_are_byte_offsets() {
        let text = "café au lait";
        let tokens = Analyzer::standard().tokens(text);
        assert_eq!(&text[tokens[0].start..tokens[0].end], "café");
        assert_eq!(tokens[1].start, 6);
    }
}
