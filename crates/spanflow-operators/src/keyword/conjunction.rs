//! Order-independent "every token present" matching over the payload.

use std::collections::BTreeSet;

use spanflow_core::span::Span;
use spanflow_text::Analyzer;

#[derive(Debug, Clone)]
pub struct ConjunctionQuery {
    terms: BTreeSet<String>,
}

impl ConjunctionQuery {
    /// `None` when the query has no searchable terms (e.g. only stopwords).
    pub fn new(query: &str, analyzer: &Analyzer) -> Option<Self> {
        let terms = analyzer.term_set(query);
        (!terms.is_empty()).then_some(Self { terms })
    }

    pub fn terms(&self) -> &BTreeSet<String> {
        &self.terms
    }

    /// Payload spans of `attribute` whose term is in the query, provided
    /// every query term occurs at least once; otherwise nothing.
    pub fn find_all(&self, attribute: &str, payload: &[Span]) -> Vec<Span> {
        let hits: Vec<&Span> = payload
            .iter()
            .filter(|s| s.attribute_name() == attribute && self.terms.contains(s.key()))
            .collect();
        let covered = self
            .terms
            .iter()
            .all(|term| hits.iter().any(|s| s.key() == term));
        if !covered {
            return Vec::new();
        }
        hits.into_iter().cloned().collect()
    }
}
