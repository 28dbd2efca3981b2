//! Ordered phrase matching with stopwords as single-token wildcards.
//!
//! The query is analyzed once with stopwords kept. Searchable terms fix which
//! words must appear; their positions relative to the first searchable term
//! fix where. A stopword in the query therefore demands exactly one word (any
//! word) at its position. Leading and trailing stopwords constrain nothing.

use std::collections::HashMap;

use spanflow_core::error::Result;
use spanflow_core::span::Span;
use spanflow_text::Analyzer;

#[derive(Debug, Clone)]
pub struct PhraseQuery {
    query: String,
    /// (term, position offset from the first term), in query order.
    terms: Vec<(String, usize)>,
}

impl PhraseQuery {
    /// `None` when the query has no searchable terms.
    pub fn new(query: &str, analyzer: &Analyzer) -> Option<Self> {
        let searchable: Vec<_> = analyzer
            .tokens_with_stopwords(query)
            .into_iter()
            .filter(|t| !t.is_stopword)
            .collect();
        let first = searchable.first()?.position;
        let terms = searchable
            .into_iter()
            .map(|t| (t.term, t.position - first))
            .collect();
        Some(Self {
            query: query.to_string(),
            terms,
        })
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|(t, _)| t.as_str())
    }

    /// One span per phrase occurrence in `text`, located through the payload
    /// spans of `attribute`.
    pub fn find_all(&self, attribute: &str, text: &str, payload: &[Span]) -> Result<Vec<Span>> {
        let mut by_term: HashMap<&str, HashMap<usize, &Span>> = HashMap::new();
        for span in payload {
            if span.attribute_name() != attribute {
                continue;
            }
            let Some(pos) = span.token_offset() else {
                continue;
            };
            if self.terms.iter().any(|(t, _)| t == span.key()) {
                by_term.entry(span.key()).or_default().insert(pos, span);
            }
        }
        if self.terms.iter().any(|(t, _)| !by_term.contains_key(t.as_str())) {
            return Ok(Vec::new());
        }

        let (head_term, _) = &self.terms[0];
        let (tail_term, tail_rel) = &self.terms[self.terms.len() - 1];
        let mut heads: Vec<(usize, &Span)> = by_term[head_term.as_str()]
            .iter()
            .map(|(p, s)| (*p, *s))
            .collect();
        heads.sort_unstable_by_key(|(p, _)| *p);

        let mut spans = Vec::new();
        for (pos, head) in heads {
            let aligned = self
                .terms
                .iter()
                .all(|(t, rel)| by_term[t.as_str()].contains_key(&(pos + rel)));
            if !aligned {
                continue;
            }
            let tail = by_term[tail_term.as_str()][&(pos + tail_rel)];
            spans.push(Span::over(
                attribute,
                text,
                head.start(),
                tail.end(),
                &self.query,
            )?);
        }
        Ok(spans)
    }
}
