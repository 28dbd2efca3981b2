//! Per-tuple token payload.
//!
//! The payload is a List of spans, one per searchable word of every TEXT
//! attribute, each tagged with its token position. Index-based matching
//! reads it instead of re-tokenizing fields.

use spanflow_core::schema::AttributeType;
use spanflow_core::span::Span;
use spanflow_core::types::Tuple;

use crate::analyzer::Analyzer;

/// Tokenize every TEXT attribute of `tuple`.
pub fn build_payload(analyzer: &Analyzer, tuple: &Tuple) -> Vec<Span> {
    let mut payload = Vec::new();
    for (attr, field) in tuple.schema().attributes().iter().zip(tuple.fields()) {
        if attr.attr_type != AttributeType::Text {
            continue;
        }
        let Some(text) = field.as_str() else {
            continue;
        };
        payload.extend(analyzer.tokens(text).into_iter().map(|t| {
            Span::new(attr.name.as_str(), t.start, t.end, t.term, &text[t.start..t.end])
                .with_token_offset(t.position)
        }));
    }
    payload
}
