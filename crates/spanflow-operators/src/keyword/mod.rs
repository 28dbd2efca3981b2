//! Keyword matcher: annotate tuples with the spans where a query matched.
//!
//! The matcher is a filter as well as an annotator: tuples with zero matches
//! across the targeted attributes are dropped. STRING attributes only match
//! when the whole value equals the query; TEXT attributes use the configured
//! mode.

pub mod conjunction;
pub mod phrase;
pub mod substring;

use std::sync::Arc;

use spanflow_core::id::OpId;
use spanflow_core::predicate::{KeywordPredicate, MatchingMode, DEFAULT_ANALYZER};
use spanflow_core::schema::{Attribute, AttributeType, Schema, PAYLOAD};
use spanflow_core::span::Span;
use spanflow_core::types::{Field, Tuple, TupleBuilder};
use spanflow_text::{build_payload, Analyzer, AnalyzerKind};
use tracing::{debug, trace};

use crate::error::{OpError, OpResult};
use crate::traits::{BoxedOperator, Operator, OperatorBase, OperatorState};

pub use conjunction::ConjunctionQuery;
pub use phrase::PhraseQuery;
pub use substring::SubstringQuery;

/// A query compiled for one matching mode.
#[derive(Debug, Clone)]
pub enum CompiledQuery {
    Substring(SubstringQuery),
    Conjunction(ConjunctionQuery),
    Phrase(PhraseQuery),
}

impl CompiledQuery {
    pub fn compile(query: &str, mode: MatchingMode, analyzer: &Analyzer) -> Option<Self> {
        match mode {
            MatchingMode::Substring => Some(CompiledQuery::Substring(SubstringQuery::new(query))),
            MatchingMode::Conjunction => {
                ConjunctionQuery::new(query, analyzer).map(CompiledQuery::Conjunction)
            }
            MatchingMode::Phrase => PhraseQuery::new(query, analyzer).map(CompiledQuery::Phrase),
        }
    }

    fn match_text(
        &self,
        attribute: &str,
        text: &str,
        payload: &[Span],
        out: &mut Vec<Span>,
    ) -> OpResult<()> {
        match self {
            CompiledQuery::Substring(q) => out.extend(q.find_all(attribute, text)),
            CompiledQuery::Conjunction(q) => out.extend(q.find_all(attribute, payload)),
            CompiledQuery::Phrase(q) => out.extend(q.find_all(attribute, text, payload)?),
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Target {
    name: String,
    index: usize,
    attr_type: AttributeType,
}

/// Where the payload of an output tuple comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayloadSource {
    /// The input has none; compute it and append it.
    Append,
    /// The input's payload at this index was built by the same analyzer.
    Reuse(usize),
    /// The input's payload at this index came from another (or an unknown)
    /// analyzer; recompute it in place.
    Replace(usize),
}

/// Per-tuple matching step; owned by the operator next to its `OperatorBase`.
struct KeywordScan {
    input: BoxedOperator,
    query_text: String,
    /// `None` when the query has no searchable terms and only STRING
    /// attributes are targeted.
    query: Option<CompiledQuery>,
    analyzer: Analyzer,
    targets: Vec<Target>,
    payload: PayloadSource,
    output: Arc<Schema>,
    scanned: u64,
}

impl KeywordScan {
    fn next_match(&mut self) -> OpResult<Option<Tuple>> {
        while let Some(tuple) = self.input.next()? {
            self.scanned += 1;
            if let Some(out) = self.annotate(&tuple)? {
                return Ok(Some(out));
            }
        }
        Ok(None)
    }

    fn annotate(&self, tuple: &Tuple) -> OpResult<Option<Tuple>> {
        let computed = match self.payload {
            PayloadSource::Reuse(_) => None,
            PayloadSource::Append | PayloadSource::Replace(_) => {
                Some(build_payload(&self.analyzer, tuple))
            }
        };
        let payload: &[Span] = match (&computed, self.payload) {
            (Some(p), _) => p,
            (None, PayloadSource::Reuse(i)) => {
                tuple.field(i).and_then(Field::as_spans).unwrap_or(&[])
            }
            (None, _) => &[],
        };

        let mut spans = Vec::new();
        for target in &self.targets {
            let Some(text) = tuple.field(target.index).and_then(Field::as_str) else {
                continue;
            };
            match target.attr_type {
                AttributeType::String => {
                    if text == self.query_text {
                        spans.push(Span::new(&target.name, 0, text.len(), &self.query_text, text));
                    }
                }
                _ => {
                    if let Some(query) = &self.query {
                        query.match_text(&target.name, text, payload, &mut spans)?;
                    }
                }
            }
        }
        if spans.is_empty() {
            return Ok(None);
        }

        let out = match (computed, self.payload) {
            (Some(payload), PayloadSource::Replace(i)) => {
                let mut fields = tuple.fields().to_vec();
                if let Some(slot) = fields.get_mut(i) {
                    *slot = Field::List(payload);
                }
                fields.push(Field::List(spans));
                Tuple::new(Arc::clone(&self.output), fields)?
            }
            (Some(payload), _) => TupleBuilder::new(Arc::clone(&self.output))
                .extend_from(tuple)?
                .push(Field::List(payload))
                .push(Field::List(spans))
                .build()?,
            (None, _) => TupleBuilder::new(Arc::clone(&self.output))
                .extend_from(tuple)?
                .push(Field::List(spans))
                .build()?,
        };
        Ok(Some(out))
    }
}

pub struct KeywordMatcher {
    base: OperatorBase,
    scan: KeywordScan,
    result_attribute: String,
}

impl KeywordMatcher {
    /// Validate `predicate` against the input schema and build the matcher.
    ///
    /// Fails with a configuration error for an empty query, an unknown
    /// analyzer, a missing or non STRING/TEXT attribute, a conjunction/phrase
    /// query without searchable terms over a TEXT attribute, or a result
    /// attribute that already exists upstream.
    ///
    /// An upstream payload is reused only when the input reports it was built
    /// by the same analyzer; otherwise it is recomputed.
    pub fn new(
        id: impl Into<OpId>,
        predicate: KeywordPredicate,
        input: BoxedOperator,
    ) -> OpResult<Self> {
        let id = id.into();
        let label = id.to_string();
        let input_schema = input.schema();

        if predicate.query.is_empty() {
            return Err(OpError::config(&label, "query must not be empty"));
        }
        if predicate.attributes.is_empty() {
            return Err(OpError::config(&label, "at least one attribute is required"));
        }
        let analyzer = Analyzer::by_name(predicate.analyzer_or(DEFAULT_ANALYZER))
            .map_err(|e| OpError::config(&label, e.to_string()))?;

        let mut targets = Vec::with_capacity(predicate.attributes.len());
        for name in &predicate.attributes {
            let index = input_schema
                .index_of(name)
                .ok_or_else(|| OpError::config(&label, format!("unknown attribute '{name}'")))?;
            let attr_type = input_schema.attributes()[index].attr_type;
            if !attr_type.is_matchable() {
                return Err(OpError::config(
                    &label,
                    format!("attribute '{name}' has type {attr_type}; only string and text can be matched"),
                ));
            }
            targets.push(Target {
                name: name.clone(),
                index,
                attr_type,
            });
        }

        let query = CompiledQuery::compile(&predicate.query, predicate.mode, &analyzer);
        if query.is_none() && targets.iter().any(|t| t.attr_type == AttributeType::Text) {
            return Err(OpError::config(
                &label,
                format!("query '{}' has no searchable terms", predicate.query),
            ));
        }

        let result_attribute = predicate.result_attribute.unwrap_or_else(|| label.clone());
        if result_attribute == PAYLOAD || input_schema.contains(&result_attribute) {
            return Err(OpError::config(
                &label,
                format!("result attribute '{result_attribute}' already exists in the input"),
            ));
        }

        let payload = match input_schema.index_of(PAYLOAD) {
            None => PayloadSource::Append,
            Some(i) if input_schema.attributes()[i].attr_type != AttributeType::List => {
                return Err(OpError::config(&label, "input payload attribute is not a span list"));
            }
            Some(i) if input.payload_analyzer() == Some(analyzer.kind()) => PayloadSource::Reuse(i),
            Some(i) => {
                debug!(operator = %label, analyzer = %analyzer.kind(), "upstream payload will be rebuilt");
                PayloadSource::Replace(i)
            }
        };

        let mut output = (*input_schema).clone();
        if payload == PayloadSource::Append {
            output = output.with_attribute(Attribute::new(PAYLOAD, AttributeType::List))?;
        }
        output = output.with_attribute(Attribute::new(&result_attribute, AttributeType::List))?;
        let output = Arc::new(output);

        Ok(Self {
            base: OperatorBase::new(label, Arc::clone(&output), predicate.window),
            scan: KeywordScan {
                input,
                query_text: predicate.query,
                query,
                analyzer,
                targets,
                payload,
                output,
                scanned: 0,
            },
            result_attribute,
        })
    }

    pub fn result_attribute(&self) -> &str {
        &self.result_attribute
    }

    pub fn query(&self) -> Option<&CompiledQuery> {
        self.scan.query.as_ref()
    }
}

impl Operator for KeywordMatcher {
    fn open(&mut self) -> OpResult<()> {
        if !self.base.begin_open()? {
            return Ok(());
        }
        self.scan.input.open()?;
        self.scan.scanned = 0;
        self.base.set_open();
        debug!(operator = self.base.label(), "keyword matcher opened");
        Ok(())
    }

    fn next(&mut self) -> OpResult<Option<Tuple>> {
        let Self { base, scan, .. } = self;
        let out = base.pull(|| scan.next_match())?;
        if out.is_some() {
            trace!(operator = base.label(), emitted = base.emitted(), "keyword match");
        }
        Ok(out)
    }

    fn close(&mut self) -> OpResult<()> {
        if !self.base.begin_close() {
            return Ok(());
        }
        debug!(
            operator = self.base.label(),
            scanned = self.scan.scanned,
            emitted = self.base.emitted(),
            "keyword matcher closed"
        );
        self.scan.input.close()
    }

    fn schema(&self) -> Arc<Schema> {
        self.base.schema()
    }

    fn state(&self) -> OperatorState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "keyword"
    }

    fn payload_analyzer(&self) -> Option<AnalyzerKind> {
        Some(self.scan.analyzer.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spanflow_core::predicate::ResultWindow;
    use spanflow_core::schema::ID;

    use crate::values::ValuesOp;

    fn docs(rows: &[(&str, &str, &str)]) -> BoxedOperator {
        let schema = Arc::new(
            Schema::new(vec![
                Attribute::new(ID, AttributeType::String),
                Attribute::new("title", AttributeType::String),
                Attribute::new("body", AttributeType::Text),
                Attribute::new("year", AttributeType::Integer),
            ])
            .unwrap(),
        );
        let tuples = rows
            .iter()
            .map(|(id, title, body)| {
                Tuple::new(
                    schema.clone(),
                    vec![
                        Field::String((*id).into()),
                        Field::String((*title).into()),
                        Field::Text((*body).into()),
                        Field::Integer(2024),
                    ],
                )
                .unwrap()
            })
            .collect();
        Box::new(ValuesOp::new("docs", schema, tuples).unwrap())
    }

    fn run(matcher: &mut KeywordMatcher) -> Vec<Tuple> {
        matcher.open().unwrap();
        let mut out = Vec::new();
        while let Some(t) = matcher.next().unwrap() {
            out.push(t);
        }
        matcher.close().unwrap();
        out
    }

    fn predicate(query: &str, mode: MatchingMode) -> KeywordPredicate {
        KeywordPredicate::new(query, vec!["title".into(), "body".into()], mode)
    }

    #[test]
    fn drops_tuples_without_matches_and_appends_attributes() {
        let input = docs(&[("1", "t", "is is"), ("2", "t", "nothing here")]);
        let mut m = KeywordMatcher::new("kw", predicate("is", MatchingMode::Substring), input).unwrap();
        let schema = m.schema();
        let names: Vec<_> = schema.attributes().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec![ID, "title", "body", "year", PAYLOAD, "kw"]);

        let out = run(&mut m);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id(), Some("1"));
        assert_eq!(out[0].spans("kw").unwrap().len(), 2);
        assert!(!out[0].spans(PAYLOAD).unwrap().is_empty());
    }

    #[test]
    fn string_attributes_need_exact_value() {
        let input = docs(&[("1", "Rust", "rust everywhere"), ("2", "Rusty", "none")]);
        let mut m = KeywordMatcher::new("kw", predicate("Rust", MatchingMode::Conjunction), input).unwrap();
        let out = run(&mut m);
        assert_eq!(out.len(), 1);
        let spans = out[0].spans("kw").unwrap();
        assert_eq!(spans[0], Span::new("title", 0, 4, "Rust", "Rust"));
        assert_eq!(spans[1], Span::new("body", 0, 4, "rust", "rust"));
    }

    #[test]
    fn phrase_mode_end_to_end() {
        let input = docs(&[
            ("1", "a", "nice and beautiful person"),
            ("2", "b", "nice person"),
            ("3", "c", "nice gentle honest person"),
        ]);
        let mut m = KeywordMatcher::new("kw", predicate("nice a a person", MatchingMode::Phrase), input).unwrap();
        let ids: Vec<_> = run(&mut m).iter().map(|t| t.id().unwrap().to_string()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn every_span_points_at_an_input_attribute() {
        let input = docs(&[("1", "book", "book appointment with the doctor")]);
        let mut m = KeywordMatcher::new("kw", predicate("book", MatchingMode::Substring), input)
            .unwrap();
        for t in run(&mut m) {
            for s in t.spans("kw").unwrap() {
                assert!(s.attribute_name() == "title" || s.attribute_name() == "body");
            }
        }
    }

    #[test]
    fn limit_and_offset_count_matches_not_inputs() {
        let rows: Vec<(String, String, String)> = (0..6)
            .map(|i| {
                let body = if i % 2 == 0 { "match me" } else { "skip" };
                (i.to_string(), "t".to_string(), body.to_string())
            })
            .collect();
        let borrowed: Vec<(&str, &str, &str)> = rows
            .iter()
            .map(|(a, b, c)| (a.as_str(), b.as_str(), c.as_str()))
            .collect();
        let p = predicate("match", MatchingMode::Conjunction).with_window(ResultWindow::new(Some(1), 1));
        let mut m = KeywordMatcher::new("kw", p, docs(&borrowed)).unwrap();
        let out = run(&mut m);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id(), Some("2"));
    }

    #[test]
    fn configuration_errors() {
        let cases = [
            KeywordPredicate::new("", vec!["body".into()], MatchingMode::Substring),
            KeywordPredicate::new("x", vec!["missing".into()], MatchingMode::Substring),
            KeywordPredicate::new("x", vec!["year".into()], MatchingMode::Substring),
            KeywordPredicate::new("x", vec![], MatchingMode::Substring),
            KeywordPredicate::new("the", vec!["body".into()], MatchingMode::Phrase),
            KeywordPredicate::new("x", vec!["body".into()], MatchingMode::Phrase).with_analyzer("nope"),
            KeywordPredicate::new("x", vec!["body".into()], MatchingMode::Phrase).with_result_attribute("title"),
        ];
        for p in cases {
            let err = KeywordMatcher::new("kw", p.clone(), docs(&[])).err();
            assert!(
                matches!(err, Some(ref e) if e.is_config()),
                "expected config error for {p:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn reuses_upstream_payload() {
        let first = KeywordMatcher::new(
            "first",
            predicate("doctor", MatchingMode::Conjunction),
            docs(&[("1", "t", "see the doctor now")]),
        )
        .unwrap();
        let mut second = KeywordMatcher::new(
            "second",
            predicate("doctor now", MatchingMode::Phrase),
            Box::new(first),
        )
        .unwrap();
        let names: Vec<_> = second.schema().attributes().iter().map(|a| a.name.clone()).collect();
        assert_eq!(names.iter().filter(|n| *n == PAYLOAD).count(), 1);

        let out = run(&mut second);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].spans("second").unwrap(),
            &[Span::new("body", 8, 18, "doctor now", "doctor now")]
        );
        assert_eq!(out[0].spans("first").unwrap().len(), 1);
    }

    #[test]
    fn chained_matchers_with_different_analyzers() {
        let first = KeywordMatcher::new(
            "first",
            predicate("doctor", MatchingMode::Conjunction),
            docs(&[("1", "t", "see the doctor"), ("2", "t", "a doctor")]),
        )
        .unwrap();
        let mut second = KeywordMatcher::new(
            "second",
            predicate("the doctor", MatchingMode::Conjunction).with_analyzer("simple"),
            Box::new(first),
        )
        .unwrap();
        assert_eq!(second.payload_analyzer(), Some(AnalyzerKind::Simple));

        let out = run(&mut second);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id(), Some("1"));
        assert_eq!(
            out[0].spans("second").unwrap(),
            &[
                Span::new("body", 4, 7, "the", "the"),
                Span::new("body", 8, 14, "doctor", "doctor"),
            ]
        );
        let payload = out[0].spans(PAYLOAD).unwrap();
        assert!(payload.iter().any(|s| s.key() == "the"));
        assert_eq!(out[0].spans("first").unwrap().len(), 1);
    }

    #[test]
    fn stopword_query_over_string_attributes_only() {
        let input = docs(&[("1", "The", "the end"), ("2", "the", "the end")]);
        let p = KeywordPredicate::new("The", vec!["title".into()], MatchingMode::Conjunction);
        let mut m = KeywordMatcher::new("kw", p, input).unwrap();
        assert!(m.query().is_none());

        let out = run(&mut m);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id(), Some("1"));
        assert_eq!(out[0].spans("kw").unwrap(), &[Span::new("title", 0, 3, "The", "The")]);
    }

    #[test]
    fn next_after_close_fails() {
        let mut m = KeywordMatcher::new("kw", predicate("x", MatchingMode::Substring), docs(&[])).unwrap();
        m.open().unwrap();
        m.close().unwrap();
        m.close().unwrap();
        assert!(matches!(m.next(), Err(OpError::OperatorClosed(_))));
    }
}
