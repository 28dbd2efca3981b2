//! Distance join over two span-bearing streams of the same documents.
//!
//! Tuples are co-grouped by the reserved `_id` attribute. The inner side is
//! drained into a map on the first `next()`; outer tuples then stream through
//! and every joinable pair of spans becomes one merged span. Documents with
//! no joinable pair are dropped.

pub mod distance;

use std::collections::HashMap;
use std::sync::Arc;

use spanflow_core::id::OpId;
use spanflow_core::predicate::JoinPredicate;
use spanflow_core::schema::{Attribute, AttributeType, Schema, ID, PAYLOAD};
use spanflow_core::span::Span;
use spanflow_core::types::{Field, Tuple, TupleBuilder};
use spanflow_text::AnalyzerKind;
use tracing::{debug, trace};

use crate::error::{JoinSide, OpError, OpResult};
use crate::traits::{BoxedOperator, Operator, OperatorBase, OperatorState};

pub use distance::{joinable, merge, merge_all};

/// Last span-list attribute of `schema` that is not the payload.
pub fn default_span_attribute(schema: &Schema) -> Option<usize> {
    schema
        .attributes()
        .iter()
        .rposition(|a| a.attr_type == AttributeType::List && a.name != PAYLOAD)
}

fn span_attribute(
    label: &str,
    schema: &Schema,
    explicit: Option<&str>,
) -> OpResult<Option<usize>> {
    let Some(name) = explicit else {
        return Ok(default_span_attribute(schema));
    };
    match schema.get(name) {
        Some(attr) if attr.attr_type == AttributeType::List => Ok(schema.index_of(name)),
        Some(attr) => Err(OpError::config(
            label,
            format!("span attribute '{name}' has type {}", attr.attr_type),
        )),
        None => Err(OpError::config(label, format!("unknown span attribute '{name}'"))),
    }
}

struct JoinScan {
    label: String,
    outer: BoxedOperator,
    inner: BoxedOperator,
    threshold: usize,
    attribute: String,
    text_index: usize,
    outer_id: usize,
    inner_id: usize,
    outer_spans: Option<usize>,
    inner_spans: Option<usize>,
    /// Inner tuples by document id; filled on the first pull.
    inner_by_id: Option<HashMap<String, Vec<Tuple>>>,
    /// Set when draining the inner side failed; the partial stream is never
    /// loaded again.
    inner_failed: bool,
    output: Arc<Schema>,
}

impl JoinScan {
    fn load_inner(&mut self) -> OpResult<()> {
        if self.inner_by_id.is_some() {
            return Ok(());
        }
        if self.inner_failed {
            return Err(OpError::Exec(format!(
                "inner input of '{}' failed while loading",
                self.label
            )));
        }
        if self.inner_spans.is_none() {
            return Err(OpError::MissingSpanAttribute {
                operator: self.label.clone(),
                side: JoinSide::Inner,
            });
        }
        let mut by_id: HashMap<String, Vec<Tuple>> = HashMap::new();
        loop {
            let tuple = match self.inner.next() {
                Ok(Some(tuple)) => tuple,
                Ok(None) => break,
                Err(e) => {
                    self.inner_failed = true;
                    return Err(e);
                }
            };
            let Some(id) = tuple.field(self.inner_id).and_then(Field::as_str) else {
                continue;
            };
            by_id.entry(id.to_string()).or_default().push(tuple);
        }
        debug!(operator = %self.label, documents = by_id.len(), "join inner side loaded");
        self.inner_by_id = Some(by_id);
        Ok(())
    }

    fn next_match(&mut self) -> OpResult<Option<Tuple>> {
        let Some(outer_spans) = self.outer_spans else {
            return Err(OpError::MissingSpanAttribute {
                operator: self.label.clone(),
                side: JoinSide::Outer,
            });
        };
        self.load_inner()?;

        while let Some(tuple) = self.outer.next()? {
            if let Some(out) = self.join_one(&tuple, outer_spans)? {
                return Ok(Some(out));
            }
        }
        Ok(None)
    }

    fn join_one(&self, outer: &Tuple, outer_spans: usize) -> OpResult<Option<Tuple>> {
        let Some(id) = outer.field(self.outer_id).and_then(Field::as_str) else {
            return Ok(None);
        };
        let Some(partners) = self.inner_by_id.as_ref().and_then(|m| m.get(id)) else {
            return Ok(None);
        };
        let Some(text) = outer.field(self.text_index).and_then(Field::as_str) else {
            return Ok(None);
        };
        let left = spans_at(outer, Some(outer_spans));

        let mut merged: Vec<Span> = Vec::new();
        for inner in partners {
            let right = spans_at(inner, self.inner_spans);
            merged.extend(distance::merge_all(&self.attribute, text, left, right, self.threshold)?);
        }
        if merged.is_empty() {
            return Ok(None);
        }
        trace!(operator = %self.label, document = id, merged = merged.len(), "join merged spans");

        let out = TupleBuilder::new(Arc::clone(&self.output))
            .extend_from(outer)?
            .push(Field::List(merged))
            .build()?;
        Ok(Some(out))
    }
}

fn spans_at(tuple: &Tuple, index: Option<usize>) -> &[Span] {
    index
        .and_then(|i| tuple.field(i))
        .and_then(Field::as_spans)
        .unwrap_or(&[])
}

/// Merges spans of two matcher outputs whose endpoints lie within a threshold.
pub struct DistanceJoin {
    base: OperatorBase,
    scan: JoinScan,
}

impl DistanceJoin {
    pub fn new(
        id: impl Into<OpId>,
        predicate: JoinPredicate,
        outer: BoxedOperator,
        inner: BoxedOperator,
    ) -> OpResult<Self> {
        let label = id.into().to_string();
        let outer_schema = outer.schema();
        let inner_schema = inner.schema();

        if predicate.attribute.is_empty() {
            return Err(OpError::config(&label, "join attribute is required"));
        }
        let text_index = match outer_schema.get(&predicate.attribute) {
            Some(a) if a.attr_type.is_matchable() => outer_schema.index_of(&predicate.attribute),
            Some(a) => {
                return Err(OpError::config(
                    &label,
                    format!("join attribute '{}' has type {}", a.name, a.attr_type),
                ))
            }
            None => None,
        }
        .ok_or_else(|| {
            OpError::config(&label, format!("unknown join attribute '{}'", predicate.attribute))
        })?;

        let outer_id = outer_schema
            .index_of(ID)
            .ok_or_else(|| OpError::config(&label, "outer input carries no document id"))?;
        let inner_id = inner_schema
            .index_of(ID)
            .ok_or_else(|| OpError::config(&label, "inner input carries no document id"))?;

        let outer_spans = span_attribute(&label, &outer_schema, predicate.outer_spans.as_deref())?;
        let inner_spans = span_attribute(&label, &inner_schema, predicate.inner_spans.as_deref())?;

        let result_attribute = predicate.result_attribute.unwrap_or_else(|| label.clone());
        if outer_schema.contains(&result_attribute) {
            return Err(OpError::config(
                &label,
                format!("result attribute '{result_attribute}' already exists in the input"),
            ));
        }
        let output = Arc::new(
            outer_schema.with_attribute(Attribute::new(result_attribute, AttributeType::List))?,
        );

        Ok(Self {
            base: OperatorBase::new(label.clone(), Arc::clone(&output), predicate.window),
            scan: JoinScan {
                label,
                outer,
                inner,
                threshold: predicate.threshold,
                attribute: predicate.attribute,
                text_index,
                outer_id,
                inner_id,
                outer_spans,
                inner_spans,
                inner_by_id: None,
                inner_failed: false,
                output,
            },
        })
    }

    pub fn threshold(&self) -> usize {
        self.scan.threshold
    }
}

impl Operator for DistanceJoin {
    fn open(&mut self) -> OpResult<()> {
        if !self.base.begin_open()? {
            return Ok(());
        }
        self.scan.outer.open()?;
        self.scan.inner.open()?;
        self.scan.inner_by_id = None;
        self.scan.inner_failed = false;
        self.base.set_open();
        debug!(operator = self.base.label(), threshold = self.scan.threshold, "join opened");
        Ok(())
    }

    fn next(&mut self) -> OpResult<Option<Tuple>> {
        let Self { base, scan } = self;
        base.pull(|| scan.next_match())
    }

    fn close(&mut self) -> OpResult<()> {
        if !self.base.begin_close() {
            return Ok(());
        }
        self.scan.inner_by_id = None;
        debug!(operator = self.base.label(), emitted = self.base.emitted(), "join closed");
        let outer = self.scan.outer.close();
        let inner = self.scan.inner.close();
        outer.and(inner)
    }

    fn schema(&self) -> Arc<Schema> {
        self.base.schema()
    }

    fn state(&self) -> OperatorState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "distance_join"
    }

    fn payload_analyzer(&self) -> Option<AnalyzerKind> {
        self.scan.outer.payload_analyzer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spanflow_core::predicate::{KeywordPredicate, MatchingMode, ResultWindow};

    use crate::keyword::KeywordMatcher;
    use crate::values::ValuesOp;

    const DOCS: &[(&str, &str)] = &[
        ("d1", "Patients in the trial took aspirin daily"),
        ("d2", "aspirin was not part of the trial at all, trial ended"),
        ("d3", "no relevant words here"),
    ];

    fn source() -> BoxedOperator {
        let schema = Arc::new(
            Schema::new(vec![
                Attribute::new(ID, AttributeType::String),
                Attribute::new("body", AttributeType::Text),
            ])
            .unwrap(),
        );
        let rows = DOCS
            .iter()
            .map(|(id, body)| {
                Tuple::new(
                    schema.clone(),
                    vec![Field::String((*id).into()), Field::Text((*body).into())],
                )
                .unwrap()
            })
            .collect();
        Box::new(ValuesOp::new("docs", schema, rows).unwrap())
    }

    fn matcher(id: &str, query: &str) -> BoxedOperator {
        let p = KeywordPredicate::new(query, vec!["body".into()], MatchingMode::Conjunction);
        Box::new(KeywordMatcher::new(id, p, source()).unwrap())
    }

    fn drain(op: &mut dyn Operator) -> Vec<Tuple> {
        op.open().unwrap();
        let mut out = Vec::new();
        while let Some(t) = op.next().unwrap() {
            out.push(t);
        }
        op.close().unwrap();
        out
    }

    #[test]
    fn merges_close_spans_per_document() {
        let mut join = DistanceJoin::new(
            "j",
            JoinPredicate::new("body", 20),
            matcher("trial", "trial"),
            matcher("aspirin", "aspirin"),
        )
        .unwrap();
        let out = drain(&mut join);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id(), Some("d1"));
        let spans = out[0].spans("j").unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].start(), spans[0].end()), (16, 34));
        assert_eq!(spans[0].key(), "trial_aspirin");
        assert_eq!(spans[0].value(), "trial took aspirin");
        // outer fields are carried through
        assert!(out[0].spans("trial").is_some());
    }

    #[test]
    fn tight_threshold_filters_everything() {
        let mut join = DistanceJoin::new(
            "j",
            JoinPredicate::new("body", 2),
            matcher("trial", "trial"),
            matcher("aspirin", "aspirin"),
        )
        .unwrap();
        assert!(drain(&mut join).is_empty());
    }

    #[test]
    fn cross_product_within_a_document() {
        let mut join = DistanceJoin::new(
            "j",
            JoinPredicate::new("body", 1000),
            matcher("trial", "trial"),
            matcher("aspirin", "aspirin"),
        )
        .unwrap();
        let out = drain(&mut join);
        let d2 = out.iter().find(|t| t.id() == Some("d2")).unwrap();
        // two "trial" spans against one "aspirin" span
        assert_eq!(d2.spans("j").unwrap().len(), 2);
    }

    #[test]
    fn window_applies_to_merged_tuples() {
        let p = JoinPredicate::new("body", 1000).with_window(ResultWindow::new(Some(5), 1));
        let mut join =
            DistanceJoin::new("j", p, matcher("trial", "trial"), matcher("aspirin", "aspirin"))
                .unwrap();
        let out = drain(&mut join);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id(), Some("d2"));
    }

    #[test]
    fn plain_scan_side_is_an_execution_error() {
        let mut join = DistanceJoin::new(
            "j",
            JoinPredicate::new("body", 10),
            matcher("trial", "trial"),
            source(),
        )
        .unwrap();
        join.open().unwrap();
        let err = join.next().unwrap_err();
        assert!(err.is_execution());
        assert!(matches!(
            err,
            OpError::MissingSpanAttribute { side: JoinSide::Inner, .. }
        ));

        let mut join =
            DistanceJoin::new("j", JoinPredicate::new("body", 10), source(), matcher("a", "aspirin"))
                .unwrap();
        join.open().unwrap();
        assert!(matches!(
            join.next(),
            Err(OpError::MissingSpanAttribute { side: JoinSide::Outer, .. })
        ));
    }

    /// Yields its rows, then fails on the pull after the last one.
    struct Failing {
        rows: BoxedOperator,
        failed: bool,
    }

    impl Operator for Failing {
        fn open(&mut self) -> OpResult<()> {
            self.rows.open()
        }

        fn next(&mut self) -> OpResult<Option<Tuple>> {
            match self.rows.next()? {
                Some(t) => Ok(Some(t)),
                None if !self.failed => {
                    self.failed = true;
                    Err(OpError::Exec("disk gone".into()))
                }
                None => Ok(None),
            }
        }

        fn close(&mut self) -> OpResult<()> {
            self.rows.close()
        }

        fn schema(&self) -> Arc<Schema> {
            self.rows.schema()
        }

        fn state(&self) -> OperatorState {
            self.rows.state()
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn failed_inner_load_is_not_retried() {
        let inner = Failing {
            rows: matcher("aspirin", "aspirin"),
            failed: false,
        };
        let mut join = DistanceJoin::new(
            "j",
            JoinPredicate::new("body", 1000),
            matcher("trial", "trial"),
            Box::new(inner),
        )
        .unwrap();
        join.open().unwrap();
        assert!(matches!(join.next(), Err(OpError::Exec(ref m)) if m == "disk gone"));
        // the inner stream would now report exhaustion; the join must not
        // treat the partial load as complete
        assert!(matches!(join.next(), Err(OpError::Exec(ref m)) if m.contains("failed while loading")));
        assert!(join.next().is_err());
        join.close().unwrap();
    }

    #[test]
    fn configuration_errors() {
        let bad = [
            JoinPredicate::new("missing", 10),
            JoinPredicate::new("", 10),
            JoinPredicate::new("body", 10).with_result_attribute("trial"),
            JoinPredicate::new("body", 10).with_span_attributes("body", "aspirin"),
            JoinPredicate::new("body", 10).with_span_attributes("trial", "nope"),
        ];
        for p in bad {
            let err = DistanceJoin::new("j", p.clone(), matcher("trial", "trial"), matcher("aspirin", "aspirin"))
                .err();
            assert!(matches!(err, Some(ref e) if e.is_config()), "{p:?}: {err:?}");
        }
    }

    #[test]
    fn lifecycle() {
        let mut join = DistanceJoin::new(
            "j",
            JoinPredicate::new("body", 20),
            matcher("trial", "trial"),
            matcher("aspirin", "aspirin"),
        )
        .unwrap();
        assert!(matches!(join.next(), Err(OpError::OperatorNotOpen(_))));
        join.open().unwrap();
        join.open().unwrap();
        assert!(join.next().unwrap().is_some());
        join.close().unwrap();
        join.close().unwrap();
        assert!(matches!(join.next(), Err(OpError::OperatorClosed(_))));
    }
}
