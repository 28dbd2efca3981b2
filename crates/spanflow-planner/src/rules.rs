//! Plan rewrites.
//!
//! - `resolve_analyzers` pins keyword predicates without an analyzer to the
//!   engine's default, so matching and index selection agree on it.
//! - `optimize` feeds a conjunction or phrase keyword operator reading an
//!   unbounded scan from an index-backed scan instead, restricted to rows
//!   holding every searchable query term. The matcher still runs, so the
//!   output is unchanged; only rows that cannot match are skipped.

use spanflow_core::dag::LogicalPlan;
use spanflow_core::predicate::{
    IndexQuery, KeywordPredicate, MatchingMode, ResultWindow, DEFAULT_ANALYZER,
};
use spanflow_text::{Analyzer, AnalyzerKind};

/// Give every keyword predicate without an analyzer `default`.
pub fn resolve_analyzers(plan: LogicalPlan, default: &str) -> LogicalPlan {
    use LogicalPlan::*;

    match plan {
        Keyword {
            id,
            mut predicate,
            input,
        } => {
            predicate.analyzer.get_or_insert_with(|| default.to_string());
            Keyword {
                id,
                predicate,
                input: Box::new(resolve_analyzers(*input, default)),
            }
        }
        Join {
            id,
            predicate,
            outer,
            inner,
        } => Join {
            id,
            predicate,
            outer: Box::new(resolve_analyzers(*outer, default)),
            inner: Box::new(resolve_analyzers(*inner, default)),
        },
        leaf @ (Scan { .. } | IndexedScan { .. }) => leaf,
    }
}

/// Apply rewrites. `index` is the analyzer the storage index was built with,
/// `None` when the storage keeps no index.
pub fn optimize(plan: LogicalPlan, index: Option<AnalyzerKind>) -> LogicalPlan {
    match index {
        Some(kind) => index_pushdown(plan, kind),
        None => plan,
    }
}

fn index_pushdown(plan: LogicalPlan, index: AnalyzerKind) -> LogicalPlan {
    use LogicalPlan::*;

    match plan {
        Keyword {
            id,
            predicate,
            input,
        } => {
            let input = match *input {
                Scan { table, window } if window == ResultWindow::default() => {
                    match index_query(&predicate, index) {
                        Some(query) => IndexedScan {
                            table,
                            query,
                            window,
                        },
                        None => Scan { table, window },
                    }
                }
                other => index_pushdown(other, index),
            };
            Keyword {
                id,
                predicate,
                input: Box::new(input),
            }
        }
        Join {
            id,
            predicate,
            outer,
            inner,
        } => Join {
            id,
            predicate,
            outer: Box::new(index_pushdown(*outer, index)),
            inner: Box::new(index_pushdown(*inner, index)),
        },
        leaf @ (Scan { .. } | IndexedScan { .. }) => leaf,
    }
}

/// Terms every matching row must contain, when the index can answer that.
fn index_query(predicate: &KeywordPredicate, index: AnalyzerKind) -> Option<IndexQuery> {
    if predicate.mode == MatchingMode::Substring {
        return None;
    }
    let analyzer = Analyzer::by_name(predicate.analyzer_or(DEFAULT_ANALYZER)).ok()?;
    if analyzer.kind() != index {
        return None;
    }
    let terms: Vec<String> = analyzer.term_set(&predicate.query).into_iter().collect();
    if terms.is_empty() {
        return None;
    }
    Some(IndexQuery::AllTerms {
        attributes: predicate.attributes.clone(),
        terms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use spanflow_core::id::OpId;
    use spanflow_core::predicate::JoinPredicate;

    fn keyword(query: &str, mode: MatchingMode, window: ResultWindow) -> LogicalPlan {
        LogicalPlan::Keyword {
            id: OpId::new(query),
            predicate: KeywordPredicate::new(query, vec!["body".into()], mode),
            input: Box::new(LogicalPlan::Scan {
                table: "docs".into(),
                window,
            }),
        }
    }

    fn input_of(plan: &LogicalPlan) -> &LogicalPlan {
        plan.children()[0]
    }

    #[test]
    fn phrase_over_scan_uses_the_index() {
        let plan = optimize(
            keyword("book the doctor", MatchingMode::Phrase, ResultWindow::default()),
            Some(AnalyzerKind::Standard),
        );
        match input_of(&plan) {
            LogicalPlan::IndexedScan { table, query, .. } => {
                assert_eq!(table, "docs");
                assert_eq!(
                    query,
                    &IndexQuery::AllTerms {
                        attributes: vec!["body".into()],
                        terms: vec!["book".into(), "doctor".into()],
                    }
                );
            }
            other => panic!("expected indexed scan, got {other:?}"),
        }
    }

    #[test]
    fn substring_windowed_or_unindexed_scans_are_kept() {
        let cases = [
            (keyword("book", MatchingMode::Substring, ResultWindow::default()), Some(AnalyzerKind::Standard)),
            (keyword("book", MatchingMode::Conjunction, ResultWindow::limit(3)), Some(AnalyzerKind::Standard)),
            (keyword("book", MatchingMode::Conjunction, ResultWindow::default()), None),
            (keyword("book", MatchingMode::Conjunction, ResultWindow::default()), Some(AnalyzerKind::Simple)),
        ];
        for (plan, index) in cases {
            let out = optimize(plan, index);
            assert!(matches!(input_of(&out), LogicalPlan::Scan { .. }), "{out:?}");
        }
    }

    #[test]
    fn resolved_default_analyzer_drives_index_selection() {
        let plan = keyword("book", MatchingMode::Conjunction, ResultWindow::default());
        let plain = optimize(plan.clone(), Some(AnalyzerKind::Simple));
        assert!(matches!(input_of(&plain), LogicalPlan::Scan { .. }));

        let resolved = resolve_analyzers(plan, "simple");
        let LogicalPlan::Keyword { predicate, .. } = &resolved else {
            panic!("expected keyword");
        };
        assert_eq!(predicate.analyzer.as_deref(), Some("simple"));
        let out = optimize(resolved, Some(AnalyzerKind::Simple));
        assert!(matches!(input_of(&out), LogicalPlan::IndexedScan { .. }));
    }

    #[test]
    fn explicit_analyzer_survives_resolution() {
        let plan = LogicalPlan::Keyword {
            id: OpId::new("k"),
            predicate: KeywordPredicate::new("book", vec!["body".into()], MatchingMode::Phrase)
                .with_analyzer("standard"),
            input: Box::new(LogicalPlan::Scan {
                table: "docs".into(),
                window: ResultWindow::default(),
            }),
        };
        let LogicalPlan::Keyword { predicate, .. } = resolve_analyzers(plan, "simple") else {
            panic!("expected keyword");
        };
        assert_eq!(predicate.analyzer.as_deref(), Some("standard"));
    }

    #[test]
    fn rewrites_both_join_sides() {
        let plan = LogicalPlan::Join {
            id: OpId::new("j"),
            predicate: JoinPredicate::new("body", 5),
            outer: Box::new(keyword("book", MatchingMode::Conjunction, ResultWindow::default())),
            inner: Box::new(keyword("doctor", MatchingMode::Phrase, ResultWindow::default())),
        };
        let out = optimize(plan, Some(AnalyzerKind::Standard));
        for side in out.children() {
            assert!(matches!(input_of(side), LogicalPlan::IndexedScan { .. }));
        }
    }
}
