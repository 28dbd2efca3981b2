//! Human-readable plan rendering.

use std::fmt::Write;

use spanflow_core::dag::LogicalPlan;
use spanflow_core::predicate::{IndexQuery, ResultWindow};

/// Indented tree, one operator per line, outer input before inner.
pub fn explain(plan: &LogicalPlan) -> String {
    let mut out = String::new();
    render(plan, 0, &mut out);
    out
}

fn window(w: &ResultWindow) -> String {
    match (w.limit, w.offset) {
        (None, 0) => String::new(),
        (Some(l), 0) => format!(" limit={l}"),
        (None, o) => format!(" offset={o}"),
        (Some(l), o) => format!(" limit={l} offset={o}"),
    }
}

fn render(plan: &LogicalPlan, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    let _ = match plan {
        LogicalPlan::Scan { table, window: w } => {
            writeln!(out, "{pad}Scan table={table}{}", window(w))
        }
        LogicalPlan::IndexedScan {
            table,
            query,
            window: w,
        } => {
            let (kind, terms) = match query {
                IndexQuery::AllTerms { terms, .. } => ("all", terms),
                IndexQuery::AnyTerm { terms, .. } => ("any", terms),
            };
            writeln!(
                out,
                "{pad}IndexedScan table={table} {kind}=[{}]{}",
                terms.join(", "),
                window(w)
            )
        }
        LogicalPlan::Keyword { id, predicate, .. } => writeln!(
            out,
            "{pad}Keyword id={id} mode={:?} query={:?} attributes=[{}] analyzer={}{}",
            predicate.mode,
            predicate.query,
            predicate.attributes.join(", "),
            predicate.analyzer.as_deref().unwrap_or("default"),
            window(&predicate.window)
        ),
        LogicalPlan::Join { id, predicate, .. } => writeln!(
            out,
            "{pad}Join id={id} attribute={} threshold={}{}",
            predicate.attribute,
            predicate.threshold,
            window(&predicate.window)
        ),
    };
    for child in plan.children() {
        render(child, depth + 1, out);
    }
}
