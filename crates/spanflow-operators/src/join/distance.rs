//! Endpoint-distance predicate and span merging.
//!
//! Two spans over the same attribute are joinable when both their start
//! offsets and their end offsets lie within `threshold` bytes of each other.
//! The predicate is symmetric; it is neither a containment nor a gap test.

use spanflow_core::error::Result;
use spanflow_core::span::Span;

/// Key of a merged span: `outer_inner`.
pub fn merged_key(outer: &Span, inner: &Span) -> String {
    format!("{}_{}", outer.key(), inner.key())
}

pub fn joinable(outer: &Span, inner: &Span, threshold: usize) -> bool {
    outer.attribute_name() == inner.attribute_name()
        && outer.start().abs_diff(inner.start()) <= threshold
        && outer.end().abs_diff(inner.end()) <= threshold
}

/// Span covering both inputs, its value re-sliced from `text`.
pub fn merge(text: &str, outer: &Span, inner: &Span) -> Result<Span> {
    Span::over(
        outer.attribute_name(),
        text,
        outer.start().min(inner.start()),
        outer.end().max(inner.end()),
        merged_key(outer, inner),
    )
}

/// Every joinable (outer, inner) pair on `attribute`, in outer-major order.
pub fn merge_all(
    attribute: &str,
    text: &str,
    outer: &[Span],
    inner: &[Span],
    threshold: usize,
) -> Result<Vec<Span>> {
    let mut merged = Vec::new();
    for o in outer.iter().filter(|s| s.attribute_name() == attribute) {
        for i in inner.iter().filter(|s| s.attribute_name() == attribute) {
            if joinable(o, i, threshold) {
                merged.push(merge(text, o, i)?);
            }
        }
    }
    Ok(merged)
}
