//! Operator configuration surfaces.
//!
//! These are plain data: callers build them by hand or deserialize them from
//! a pipeline file, and operators validate them once against their input
//! schema at construction. Nothing here knows about tuples in flight.

use serde::{Deserialize, Serialize};

/// Analyzer used when a predicate does not name one.
pub const DEFAULT_ANALYZER: &str = "standard";

/// `offset`/`limit` window applied to an operator's stream of results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultWindow {
    /// Maximum number of results to emit; `None` is unbounded.
    pub limit: Option<usize>,
    /// Number of leading results to skip.
    pub offset: usize,
}

impl ResultWindow {
    pub fn new(limit: Option<usize>, offset: usize) -> Self {
        Self { limit, offset }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn limit(limit: usize) -> Self {
        Self::new(Some(limit), 0)
    }

    /// Number of results a producer of `n` results yields under this window.
    pub fn expected(&self, n: usize) -> usize {
        let after_offset = n.saturating_sub(self.offset);
        self.limit.map_or(after_offset, |l| l.min(after_offset))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchingMode {
    /// Case-insensitive scan for the literal query string.
    Substring,
    /// Every query token present, in any order.
    Conjunction,
    /// Query tokens in order; stopwords are single-token wildcards.
    Phrase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordPredicate {
    pub query: String,
    pub attributes: Vec<String>,
    /// Analyzer name; `None` defers to the engine's configured analyzer.
    #[serde(default)]
    pub analyzer: Option<String>,
    pub mode: MatchingMode,
    /// Attribute receiving the match spans; defaults to the operator id.
    #[serde(default)]
    pub result_attribute: Option<String>,
    #[serde(default, flatten)]
    pub window: ResultWindow,
}

impl KeywordPredicate {
    pub fn new(query: impl Into<String>, attributes: Vec<String>, mode: MatchingMode) -> Self {
        Self {
            query: query.into(),
            attributes,
            analyzer: None,
            mode,
            result_attribute: None,
            window: ResultWindow::default(),
        }
    }

    pub fn with_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    /// The analyzer this predicate runs with when the engine default is
    /// `default`.
    pub fn analyzer_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.analyzer.as_deref().unwrap_or(default)
    }

    pub fn with_result_attribute(mut self, name: impl Into<String>) -> Self {
        self.result_attribute = Some(name.into());
        self
    }

    pub fn with_window(mut self, window: ResultWindow) -> Self {
        self.window = window;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPredicate {
    /// Text attribute whose spans are compared and merged.
    pub attribute: String,
    /// Maximum distance between matching start offsets and end offsets.
    pub threshold: usize,
    /// Span-list attribute read from outer tuples; defaults to the last list
    /// attribute other than the payload.
    #[serde(default)]
    pub outer_spans: Option<String>,
    #[serde(default)]
    pub inner_spans: Option<String>,
    /// Attribute receiving the merged spans; defaults to the operator id.
    #[serde(default)]
    pub result_attribute: Option<String>,
    #[serde(default, flatten)]
    pub window: ResultWindow,
}

impl JoinPredicate {
    pub fn new(attribute: impl Into<String>, threshold: usize) -> Self {
        Self {
            attribute: attribute.into(),
            threshold,
            outer_spans: None,
            inner_spans: None,
            result_attribute: None,
            window: ResultWindow::default(),
        }
    }

    pub fn with_span_attributes(
        mut self,
        outer: impl Into<String>,
        inner: impl Into<String>,
    ) -> Self {
        self.outer_spans = Some(outer.into());
        self.inner_spans = Some(inner.into());
        self
    }

    pub fn with_result_attribute(mut self, name: impl Into<String>) -> Self {
        self.result_attribute = Some(name.into());
        self
    }

    pub fn with_window(mut self, window: ResultWindow) -> Self {
        self.window = window;
        self
    }
}

/// Structured pre-filter handed to the storage layer's indexed scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum IndexQuery {
    /// Rows containing every term in at least one of `attributes`.
    AllTerms {
        attributes: Vec<String>,
        terms: Vec<String>,
    },
    /// Rows containing any term in any of `attributes`.
    AnyTerm {
        attributes: Vec<String>,
        terms: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_expected_counts() {
        assert_eq!(ResultWindow::unbounded().expected(5), 5);
        assert_eq!(ResultWindow::new(Some(2), 1).expected(5), 2);
        assert_eq!(ResultWindow::new(Some(10), 3).expected(5), 2);
        assert_eq!(ResultWindow::new(None, 9).expected(5), 0);
        assert_eq!(ResultWindow::limit(0).expected(5), 0);
    }

    #[test]
    fn keyword_predicate_defaults_from_json() {
        let p: KeywordPredicate = serde_json::from_str(
            r#"{"query":"book","attributes":["body"],"mode":"phrase","limit":3}"#,
        )
        .unwrap();
        assert_eq!(p.analyzer, None);
        assert_eq!(p.analyzer_or(DEFAULT_ANALYZER), "standard");
        assert_eq!(p.clone().with_analyzer("simple").analyzer_or(DEFAULT_ANALYZER), "simple");
        assert_eq!(p.mode, MatchingMode::Phrase);
        assert_eq!(p.window, ResultWindow::new(Some(3), 0));
        assert!(p.result_attribute.is_none());
    }

    #[test]
    fn join_predicate_rejects_negative_threshold() {
        let bad = serde_json::from_str::<JoinPredicate>(r#"{"attribute":"body","threshold":-1}"#);
        assert!(bad.is_err());
        let ok: JoinPredicate =
            serde_json::from_str(r#"{"attribute":"body","threshold":20,"offset":2}"#).unwrap();
        assert_eq!(ok.threshold, 20);
        assert_eq!(ok.window.offset, 2);
    }
}
