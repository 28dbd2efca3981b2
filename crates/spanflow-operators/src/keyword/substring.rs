//! Case-insensitive substring scan.

use spanflow_core::span::Span;

#[derive(Debug, Clone)]
pub struct SubstringQuery {
    query: String,
    folded: String,
}

impl SubstringQuery {
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        let folded = query.to_lowercase();
        Self { query, folded }
    }

    /// Every occurrence of the query in `text`, overlapping ones included.
    ///
    /// After a hit the scan resumes one character past the hit's start, so
    /// `"is"` over `"is is"` and `"aa"` over `"aaa"` both report two spans.
    pub fn find_all(&self, attribute: &str, text: &str) -> Vec<Span> {
        let folded = FoldedText::new(text);
        let mut spans = Vec::new();
        let mut from = 0;
        while let Some(rel) = folded.text[from..].find(&self.folded) {
            let hit = from + rel;
            let start = folded.starts[hit];
            let end = folded.ends[hit + self.folded.len() - 1];
            spans.push(Span::new(attribute, start, end, &self.query, &text[start..end]));
            from = hit
                + folded.text[hit..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
        }
        spans
    }
}

/// Lowercased copy of a text plus, per folded byte, the byte range of the
/// original character it came from.
struct FoldedText {
    text: String,
    starts: Vec<usize>,
    ends: Vec<usize>,
}

impl FoldedText {
    fn new(original: &str) -> Self {
        let mut text = String::with_capacity(original.len());
        let mut starts = Vec::with_capacity(original.len());
        let mut ends = Vec::with_capacity(original.len());
        for (i, c) in original.char_indices() {
            let before = text.len();
            text.extend(c.to_lowercase());
            let added = text.len() - before;
            starts.extend(std::iter::repeat(i).take(added));
            ends.extend(std::iter::repeat(i + c.len_utf8()).take(added));
        }
        Self { text, starts, ends }
    }
}
