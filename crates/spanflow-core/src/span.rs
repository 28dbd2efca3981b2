//! Spans: labeled `[start, end)` intervals over a text field.
//!
//! Offsets are UTF-8 byte offsets into the field value and always fall on
//! character boundaries, so `value` is exactly `&text[start..end]`.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    attribute_name: String,
    start: usize,
    end: usize,
    key: String,
    value: String,
    /// Token position inside the field, set on payload spans only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_offset: Option<usize>,
}

impl Span {
    pub fn new(
        attribute_name: impl Into<String>,
        start: usize,
        end: usize,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        debug_assert!(start <= end, "span start {start} past end {end}");
        Self {
            attribute_name: attribute_name.into(),
            start,
            end,
            key: key.into(),
            value: value.into(),
            token_offset: None,
        }
    }

    /// Build a span whose value is sliced out of `text`.
    ///
    /// Fails when the interval is inverted, out of bounds, or splits a
    /// character.
    pub fn over(
        attribute_name: impl Into<String>,
        text: &str,
        start: usize,
        end: usize,
        key: impl Into<String>,
    ) -> Result<Self> {
        if start > end {
            return Err(Error::Span(format!("inverted interval [{start}, {end})")));
        }
        let value = text.get(start..end).ok_or_else(|| {
            Error::Span(format!(
                "interval [{start}, {end}) is not a valid slice of a {}-byte field",
                text.len()
            ))
        })?;
        Ok(Self::new(attribute_name, start, end, key, value))
    }

    pub fn with_token_offset(mut self, offset: usize) -> Self {
        self.token_offset = Some(offset);
        self
    }

    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn token_offset(&self) -> Option<usize> {
        self.token_offset
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

// Identity is the five annotation fields; the token position is bookkeeping.
impl PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        self.attribute_name == other.attribute_name
            && self.start == other.start
            && self.end == other.end
            && self.key == other.key
            && self.value == other.value
    }
}

impl Eq for Span {}

impl Hash for Span {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.attribute_name.hash(state);
        self.start.hash(state);
        self.end.hash(state);
        self.key.hash(state);
        self.value.hash(state);
    }
}
