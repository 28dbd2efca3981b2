//! Field values and tuples.
//!
//! A `Tuple` pairs a shared `Schema` with one `Field` per attribute. Tuples
//! are never mutated once built; operators derive new ones through
//! `TupleBuilder` (copy the input fields, append computed ones).

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{AttributeType, Schema, ID};
use crate::span::Span;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Field {
    /// Absent value; assignable to every attribute type.
    Null,
    Integer(i64),
    Double(f64),
    String(String),
    Text(String),
    Date(NaiveDate),
    List(Vec<Span>),
}

impl Field {
    /// The attribute type this value carries, `None` for `Null`.
    pub fn attr_type(&self) -> Option<AttributeType> {
        match self {
            Field::Null => None,
            Field::Integer(_) => Some(AttributeType::Integer),
            Field::Double(_) => Some(AttributeType::Double),
            Field::String(_) => Some(AttributeType::String),
            Field::Text(_) => Some(AttributeType::Text),
            Field::Date(_) => Some(AttributeType::Date),
            Field::List(_) => Some(AttributeType::List),
        }
    }

    pub fn is_assignable_to(&self, ty: AttributeType) -> bool {
        self.attr_type().map_or(true, |t| t == ty)
    }

    /// Borrow the string content of a STRING or TEXT value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::String(s) | Field::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_spans(&self) -> Option<&[Span]> {
        match self {
            Field::List(spans) => Some(spans),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Null => f.write_str("null"),
            Field::Integer(v) => write!(f, "{v}"),
            Field::Double(v) => write!(f, "{v}"),
            Field::String(s) | Field::Text(s) => f.write_str(s),
            Field::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Field::List(spans) => write!(f, "[{} spans]", spans.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    schema: Arc<Schema>,
    fields: Vec<Field>,
}

impl Tuple {
    /// Build a tuple, checking field count and per-attribute types.
    pub fn new(schema: Arc<Schema>, fields: Vec<Field>) -> Result<Self> {
        if fields.len() != schema.len() {
            return Err(Error::Schema(format!(
                "tuple has {} fields, schema has {} attributes",
                fields.len(),
                schema.len()
            )));
        }
        for (attr, field) in schema.attributes().iter().zip(&fields) {
            if !field.is_assignable_to(attr.attr_type) {
                return Err(Error::Type {
                    attribute: attr.name.clone(),
                    expected: attr.attr_type.to_string(),
                    actual: field
                        .attr_type()
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "null".into()),
                });
            }
        }
        Ok(Self { schema, fields })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.schema.index_of(name).and_then(|i| self.fields.get(i))
    }

    /// String content of a STRING/TEXT attribute, `None` when absent or null.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Field::as_str)
    }

    /// Span list stored under `name`, `None` when the attribute is missing or
    /// not a list.
    pub fn spans(&self, name: &str) -> Option<&[Span]> {
        self.get(name).and_then(Field::as_spans)
    }

    /// Document identifier carried in the reserved `_id` attribute.
    pub fn id(&self) -> Option<&str> {
        self.text(ID)
    }

    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }
}

/// Builds an output tuple against a precomputed output schema.
pub struct TupleBuilder {
    schema: Arc<Schema>,
    fields: Vec<Field>,
}

impl TupleBuilder {
    pub fn new(schema: Arc<Schema>) -> Self {
        let cap = schema.len();
        Self {
            schema,
            fields: Vec::with_capacity(cap),
        }
    }

    /// Copy every field of `input`. The output schema must extend the input's.
    pub fn extend_from(mut self, input: &Tuple) -> Result<Self> {
        if !self.fields.is_empty() || !self.schema.starts_with(input.schema()) {
            return Err(Error::Schema(
                "output schema does not extend the input tuple schema".into(),
            ));
        }
        self.fields.extend(input.fields.iter().cloned());
        Ok(self)
    }

    pub fn push(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Result<Tuple> {
        Tuple::new(self.schema, self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new(vec![
                Attribute::new(ID, AttributeType::String),
                Attribute::new("body", AttributeType::Text),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn new_checks_arity_and_types() {
        let s = schema();
        assert!(Tuple::new(s.clone(), vec![Field::String("1".into())]).is_err());
        let err = Tuple::new(
            s.clone(),
            vec![Field::String("1".into()), Field::Integer(3)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Type { .. }));
        assert!(Tuple::new(s, vec![Field::String("1".into()), Field::Null]).is_ok());
    }

    #[test]
    fn builder_appends_to_input() {
        let s = schema();
        let input = Tuple::new(
            s.clone(),
            vec![Field::String("d1".into()), Field::Text("hello".into())],
        )
        .unwrap();
        let out_schema = Arc::new(
            s.with_attribute(Attribute::new("hits", AttributeType::List))
                .unwrap(),
        );
        let out = TupleBuilder::new(out_schema)
            .extend_from(&input)
            .unwrap()
            .push(Field::List(vec![Span::new("body", 0, 5, "hello", "hello")]))
            .build()
            .unwrap();
        assert_eq!(out.id(), Some("d1"));
        assert_eq!(out.text("body"), Some("hello"));
        assert_eq!(out.spans("hits").unwrap().len(), 1);
        assert!(out.spans("body").is_none());
    }

    #[test]
    fn builder_rejects_unrelated_schema() {
        let input = Tuple::new(
            schema(),
            vec![Field::String("d1".into()), Field::Text("x".into())],
        )
        .unwrap();
        let other = Arc::new(Schema::new(vec![Attribute::new("z", AttributeType::Text)]).unwrap());
        assert!(TupleBuilder::new(other).extend_from(&input).is_err());
    }
}
