//! Streaming NDJSON writer for result tuples.
//!
//! One object per tuple keyed by attribute name. The internal payload is
//! never written; span lists become arrays of span objects.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::{Map, Value};
use spanflow_core::schema::PAYLOAD;
use spanflow_core::types::{Field, Tuple};

use crate::error::Result;
use crate::readers::csv::DATE_FORMAT;

pub struct JsonlWriter<W: Write> {
    writer: BufWriter<W>,
    written: u64,
}

impl JsonlWriter<File> {
    pub fn to_path(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let f = File::create(path)?;
        Ok(Self::to_writer(f))
    }
}

impl<W: Write> JsonlWriter<W> {
    pub fn to_writer(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            written: 0,
        }
    }

    pub fn write_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let line = serde_json::to_string(&tuple_to_json(tuple)?)?;
        writeln!(self.writer, "{line}")?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and hand back the inner writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| crate::error::Error::Io(e.into_error()))
    }
}

pub fn tuple_to_json(tuple: &Tuple) -> Result<Value> {
    let mut obj = Map::new();
    for (attr, field) in tuple.schema().attributes().iter().zip(tuple.fields()) {
        if attr.name == PAYLOAD {
            continue;
        }
        obj.insert(attr.name.clone(), field_to_json(field)?);
    }
    Ok(Value::Object(obj))
}

fn field_to_json(field: &Field) -> Result<Value> {
    Ok(match field {
        Field::Null => Value::Null,
        Field::Integer(i) => Value::from(*i),
        Field::Double(d) => Value::from(*d),
        Field::String(s) | Field::Text(s) => Value::String(s.clone()),
        Field::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
        Field::List(spans) => serde_json::to_value(spans)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use spanflow_core::schema::{Attribute, AttributeType, Schema};
    use spanflow_core::span::Span;

    fn tuple() -> Tuple {
        let schema = Arc::new(
            Schema::new(vec![
                Attribute::new("body", AttributeType::Text),
                Attribute::new(PAYLOAD, AttributeType::List),
                Attribute::new("kw", AttributeType::List),
            ])
            .unwrap(),
        );
        let hit = Span::new("body", 0, 4, "book", "Book");
        Tuple::new(
            schema,
            vec![
                Field::Text("Book it".into()),
                Field::List(vec![hit.clone().with_token_offset(0)]),
                Field::List(vec![hit]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn payload_is_omitted_and_spans_are_objects() {
        let v = tuple_to_json(&tuple()).unwrap();
        assert!(v.get(PAYLOAD).is_none());
        assert_eq!(v["body"], "Book it");
        assert_eq!(v["kw"][0]["start"], 0);
        assert_eq!(v["kw"][0]["end"], 4);
        assert_eq!(v["kw"][0]["key"], "book");
        assert_eq!(v["kw"][0]["value"], "Book");
    }

    #[test]
    fn writes_one_line_per_tuple() {
        let mut w = JsonlWriter::to_writer(Vec::new());
        w.write_tuple(&tuple()).unwrap();
        w.write_tuple(&tuple()).unwrap();
        assert_eq!(w.written(), 2);
        let out = String::from_utf8(w.into_inner().unwrap()).unwrap();
        assert_eq!(out.lines().count(), 2);
        for line in out.lines() {
            let _: Value = serde_json::from_str(line).unwrap();
        }
    }
}
