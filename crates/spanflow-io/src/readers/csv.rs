//! CSV table loader.
//!
//! Columns are matched to schema attributes by header name; attributes
//! without a column load as null and extra columns are ignored. A cell that
//! does not parse as its attribute's type is logged and loaded as null.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use spanflow_core::schema::{AttributeType, Schema};
use spanflow_core::types::Field;
use tracing::warn;

use crate::error::Result;
use crate::memory_storage::MemoryStorage;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct CsvReader<R: Read> {
    reader: csv::Reader<R>,
    /// Column index feeding each schema attribute.
    columns: Vec<Option<usize>>,
    types: Vec<AttributeType>,
    names: Vec<String>,
    line: u64,
}

impl CsvReader<File> {
    pub fn from_path(path: impl AsRef<Path>, schema: &Schema) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file, schema)
    }
}

impl<R: Read> CsvReader<R> {
    pub fn from_reader(reader: R, schema: &Schema) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let columns = schema
            .attributes()
            .iter()
            .map(|a| headers.iter().position(|h| *h == a.name))
            .collect();
        Ok(Self {
            reader,
            columns,
            types: schema.attributes().iter().map(|a| a.attr_type).collect(),
            names: schema.attributes().iter().map(|a| a.name.clone()).collect(),
            line: 1,
        })
    }

    /// Next row as one field per schema attribute.
    pub fn next_row(&mut self) -> Result<Option<Vec<Field>>> {
        let mut record = csv::StringRecord::new();
        if !self.reader.read_record(&mut record)? {
            return Ok(None);
        }
        self.line += 1;
        let row = self
            .columns
            .iter()
            .zip(&self.types)
            .zip(&self.names)
            .map(|((col, ty), name)| {
                let cell = col.and_then(|c| record.get(c)).unwrap_or("");
                parse_cell(cell, *ty).unwrap_or_else(|| {
                    warn!(line = self.line, attribute = %name, cell, "unparseable cell loaded as null");
                    Field::Null
                })
            })
            .collect();
        Ok(Some(row))
    }
}

/// `None` when `cell` is not a valid `ty` literal. Empty cells are null.
pub fn parse_cell(cell: &str, ty: AttributeType) -> Option<Field> {
    if cell.is_empty() {
        return Some(Field::Null);
    }
    match ty {
        AttributeType::Integer => cell.trim().parse().ok().map(Field::Integer),
        AttributeType::Double => cell.trim().parse().ok().map(Field::Double),
        AttributeType::String => Some(Field::String(cell.to_string())),
        AttributeType::Text => Some(Field::Text(cell.to_string())),
        AttributeType::Date => NaiveDate::parse_from_str(cell.trim(), DATE_FORMAT)
            .ok()
            .map(Field::Date),
        AttributeType::List => None,
    }
}

/// Create `table` from `schema` and load every row of the CSV at `path`.
/// Returns the number of rows inserted.
pub fn load_table(
    storage: &MemoryStorage,
    table: &str,
    schema: Schema,
    path: impl AsRef<Path>,
) -> Result<usize> {
    let stored = storage.create_table(table, schema)?;
    let mut reader = CsvReader::from_path(path, &stored)?;
    let mut n = 0;
    while let Some(row) = reader.next_row()? {
        storage.insert(table, row)?;
        n += 1;
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use spanflow_core::schema::{Attribute, ID};
    use spanflow_operators::Operator;

    use crate::storage::Storage;

    fn schema() -> Schema {
        Schema::new(vec![
            Attribute::new("title", AttributeType::String),
            Attribute::new("body", AttributeType::Text),
            Attribute::new("year", AttributeType::Integer),
            Attribute::new("published", AttributeType::Date),
        ])
        .unwrap()
    }

    #[test]
    fn parses_typed_cells() {
        assert_eq!(parse_cell("42", AttributeType::Integer), Some(Field::Integer(42)));
        assert_eq!(parse_cell("x", AttributeType::Integer), None);
        assert_eq!(parse_cell("", AttributeType::Double), Some(Field::Null));
        assert_eq!(
            parse_cell("2021-03-04", AttributeType::Date),
            NaiveDate::from_ymd_opt(2021, 3, 4).map(Field::Date)
        );
        assert_eq!(parse_cell("[]", AttributeType::List), None);
    }

    #[test]
    fn reader_maps_columns_by_header() {
        let data = "body,title,extra\nsome text,A title,zzz\n";
        let mut r = CsvReader::from_reader(data.as_bytes(), &schema()).unwrap();
        let row = r.next_row().unwrap().unwrap();
        assert_eq!(
            row,
            vec![
                Field::String("A title".into()),
                Field::Text("some text".into()),
                Field::Null,
                Field::Null,
            ]
        );
        assert!(r.next_row().unwrap().is_none());
    }

    #[test]
    fn load_table_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{ID},title,body,year,published").unwrap();
        writeln!(file, "d1,First,book appointment with the doctor,2020,2020-01-02").unwrap();
        writeln!(file, ",Second,nice and beautiful person,not-a-year,").unwrap();
        file.flush().unwrap();

        let storage = MemoryStorage::default();
        let n = load_table(&storage, "notes", schema(), file.path()).unwrap();
        assert_eq!(n, 2);

        let mut scan = storage.open_scan("notes", Default::default()).unwrap();
        scan.open().unwrap();
        let first = scan.next().unwrap().unwrap();
        assert_eq!(first.id(), Some("d1"));
        assert_eq!(first.get("year"), Some(&Field::Integer(2020)));
        let second = scan.next().unwrap().unwrap();
        assert!(second.id().is_some_and(|id| !id.is_empty()));
        assert_eq!(second.get("year"), Some(&Field::Null));
    }
}
