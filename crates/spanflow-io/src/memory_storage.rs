//! In-memory tables with a term index.
//!
//! Every table carries the reserved `_id` attribute; rows inserted without
//! one get a fresh uuid. TEXT and STRING values, `_id` included, are
//! analyzed on insert and recorded in an `attribute -> term -> rows` index
//! that backs `open_indexed_query`.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use spanflow_core::id::DocId;
use spanflow_core::predicate::{IndexQuery, ResultWindow};
use spanflow_core::schema::{Attribute, AttributeType, Schema, ID};
use spanflow_core::types::{Field, Tuple};
use spanflow_operators::{BoxedOperator, ValuesOp};
use spanflow_text::{Analyzer, AnalyzerKind};
use tracing::debug;

use crate::error::{Error, Result};
use crate::storage::Storage;

type TermIndex = HashMap<String, HashMap<String, BTreeSet<usize>>>;

struct Table {
    schema: Arc<Schema>,
    rows: Vec<Tuple>,
    index: TermIndex,
}

impl Table {
    fn index_row(&mut self, analyzer: &Analyzer, row: usize) {
        let tuple = &self.rows[row];
        for (attr, field) in tuple.schema().attributes().iter().zip(tuple.fields()) {
            if !attr.attr_type.is_matchable() {
                continue;
            }
            let Some(text) = field.as_str() else {
                continue;
            };
            let terms = self.index.entry(attr.name.clone()).or_default();
            for term in analyzer.term_set(text) {
                terms.entry(term).or_default().insert(row);
            }
        }
    }

    fn candidates(&self, query: &IndexQuery) -> Result<BTreeSet<usize>> {
        let (attributes, terms, all) = match query {
            IndexQuery::AllTerms { attributes, terms } => (attributes, terms, true),
            IndexQuery::AnyTerm { attributes, terms } => (attributes, terms, false),
        };
        let empty = HashMap::new();
        let mut rows = BTreeSet::new();
        for name in attributes {
            if !self.schema.contains(name) {
                return Err(Error::Storage(format!("attribute '{name}' is not in the table")));
            }
            let postings = self.index.get(name).unwrap_or(&empty);
            let lists = terms.iter().map(|t| postings.get(t));
            if all {
                if terms.is_empty() {
                    rows.extend(0..self.rows.len());
                    continue;
                }
                let mut acc: Option<BTreeSet<usize>> = None;
                for list in lists {
                    let Some(list) = list else {
                        acc = Some(BTreeSet::new());
                        break;
                    };
                    acc = Some(match acc {
                        None => list.clone(),
                        Some(prev) => prev.intersection(list).copied().collect(),
                    });
                }
                rows.extend(acc.unwrap_or_default());
            } else {
                for list in lists.flatten() {
                    rows.extend(list.iter().copied());
                }
            }
        }
        Ok(rows)
    }
}

/// Thread-safe in-memory storage.
pub struct MemoryStorage {
    analyzer: Analyzer,
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStorage {
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer,
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Analyzer used to index stored text.
    pub fn analyzer(&self) -> Analyzer {
        self.analyzer
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Table>>> {
        self.tables
            .read()
            .map_err(|_| Error::Storage("table lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Table>>> {
        self.tables
            .write()
            .map_err(|_| Error::Storage("table lock poisoned".into()))
    }

    /// Register `table`. A `_id` STRING attribute is prepended when the
    /// schema does not declare one. Returns the stored schema.
    pub fn create_table(&self, table: &str, schema: Schema) -> Result<Arc<Schema>> {
        let schema = match schema.get(ID) {
            Some(attr) if attr.attr_type != AttributeType::String => {
                return Err(Error::Storage(format!(
                    "attribute '{ID}' must be string, found {}",
                    attr.attr_type
                )))
            }
            Some(_) => schema,
            None => Schema::new(vec![Attribute::new(ID, AttributeType::String)])?.append(&schema)?,
        };
        let schema = Arc::new(schema);

        let mut tables = self.write()?;
        if tables.contains_key(table) {
            return Err(Error::TableExists(table.to_string()));
        }
        tables.insert(
            table.to_string(),
            Table {
                schema: Arc::clone(&schema),
                rows: Vec::new(),
                index: HashMap::new(),
            },
        );
        debug!(table, attributes = schema.len(), "table created");
        Ok(schema)
    }

    /// Append a row and index it.
    ///
    /// `fields` either covers every attribute or every attribute but `_id`.
    /// A missing or null `_id` is replaced by a generated one.
    pub fn insert(&self, table: &str, mut fields: Vec<Field>) -> Result<DocId> {
        let mut tables = self.write()?;
        let t = tables
            .get_mut(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))?;
        let id_idx = t
            .schema
            .index_of(ID)
            .ok_or_else(|| Error::Storage(format!("table '{table}' has no '{ID}' attribute")))?;

        if fields.len() + 1 == t.schema.len() {
            fields.insert(id_idx, Field::Null);
        }
        let id = match fields.get(id_idx) {
            Some(Field::String(s)) => DocId::from(s.as_str()),
            _ => {
                let id = DocId::generate();
                if let Some(slot) = fields.get_mut(id_idx) {
                    *slot = Field::String(id.as_str().to_string());
                }
                id
            }
        };

        let tuple = Tuple::new(Arc::clone(&t.schema), fields)?;
        t.rows.push(tuple);
        let row = t.rows.len() - 1;
        t.index_row(&self.analyzer, row);
        Ok(id)
    }

    pub fn len(&self, table: &str) -> Result<usize> {
        let tables = self.read()?;
        tables
            .get(table)
            .map(|t| t.rows.len())
            .ok_or_else(|| Error::UnknownTable(table.to_string()))
    }

    fn source(
        &self,
        label: String,
        schema: Arc<Schema>,
        rows: Vec<Tuple>,
        window: ResultWindow,
    ) -> Result<BoxedOperator> {
        Ok(Box::new(ValuesOp::new(label, schema, rows)?.with_window(window)))
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(Analyzer::standard())
    }
}

impl Storage for MemoryStorage {
    fn schema(&self, table: &str) -> Result<Arc<Schema>> {
        let tables = self.read()?;
        tables
            .get(table)
            .map(|t| Arc::clone(&t.schema))
            .ok_or_else(|| Error::UnknownTable(table.to_string()))
    }

    fn open_scan(&self, table: &str, window: ResultWindow) -> Result<BoxedOperator> {
        let (schema, rows) = {
            let tables = self.read()?;
            let t = tables
                .get(table)
                .ok_or_else(|| Error::UnknownTable(table.to_string()))?;
            (Arc::clone(&t.schema), t.rows.clone())
        };
        debug!(table, rows = rows.len(), "scan opened");
        self.source(format!("scan:{table}"), schema, rows, window)
    }

    fn open_indexed_query(
        &self,
        table: &str,
        query: &IndexQuery,
        window: ResultWindow,
    ) -> Result<BoxedOperator> {
        let (schema, rows, total) = {
            let tables = self.read()?;
            let t = tables
                .get(table)
                .ok_or_else(|| Error::UnknownTable(table.to_string()))?;
            let hits = t.candidates(query)?;
            let rows: Vec<Tuple> = hits.into_iter().map(|i| t.rows[i].clone()).collect();
            (Arc::clone(&t.schema), rows, t.rows.len())
        };
        debug!(table, candidates = rows.len(), total, "indexed scan opened");
        self.source(format!("index:{table}"), schema, rows, window)
    }

    fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .read()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn index_analyzer(&self) -> Option<AnalyzerKind> {
        Some(self.analyzer.kind())
    }
}
