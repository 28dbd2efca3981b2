//! Logical schema types. Pure data.
//!
//! A `Schema` is an ordered list of uniquely named `Attribute`s. Operators
//! compute their output schema once, at construction, by composing the input
//! schema with the attributes they append.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Reserved attribute holding the per-tuple token payload (List of spans).
pub const PAYLOAD: &str = "payload";

/// Reserved attribute holding the document identifier used by joins.
pub const ID: &str = "_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Integer,
    Double,
    /// Matched by exact equality only.
    String,
    /// Tokenized; supports partial and positional matching.
    Text,
    Date,
    /// List of spans.
    List,
}

impl AttributeType {
    /// Types a keyword query can be evaluated against.
    pub fn is_matchable(self) -> bool {
        matches!(self, AttributeType::String | AttributeType::Text)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "integer" | "int" | "i64" => Some(AttributeType::Integer),
            "double" | "float" | "f64" => Some(AttributeType::Double),
            "string" | "str" => Some(AttributeType::String),
            "text" => Some(AttributeType::Text),
            "date" => Some(AttributeType::Date),
            "list" | "spans" => Some(AttributeType::List),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttributeType::Integer => "integer",
            AttributeType::Double => "double",
            AttributeType::String => "string",
            AttributeType::Text => "text",
            AttributeType::Date => "date",
            AttributeType::List => "list",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
}

impl Attribute {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Attribute>", into = "Vec<Attribute>")]
pub struct Schema {
    attributes: Vec<Attribute>,
}

impl Schema {
    /// Build a schema, rejecting duplicate attribute names.
    pub fn new(attributes: Vec<Attribute>) -> Result<Self> {
        for (i, a) in attributes.iter().enumerate() {
            if attributes[..i].iter().any(|b| b.name == a.name) {
                return Err(Error::Schema(format!("duplicate attribute '{}'", a.name)));
            }
        }
        Ok(Self { attributes })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn attribute(&self, idx: usize) -> Option<&Attribute> {
        self.attributes.get(idx)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Returns a new schema with `attr` appended.
    pub fn with_attribute(&self, attr: Attribute) -> Result<Schema> {
        let mut attributes = self.attributes.clone();
        attributes.push(attr);
        Schema::new(attributes)
    }

    /// Returns a new schema with every attribute of `other` appended.
    pub fn append(&self, other: &Schema) -> Result<Schema> {
        let mut attributes = self.attributes.clone();
        attributes.extend(other.attributes.iter().cloned());
        Schema::new(attributes)
    }

    /// True when `prefix` is an ordered prefix of this schema.
    pub fn starts_with(&self, prefix: &Schema) -> bool {
        self.attributes.len() >= prefix.attributes.len()
            && self.attributes[..prefix.attributes.len()] == prefix.attributes[..]
    }

    /// Names of the attributes a keyword query may target, in schema order.
    pub fn matchable_names(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| a.attr_type.is_matchable())
            .map(|a| a.name.as_str())
            .collect()
    }
}

impl TryFrom<Vec<Attribute>> for Schema {
    type Error = Error;

    fn try_from(attributes: Vec<Attribute>) -> Result<Self> {
        Schema::new(attributes)
    }
}

impl From<Schema> for Vec<Attribute> {
    fn from(schema: Schema) -> Self {
        schema.attributes
    }
}
