//! Convenient re-exports for downstream crates.

pub use crate::config::EngineConfig;
pub use crate::dag::LogicalPlan;
pub use crate::error::{Error, Result};
pub use crate::id::{DocId, OpId};
pub use crate::manifest::{ManifestId, RunManifest};
pub use crate::predicate::{
    IndexQuery, JoinPredicate, KeywordPredicate, MatchingMode, ResultWindow,
};
pub use crate::schema::{Attribute, AttributeType, Schema, ID, PAYLOAD};
pub use crate::span::Span;
pub use crate::types::{Field, Tuple, TupleBuilder};
