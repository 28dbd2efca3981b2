#![forbid(unsafe_code)]
//! spanflow-core: the span-bearing record model shared by every crate.
//!
//! Pure data only: schemas, field values, spans, tuples, operator
//! predicates, logical plans, engine config and run manifests. No IO and
//! no text analysis happen here.

pub mod config;
pub mod dag;
pub mod error;
pub mod hash;
pub mod id;
pub mod manifest;
pub mod predicate;
pub mod prelude;
pub mod schema;
pub mod span;
pub mod types;

/// Engine version recorded in run manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
