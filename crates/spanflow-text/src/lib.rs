#![forbid(unsafe_code)]
//! spanflow-text: analyzers and payload generation.
//!
//! An analyzer splits text into tokens carrying byte offsets and token
//! positions. Positions count every word, stopwords included, so a removed
//! stopword still leaves a gap the phrase matcher can see.

pub mod analyzer;
pub mod error;
pub mod payload;
pub mod stopwords;

pub use analyzer::{Analyzer, AnalyzerKind, Token};
pub use error::AnalyzerError;
pub use payload::build_payload;
