//! Table loaders.

pub mod csv;
