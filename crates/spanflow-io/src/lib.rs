#![forbid(unsafe_code)]
//! spanflow-io: the storage collaborator and file adapters.
//!
//! - `Storage` is the only interface operators see: plain and indexed scans.
//! - `MemoryStorage` keeps tables in memory with a per-table term index.
//! - `readers::csv` loads tables; `writers::jsonl` writes result tuples.

pub mod error;
pub mod memory_storage;
pub mod readers;
pub mod storage;
pub mod writers;

pub use error::{Error, Result};
pub use memory_storage::MemoryStorage;
pub use storage::Storage;
