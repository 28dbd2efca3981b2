//! Run manifest for audit/replay.
//!
//! The engine emits a manifest after a pipeline has been drained; rerunning
//! the same plan over the same tables yields the same plan hash and counts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::Hash256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub id: ManifestId,

    /// Stable hash of the logical plan (and operator predicates) used.
    pub plan_hash: Hash256,

    /// Engine version string for provenance.
    pub engine_version: String,

    /// Tuples delivered to the sink.
    pub tuples_emitted: u64,

    /// Total spans carried by the delivered tuples' result attribute.
    pub spans_emitted: u64,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl RunManifest {
    pub fn new(plan_hash: Hash256, started_ms: u64) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            plan_hash,
            engine_version: crate::VERSION.to_string(),
            tuples_emitted: 0,
            spans_emitted: 0,
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(mut self, finished_ms: u64, tuples: u64, spans: u64) -> Self {
        self.finished_ms = finished_ms;
        self.tuples_emitted = tuples;
        self.spans_emitted = spans;
        self
    }

    pub fn duration_ms(&self) -> u64 {
        self.finished_ms.saturating_sub(self.started_ms)
    }
}
