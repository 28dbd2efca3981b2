//! Logical plan trees.
//!
//! The planner produces a `LogicalPlan` (what to run); exec instantiates one
//! operator per node and wires them into a pull pipeline.

use serde::{Deserialize, Serialize};

use crate::id::OpId;
use crate::predicate::{IndexQuery, JoinPredicate, KeywordPredicate, ResultWindow};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum LogicalPlan {
    /// Plain row scan of a stored table.
    Scan {
        table: String,
        #[serde(default, flatten)]
        window: ResultWindow,
    },
    /// Scan pre-filtered by the storage index.
    IndexedScan {
        table: String,
        query: IndexQuery,
        #[serde(default, flatten)]
        window: ResultWindow,
    },
    Keyword {
        id: OpId,
        #[serde(flatten)]
        predicate: KeywordPredicate,
        input: Box<LogicalPlan>,
    },
    Join {
        id: OpId,
        #[serde(flatten)]
        predicate: JoinPredicate,
        outer: Box<LogicalPlan>,
        inner: Box<LogicalPlan>,
    },
}

impl LogicalPlan {
    /// Returns the number of inputs for this node.
    pub fn inputs(&self) -> usize {
        use LogicalPlan::*;
        match self {
            Scan { .. } | IndexedScan { .. } => 0,
            Keyword { .. } => 1,
            Join { .. } => 2,
        }
    }

    /// Short operator label used by explain output and logs.
    pub fn label(&self) -> &'static str {
        use LogicalPlan::*;
        match self {
            Scan { .. } => "scan",
            IndexedScan { .. } => "indexed_scan",
            Keyword { .. } => "keyword",
            Join { .. } => "join",
        }
    }

    pub fn id(&self) -> Option<&OpId> {
        match self {
            LogicalPlan::Keyword { id, .. } | LogicalPlan::Join { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Direct children, outer before inner.
    pub fn children(&self) -> Vec<&LogicalPlan> {
        use LogicalPlan::*;
        match self {
            Scan { .. } | IndexedScan { .. } => vec![],
            Keyword { input, .. } => vec![input.as_ref()],
            Join { outer, inner, .. } => vec![outer.as_ref(), inner.as_ref()],
        }
    }

    /// Tables read by this subtree, left to right.
    pub fn tables(&self) -> Vec<&str> {
        match self {
            LogicalPlan::Scan { table, .. } | LogicalPlan::IndexedScan { table, .. } => {
                vec![table.as_str()]
            }
            _ => self.children().into_iter().flat_map(|c| c.tables()).collect(),
        }
    }
}
