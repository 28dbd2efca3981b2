#![forbid(unsafe_code)]
//! spanflow-operators: pull-based stages that attach and merge spans.
//!
//! - `ValuesOp` is the in-memory leaf every storage scan hands out.
//! - `KeywordMatcher` annotates tuples with substring, conjunction or phrase
//!   matches and drops tuples without any.
//! - `DistanceJoin` co-groups two matcher outputs by document id and merges
//!   spans whose endpoints lie within a threshold.
//!
//! All of them share `OperatorBase` for lifecycle and `offset`/`limit`.

pub mod error;
pub mod join;
pub mod keyword;
pub mod traits;
pub mod values;

pub use error::{JoinSide, OpError, OpResult};
pub use join::DistanceJoin;
pub use keyword::{CompiledQuery, KeywordMatcher};
pub use traits::{BoxedOperator, Operator, OperatorBase, OperatorState};
pub use values::ValuesOp;
