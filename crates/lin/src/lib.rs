//! The lineariser: transforms an mCRL2 process specification into a linear
//! process equation, a single choice over guarded, summed, action-prefixed
//! self-invocations with updated parameters.
//!
//! The transformation is staged: processes are classified into the
//! sequential (pCRL) and parallel (mCRL) fragments, terminating bodies are
//! wrapped with a distinguished termination action, the sequential fragment
//! is brought to Greibach normal form, control flow is encoded in a state
//! parameter or a stack datatype, summands are extracted, and the parallel
//! operators are expanded over the resulting summand sets. The rewriter is
//! used throughout to simplify conditions and discard unreachable summands.
//!
//! This crate does not use unsafe code.

#![forbid(unsafe_code)]

pub mod analysis;
pub mod cluster;
pub mod comm;
pub mod context;
pub mod enumtypes;
pub mod gnf;
pub mod operators;
pub mod options;
pub mod parallel;
pub mod specification;
pub mod split;
pub mod stacks;
pub mod sumelm;
pub mod summands;

pub use context::Lineariser;
pub use options::*;
pub use specification::{linearise, LinearisedSpec};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinError {
    /// An operator occurs in an illegal position, or an unsupported operator
    /// is used.
    #[error("syntax error: {0}")]
    Syntactic(String),

    /// A reference to an undeclared object, a double declaration or a sort
    /// mismatch.
    #[error("semantic error: {0}")]
    Semantic(String),
}
