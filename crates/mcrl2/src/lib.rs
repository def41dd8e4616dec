//! The mCRL2 abstract syntax on top of the shared term library: sort
//! expressions, data expressions, multi-actions, process expressions and
//! linear process equations, together with the substitution and occurrence
//! primitives the lineariser relies on.
//!
//! Every syntactic category is an ordinary term with a reserved head symbol;
//! the modules below provide the constructors and recognisers. The
//! representation follows the term format of the mCRL2 toolset.
//!
//! This crate does not use unsafe code.

#![forbid(unsafe_code)]

pub mod data;
pub mod fresh;
pub mod lps;
pub mod process;
pub mod sort;
pub mod specification;
pub mod substitution;

pub use fresh::*;
pub use specification::*;
