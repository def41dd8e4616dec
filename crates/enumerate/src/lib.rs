//! Enumeration of the solutions of an open boolean term, also called
//! narrowing. Given a term with free variables, such as "x < 5", each
//! variable is instantiated with the constructors of its sort; for Peano
//! naturals with constructors zero and s(y) the term is narrowed to
//! "zero < 5" and "s(y') < 5" with y' a fresh variable. Branches whose
//! predicate rewrites to false are pruned, and assignments whose predicate
//! rewrites to true are solutions.
//!
//! This crate does not use unsafe code.

#![forbid(unsafe_code)]

pub mod enumerator;

pub use enumerator::*;
