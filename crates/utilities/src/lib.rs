//!
//! This crate defines general utility functions.
//!
//! This crate does not use unsafe code.

#![forbid(unsafe_code)]

pub mod indexed_set;

pub use indexed_set::*;
