//! Reading and writing of the persisted binary term stream format.
//!
//! A file starts with a flag declaring whether the term stream is indexed
//! (maximally shared nodes written once and referenced) or plain, followed
//! by three packed integers for the body position, trailer position and
//! format version, a creator string and four type-descriptor strings. The
//! body is a symbol table followed by the term stream, written with minimal
//! bit widths.
//!
//! This crate does not use unsafe code.

#![forbid(unsafe_code)]

pub mod binary;
pub mod packed;

pub use binary::*;
pub use packed::*;
