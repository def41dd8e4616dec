//! A maximally shared term library.
//!
//! Terms are stored in a [TermPool] that guarantees that structurally equal
//! terms share a single representation, so equality of terms is a pointer
//! comparison. Term handles are reference counted and every handle keeps its
//! term alive; the pool reclaims terms that are only referenced by its own
//! hash-cons table, either on an explicit [TermPool::collect] call or
//! periodically during term creation.
//!
//! This crate does not use unsafe code.

#![forbid(unsafe_code)]

pub mod list;
pub mod pool;
pub mod random;
pub mod symbol;
pub mod table;
pub mod term;
pub mod text;

pub use list::*;
pub use pool::*;
pub use random::*;
pub use symbol::*;
pub use table::*;
pub use term::*;
pub use text::*;
