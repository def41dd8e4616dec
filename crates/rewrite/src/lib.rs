//! An equation-driven term rewriter with two selectable strategies. Both
//! bring data expressions to normal form under a set of conditional rewrite
//! rules, trying the rules for a head symbol in the order in which they were
//! installed.
//!
//! This crate does not use unsafe code.

#![forbid(unsafe_code)]

pub mod compact_rewriter;
pub mod innermost_rewriter;
pub mod matching;
pub mod rewrite_specification;

#[cfg(test)]
pub mod test_specification;

pub use compact_rewriter::*;
pub use innermost_rewriter::*;
pub use rewrite_specification::*;

use mcrl2rust_aterm::{ATerm, TermPool};
use rustc_hash::FxHashMap;

/// A rewrite engine normalises data expressions. Open terms are rewritten to
/// weak head normal form at least; closed terms reach full normal form.
pub trait RewriteEngine {
    /// Rewrites the given term to normal form.
    fn rewrite(&mut self, tp: &mut TermPool, term: &ATerm) -> ATerm {
        let env = SubstitutionEnv::new();
        self.rewrite_under(tp, &env, term)
    }

    /// Rewrites the given term under a substitution for its free variables.
    /// The bound terms are assumed to be in normal form.
    fn rewrite_under(&mut self, tp: &mut TermPool, env: &SubstitutionEnv, term: &ATerm) -> ATerm;

    /// Installs an additional rule; it is tried after the rules already
    /// present for the same head symbol.
    fn add_rule(&mut self, tp: &mut TermPool, rule: &RewriteRule);
}

/// A substitution context threaded through a rewrite call without copying
/// the subject term. Bindings are scoped with [SubstitutionEnv::set] and
/// [SubstitutionEnv::clear].
#[derive(Default)]
pub struct SubstitutionEnv {
    bindings: FxHashMap<ATerm, ATerm>,
}

impl SubstitutionEnv {
    pub fn new() -> SubstitutionEnv {
        SubstitutionEnv::default()
    }

    /// Binds a variable, returning the previous binding if any.
    pub fn set(&mut self, variable: &ATerm, term: &ATerm) -> Option<ATerm> {
        debug_assert!(
            mcrl2rust_mcrl2::data::is_variable(variable),
            "Can only bind variables, found {variable}"
        );
        self.bindings.insert(variable.clone(), term.clone())
    }

    /// Removes the binding of a variable.
    pub fn clear(&mut self, variable: &ATerm) -> Option<ATerm> {
        self.bindings.remove(variable)
    }

    pub fn get(&self, variable: &ATerm) -> Option<&ATerm> {
        self.bindings.get(variable)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Counters kept by the rewriters for diagnostics.
#[derive(Default, Debug)]
pub struct RewritingStatistics {
    /// The number of times the rewriter recursed into a subterm.
    pub recursions: usize,
    /// The number of rule applications.
    pub rewrite_steps: usize,
}
