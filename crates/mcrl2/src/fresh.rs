//! Fresh name generation. The term pool's symbol table is the single string
//! pool of the system, so checking a candidate against it guarantees that a
//! generated name differs from every name that occurs anywhere in the input.

use ahash::AHashMap;
use mcrl2rust_aterm::{ATerm, TermPool};

use crate::data;

/// Generates names that do not collide with any interned name. A counter is
/// kept per prefix so consecutive requests yield P1, P2, ...
#[derive(Default)]
pub struct FreshNameGenerator {
    counters: AHashMap<String, usize>,
}

impl FreshNameGenerator {
    pub fn new() -> FreshNameGenerator {
        FreshNameGenerator::default()
    }

    /// Returns a fresh name starting with the given prefix. The prefix
    /// itself is used when it is still free; otherwise a counter suffix is
    /// appended until the name is free.
    pub fn fresh_name(&mut self, tp: &mut TermPool, prefix: &str) -> String {
        if !tp.symbol_exists(prefix) {
            // Claim the name so it cannot be handed out again.
            tp.create_symbol_quoted(prefix, 0);
            return prefix.to_string();
        }

        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        loop {
            let candidate = format!("{}{}", prefix, counter);
            *counter += 1;
            if !tp.symbol_exists(&candidate) {
                tp.create_symbol_quoted(&candidate, 0);
                return candidate;
            }
        }
    }

    /// Returns a fresh variable with the given prefix and sort.
    pub fn fresh_variable(&mut self, tp: &mut TermPool, prefix: &str, sort: &ATerm) -> ATerm {
        let name = self.fresh_name(tp, prefix);
        data::variable(tp, &name, sort)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::sort;

    #[test]
    fn test_fresh_names_avoid_interned_strings() {
        let mut tp = TermPool::new();
        let mut generator = FreshNameGenerator::new();

        // An unused prefix is returned as is.
        let name = generator.fresh_name(&mut tp, "Q");
        assert_eq!(name, "Q");

        // Occupy P and P0 by interning them.
        tp.create_symbol("P", 0);
        tp.create_symbol("P0", 0);

        let name = generator.fresh_name(&mut tp, "P");
        assert_eq!(name, "P1");

        // Generated names are claimed, so they are not handed out twice.
        let nat = sort::nat_sort(&mut tp);
        let variable = generator.fresh_variable(&mut tp, "P", &nat);
        assert_eq!(data::name(&variable), "P2");
    }
}
