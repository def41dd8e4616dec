use rand::rngs::ThreadRng;
use rand::Rng;

use crate::{ATerm, TermPool};

/// Generates a random term over the given function symbols and constants with
/// the given maximal depth. Used to exercise the term pool in tests.
pub fn random_term(
    tp: &mut TermPool,
    rng: &mut ThreadRng,
    symbols: &[(String, usize)],
    constants: &[String],
    depth: usize,
) -> ATerm {
    debug_assert!(!constants.is_empty(), "Need constants to terminate the term");

    if depth == 0 || symbols.is_empty() || rng.random_bool(0.25) {
        let name = &constants[rng.random_range(0..constants.len())];
        let symbol = tp.create_symbol(name, 0);
        return tp.create(&symbol, &[]);
    }

    let (name, arity) = &symbols[rng.random_range(0..symbols.len())];
    let arguments: Vec<ATerm> = (0..*arity)
        .map(|_| random_term(tp, rng, symbols, constants, depth - 1))
        .collect();

    let symbol = tp.create_symbol(name, *arity);
    tp.create(&symbol, &arguments)
}
