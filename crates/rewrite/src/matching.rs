//! First-order matching of rule left hand sides against subject terms.
//! Variables only occur in the pattern; non-linear patterns require the
//! repeated variable to match identical subterms.

use mcrl2rust_aterm::ATerm;
use mcrl2rust_mcrl2::data;
use rustc_hash::FxHashMap;

pub type Bindings = FxHashMap<ATerm, ATerm>;

/// Matches the pattern against the subject, extending the bindings. The
/// subject is expected to be in normal form. Both terms are in the same
/// internal representation, which agrees on variables and operator
/// identifiers; applications are compared child by child.
pub fn match_term(pattern: &ATerm, subject: &ATerm, bindings: &mut Bindings) -> bool {
    if pattern == subject && !data::is_variable(pattern) {
        // Ground patterns share their representation with equal subjects.
        return true;
    }

    if data::is_variable(pattern) {
        return match bindings.get(pattern) {
            Some(bound) => bound == subject,
            None => {
                bindings.insert(pattern.clone(), subject.clone());
                true
            }
        };
    }

    if pattern.head_symbol() != subject.head_symbol() {
        return false;
    }

    pattern
        .arguments()
        .iter()
        .zip(subject.arguments())
        .all(|(p, s)| match_term(p, s, bindings))
}

/// Replaces the bound variables in a term by their bindings. Works on both
/// internal representations, since it rebuilds arbitrary nodes child by
/// child.
pub fn instantiate(tp: &mut mcrl2rust_aterm::TermPool, bindings: &Bindings, t: &ATerm) -> ATerm {
    if data::is_variable(t) {
        return bindings.get(t).cloned().unwrap_or_else(|| t.clone());
    }

    if t.arguments().is_empty() {
        return t.clone();
    }

    let arguments: Vec<ATerm> = t
        .arguments()
        .iter()
        .map(|argument| instantiate(tp, bindings, argument))
        .collect();

    if arguments == t.arguments() {
        return t.clone();
    }

    let symbol = t.head_symbol().clone();
    tp.create(&symbol, &arguments)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use mcrl2rust_aterm::TermPool;
    use mcrl2rust_mcrl2::sort;

    #[test]
    fn test_match_binds_variables() {
        let mut tp = TermPool::new();

        let nat = sort::nat_sort(&mut tp);
        let x = data::variable(&mut tp, "x", &nat);
        let f_sort = sort::sort_arrow(&mut tp, &[nat.clone()], &nat);
        let f = data::op_id(&mut tp, "f", &f_sort);
        let zero = data::op_id(&mut tp, "0", &nat);

        let pattern = data::apply(&mut tp, &f, &[x.clone()]);
        let subject = data::apply(&mut tp, &f, &[zero.clone()]);

        let mut bindings = Bindings::default();
        assert!(match_term(&pattern, &subject, &mut bindings));
        assert_eq!(bindings.get(&x), Some(&zero));
    }

    #[test]
    fn test_match_nonlinear() {
        let mut tp = TermPool::new();

        let nat = sort::nat_sort(&mut tp);
        let x = data::variable(&mut tp, "x", &nat);
        let g_sort = sort::sort_arrow(&mut tp, &[nat.clone(), nat.clone()], &nat);
        let g = data::op_id(&mut tp, "g", &g_sort);
        let zero = data::op_id(&mut tp, "0", &nat);
        let one = data::op_id(&mut tp, "1", &nat);

        let pattern = data::apply(&mut tp, &g, &[x.clone(), x.clone()]);

        let equal_subject = data::apply(&mut tp, &g, &[zero.clone(), zero.clone()]);
        let mut bindings = Bindings::default();
        assert!(match_term(&pattern, &equal_subject, &mut bindings));

        let unequal_subject = data::apply(&mut tp, &g, &[zero, one]);
        let mut bindings = Bindings::default();
        assert!(!match_term(&pattern, &unequal_subject, &mut bindings));
    }
}
