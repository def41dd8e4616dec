//! Sort expressions: sort identifiers and arrow sorts. An arrow sort carries
//! its domain as a list of sorts and its codomain as a single sort.

use mcrl2rust_aterm::{ATerm, ATermList, TermPool};

pub fn sort_id(tp: &mut TermPool, name: &str) -> ATerm {
    let name_term = {
        let symbol = tp.create_symbol_quoted(name, 0);
        tp.create(&symbol, &[])
    };
    let symbol = tp.create_symbol("SortId", 1);
    tp.create(&symbol, &[name_term])
}

pub fn sort_arrow(tp: &mut TermPool, domain: &[ATerm], codomain: &ATerm) -> ATerm {
    debug_assert!(!domain.is_empty(), "An arrow sort has a non-empty domain");
    let domain_list = tp.list(domain);
    let symbol = tp.create_symbol("SortArrow", 2);
    tp.create(&symbol, &[domain_list, codomain.clone()])
}

pub fn is_sort_id(t: &ATerm) -> bool {
    t.head_symbol().name() == "SortId" && t.head_symbol().arity() == 1
}

pub fn is_sort_arrow(t: &ATerm) -> bool {
    t.head_symbol().name() == "SortArrow" && t.head_symbol().arity() == 2
}

pub fn is_sort_expression(t: &ATerm) -> bool {
    is_sort_id(t) || is_sort_arrow(t)
}

/// The name of a sort identifier.
pub fn sort_name(t: &ATerm) -> &str {
    debug_assert!(is_sort_id(t), "Expected a sort identifier, found {t}");
    t.arg(0).head_symbol().name()
}

/// The domain sorts of an arrow sort.
pub fn domain(t: &ATerm) -> ATermList<ATerm> {
    debug_assert!(is_sort_arrow(t), "Expected an arrow sort, found {t}");
    t.arg(0).clone().into()
}

/// The codomain of an arrow sort.
pub fn codomain(t: &ATerm) -> ATerm {
    debug_assert!(is_sort_arrow(t), "Expected an arrow sort, found {t}");
    t.arg(1).clone()
}

/// The result sort after applying a function of the given sort to all of its
/// arguments, i.e. the rightmost sort of an arrow chain.
pub fn target_sort(t: &ATerm) -> ATerm {
    let mut current = t.clone();
    while is_sort_arrow(&current) {
        current = codomain(&current);
    }
    current
}

/// The builtin sorts.
pub fn bool_sort(tp: &mut TermPool) -> ATerm {
    sort_id(tp, "Bool")
}

pub fn pos_sort(tp: &mut TermPool) -> ATerm {
    sort_id(tp, "Pos")
}

pub fn nat_sort(tp: &mut TermPool) -> ATerm {
    sort_id(tp, "Nat")
}

pub fn int_sort(tp: &mut TermPool) -> ATerm {
    sort_id(tp, "Int")
}

pub fn real_sort(tp: &mut TermPool) -> ATerm {
    sort_id(tp, "Real")
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_sort_constructors() {
        let mut tp = TermPool::new();

        let nat = sort_id(&mut tp, "Nat");
        assert!(is_sort_id(&nat));
        assert_eq!(sort_name(&nat), "Nat");

        let bool_ = bool_sort(&mut tp);
        let arrow = sort_arrow(&mut tp, &[nat.clone(), nat.clone()], &bool_);
        assert!(is_sort_arrow(&arrow));
        assert_eq!(codomain(&arrow), bool_);
        assert_eq!(domain(&arrow).len(), 2);
        assert_eq!(target_sort(&arrow), bool_);

        // Nested arrows resolve to the rightmost codomain.
        let nested = sort_arrow(&mut tp, &[bool_.clone()], &arrow);
        assert_eq!(target_sort(&nested), bool_);
    }
}
