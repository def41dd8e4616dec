//! A small Peano arithmetic rewrite system shared by the strategy tests.

use mcrl2rust_aterm::{ATerm, TermPool};
use mcrl2rust_mcrl2::{data, sort};

use crate::{RewriteRule, RewriteSpecification};

pub struct PeanoTerms {
    pub x: ATerm,
    pub one_plus_one: ATerm,
    pub two: ATerm,
    /// check(s(s(zero))), which reduces to true through a conditional rule.
    pub even_two: ATerm,
    pub zero_plus_x: ATerm,
}

pub fn peano_specification(tp: &mut TermPool) -> (RewriteSpecification, PeanoTerms) {
    let peano = sort::sort_id(tp, "Peano");
    let bool_sort = sort::bool_sort(tp);

    let zero = data::op_id(tp, "zero", &peano);
    let s_sort = sort::sort_arrow(tp, &[peano.clone()], &peano);
    let s = data::op_id(tp, "s", &s_sort);
    let plus_sort = sort::sort_arrow(tp, &[peano.clone(), peano.clone()], &peano);
    let plus = data::op_id(tp, "plus", &plus_sort);
    let not_sort = sort::sort_arrow(tp, &[bool_sort.clone()], &bool_sort);
    let not = data::op_id(tp, "not", &not_sort);
    let pred_sort = sort::sort_arrow(tp, &[peano.clone()], &bool_sort);
    let even = data::op_id(tp, "even", &pred_sort);
    let check = data::op_id(tp, "check", &pred_sort);

    let x = data::variable(tp, "x", &peano);
    let y = data::variable(tp, "y", &peano);

    let nil = data::nil(tp);
    let true_term = data::true_term(tp);
    let false_term = data::false_term(tp);

    let mut specification = RewriteSpecification::new();

    // plus(zero, y) = y
    let lhs = data::apply(tp, &plus, &[zero.clone(), y.clone()]);
    specification.add_rule(RewriteRule {
        variables: vec![y.clone()],
        condition: nil.clone(),
        lhs,
        rhs: y.clone(),
    });

    // plus(s(x), y) = s(plus(x, y))
    let s_x = data::apply(tp, &s, &[x.clone()]);
    let lhs = data::apply(tp, &plus, &[s_x.clone(), y.clone()]);
    let plus_x_y = data::apply(tp, &plus, &[x.clone(), y.clone()]);
    let rhs = data::apply(tp, &s, &[plus_x_y]);
    specification.add_rule(RewriteRule {
        variables: vec![x.clone(), y.clone()],
        condition: nil.clone(),
        lhs,
        rhs,
    });

    // not(true) = false, not(false) = true
    let lhs = data::apply(tp, &not, &[true_term.clone()]);
    specification.add_rule(RewriteRule {
        variables: vec![],
        condition: nil.clone(),
        lhs,
        rhs: false_term.clone(),
    });
    let lhs = data::apply(tp, &not, &[false_term.clone()]);
    specification.add_rule(RewriteRule {
        variables: vec![],
        condition: nil.clone(),
        lhs,
        rhs: true_term.clone(),
    });

    // even(zero) = true, even(s(x)) = not(even(x))
    let lhs = data::apply(tp, &even, &[zero.clone()]);
    specification.add_rule(RewriteRule {
        variables: vec![],
        condition: nil.clone(),
        lhs,
        rhs: true_term.clone(),
    });
    let lhs = data::apply(tp, &even, &[s_x.clone()]);
    let even_x = data::apply(tp, &even, &[x.clone()]);
    let rhs = data::apply(tp, &not, &[even_x.clone()]);
    specification.add_rule(RewriteRule {
        variables: vec![x.clone()],
        condition: nil.clone(),
        lhs,
        rhs,
    });

    // check(x) = true if even(x)
    let lhs = data::apply(tp, &check, &[x.clone()]);
    specification.add_rule(RewriteRule {
        variables: vec![x.clone()],
        condition: even_x,
        lhs,
        rhs: true_term.clone(),
    });

    let one = data::apply(tp, &s, &[zero.clone()]);
    let two = data::apply(tp, &s, &[one.clone()]);
    let one_plus_one = data::apply(tp, &plus, &[one.clone(), one.clone()]);
    let even_two = data::apply(tp, &check, &[two.clone()]);
    let zero_plus_x = data::apply(tp, &plus, &[zero.clone(), x.clone()]);

    (
        specification,
        PeanoTerms {
            x,
            one_plus_one,
            two,
            even_two,
            zero_plus_x,
        },
    )
}
