//! Variable-capture-avoiding substitution and the occurrence checks it
//! relies on. Substitutions are lists of (variable, replacement) pairs and
//! never mutate their input; when nothing is replaced the original term
//! handle is returned unchanged.
//!
//! Occurrence checks compare variables by name, not by the full variable
//! term: two variables with the same name but different sorts still clash,
//! and alpha conversion resolves such clashes by renaming.

use mcrl2rust_aterm::{ATerm, ATermList, TermPool};

use crate::fresh::FreshNameGenerator;
use crate::{data, lps, process};

/// A list of (variable, replacement) pairs applied in parallel.
pub type Substitution = [(ATerm, ATerm)];

fn lookup(substitution: &Substitution, variable: &ATerm) -> Option<ATerm> {
    substitution
        .iter()
        .find(|(var, _)| var == variable)
        .map(|(_, term)| term.clone())
}

/// Applies the substitution to a data expression, distributing under
/// applications, binders and where clauses. Bound variables shadow the
/// substitution; the replacements must not mention the bound names, which
/// holds throughout the lineariser since binders only occur in user data
/// expressions that are substituted with fresh or outer variables.
pub fn substitute_data(tp: &mut TermPool, substitution: &Substitution, t: &ATerm) -> ATerm {
    if substitution.is_empty() {
        return t.clone();
    }

    if data::is_variable(t) {
        return lookup(substitution, t).unwrap_or_else(|| t.clone());
    }

    if data::is_application(t) {
        let head = substitute_data(tp, substitution, &t.arg(0).clone());
        let arguments = substitute_data_list(tp, substitution, &t.arg(1).clone());
        if head == *t.arg(0) && arguments == *t.arg(1) {
            return t.clone();
        }
        let symbol = t.head_symbol().clone();
        return tp.create(&symbol, &[head, arguments]);
    }

    if data::is_binder(t) {
        let bound: Vec<ATerm> = ATermList::<ATerm>::from(t.arg(0).clone()).iter().collect();
        let remaining = shadow(substitution, &bound);

        let body = substitute_data(tp, &remaining, &t.arg(1).clone());
        if body == *t.arg(1) {
            return t.clone();
        }
        let symbol = t.head_symbol().clone();
        let variables = t.arg(0).clone();
        return tp.create(&symbol, &[variables, body]);
    }

    if data::is_where_clause(t) {
        // The definitions are evaluated outside of the clause, the defined
        // variables shadow inside the body.
        let definitions: Vec<ATerm> = ATermList::<ATerm>::from(t.arg(1).clone())
            .iter()
            .map(|definition| {
                let variable = definition.arg(0).clone();
                let expression = substitute_data(tp, substitution, &definition.arg(1).clone());
                let symbol = definition.head_symbol().clone();
                tp.create(&symbol, &[variable, expression])
            })
            .collect();

        let bound: Vec<ATerm> = definitions.iter().map(|d| d.arg(0).clone()).collect();
        let remaining = shadow(substitution, &bound);
        let body = substitute_data(tp, &remaining, &t.arg(0).clone());

        let definition_list = tp.list(&definitions);
        let symbol = t.head_symbol().clone();
        return tp.create(&symbol, &[body, definition_list]);
    }

    debug_assert!(
        data::is_op_id(t),
        "Expected a data expression in substitute_data, found {t}"
    );
    t.clone()
}

/// The substitution without the pairs whose variable is bound here. The
/// replacements of the remaining pairs must not capture a bound name.
fn shadow(substitution: &Substitution, bound: &[ATerm]) -> Vec<(ATerm, ATerm)> {
    let remaining: Vec<(ATerm, ATerm)> = substitution
        .iter()
        .filter(|(variable, _)| !bound.contains(variable))
        .cloned()
        .collect();

    debug_assert!(
        remaining
            .iter()
            .all(|(_, term)| bound.iter().all(|b| !occurs_in_term(b, term))),
        "a replacement term would be captured by a binder"
    );
    remaining
}

/// Applies the substitution to every element of a list of data expressions.
pub fn substitute_data_list(tp: &mut TermPool, substitution: &Substitution, list: &ATerm) -> ATerm {
    if substitution.is_empty() {
        return list.clone();
    }

    let elements: Vec<ATerm> = ATermList::<ATerm>::from(list.clone()).iter().collect();
    let substituted: Vec<ATerm> = elements
        .iter()
        .map(|element| substitute_data(tp, substitution, element))
        .collect();

    if substituted == elements {
        return list.clone();
    }
    tp.list(&substituted)
}

/// Applies the substitution to the arguments of every action of a
/// multi-action; delta is returned unchanged.
pub fn substitute_multi_action(tp: &mut TermPool, substitution: &Substitution, ma: &ATerm) -> ATerm {
    if process::is_delta(ma) {
        return ma.clone();
    }

    debug_assert!(process::is_multi_action(ma), "Expected a multi-action, found {ma}");
    let actions: Vec<ATerm> = process::multi_action_list(ma)
        .iter()
        .map(|action| {
            let label = action.arg(0).clone();
            let arguments = substitute_data_list(tp, substitution, &action.arg(1).clone());
            let symbol = action.head_symbol().clone();
            tp.create(&symbol, &[label, arguments])
        })
        .collect();
    process::multi_action(tp, &actions)
}

/// Applies the substitution to a time stamp; nil is returned unchanged.
pub fn substitute_time(tp: &mut TermPool, substitution: &Substitution, time: &ATerm) -> ATerm {
    if data::is_nil(time) {
        return time.clone();
    }
    substitute_data(tp, substitution, time)
}

/// Applies the substitution to an assignment list. The assignments occur in
/// parameter order; `parameters` is the full parameter list. Substitution can
/// apply to the left hand sides (parameter renaming) or right hand sides or
/// both. Assignments whose sides become equal are dropped, and an assignment
/// is introduced for a parameter without one when substitution makes its
/// sides differ.
pub fn substitute_assignments(
    tp: &mut TermPool,
    substitution: &Substitution,
    assignments: &ATerm,
    parameters: &[ATerm],
    replace_lhs: bool,
    replace_rhs: bool,
) -> ATerm {
    if data::is_nil(assignments) {
        // The next state of a terminated summand.
        return assignments.clone();
    }

    let mut remaining: Vec<ATerm> = ATermList::<ATerm>::from(assignments.clone()).iter().collect();
    remaining.reverse();

    let mut result = Vec::new();
    for parameter in parameters {
        let mut lhs = parameter.clone();
        let mut rhs = parameter.clone();

        if let Some(assignment) = remaining.last() {
            if lps::assignment_parameter(assignment) == *parameter {
                rhs = lps::assignment_expression(assignment);
                remaining.pop();
            }
        }

        if replace_lhs {
            lhs = substitute_data(tp, substitution, &lhs);
            debug_assert!(data::is_variable(&lhs), "A parameter must rename to a variable");
        }
        if replace_rhs {
            rhs = substitute_data(tp, substitution, &rhs);
        }

        if lhs != rhs {
            result.push(lps::assignment(tp, &lhs, &rhs));
        }
    }

    debug_assert!(remaining.is_empty(), "Assignments must occur in parameter order");
    tp.list(&result)
}

/// Applies the substitution to a pCRL process body, renaming sum variables
/// whenever capture would occur.
pub fn substitute_pcrl_proc(
    tp: &mut TermPool,
    fresh: &mut FreshNameGenerator,
    substitution: &Substitution,
    p: &ATerm,
) -> ATerm {
    if substitution.is_empty() {
        return p.clone();
    }

    if process::is_choice(p) || process::is_seq(p) || process::is_sync(p) {
        let lhs = substitute_pcrl_proc(tp, fresh, substitution, &p.arg(0).clone());
        let rhs = substitute_pcrl_proc(tp, fresh, substitution, &p.arg(1).clone());
        let symbol = p.head_symbol().clone();
        return tp.create(&symbol, &[lhs, rhs]);
    }

    if process::is_cond(p) {
        let guard = substitute_data(tp, substitution, &p.arg(0).clone());
        let then = substitute_pcrl_proc(tp, fresh, substitution, &p.arg(1).clone());
        let otherwise = substitute_pcrl_proc(tp, fresh, substitution, &p.arg(2).clone());
        return process::cond(tp, &guard, &then, &otherwise);
    }

    if process::is_sum(p) {
        // Variables bound here must not capture free variables of the
        // replacement terms.
        let sum_vars: Vec<ATerm> = ATermList::<ATerm>::from(p.arg(0).clone()).iter().collect();
        let mut banned: Vec<ATerm> = Vec::new();
        for (var, term) in substitution {
            banned.push(var.clone());
            banned.push(term.clone());
        }

        let (new_vars, renaming) = alpha_convert(tp, fresh, &sum_vars, &[], &banned);
        let mut extended: Vec<(ATerm, ATerm)> = substitution.to_vec();
        extended.extend(renaming);

        let body = substitute_pcrl_proc(tp, fresh, &extended, &p.arg(1).clone());
        return process::sum(tp, &new_vars, &body);
    }

    if process::is_process(p) || process::is_action(p) {
        let head = p.arg(0).clone();
        let arguments = substitute_data_list(tp, substitution, &p.arg(1).clone());
        let symbol = p.head_symbol().clone();
        return tp.create(&symbol, &[head, arguments]);
    }

    if process::is_at_time(p) {
        let body = substitute_pcrl_proc(tp, fresh, substitution, &p.arg(0).clone());
        let time = substitute_data(tp, substitution, &p.arg(1).clone());
        return process::at_time(tp, &body, &time);
    }

    if process::is_delta(p) || process::is_tau(p) {
        return p.clone();
    }

    if process::is_multi_action(p) {
        return substitute_multi_action(tp, substitution, p);
    }

    panic!("Expected a pCRL process in substitute_pcrl_proc, found {p}");
}

/// Returns true iff a variable with the name of `variable` occurs free in
/// the data expression; the search short-circuits on binders that shadow
/// the name.
pub fn occurs_in_term(variable: &ATerm, t: &ATerm) -> bool {
    debug_assert!(data::is_variable(variable), "Expected a variable, found {variable}");

    if data::is_variable(t) {
        return t.arg(0) == variable.arg(0);
    }

    if data::is_binder(t) {
        let bound: Vec<ATerm> = ATermList::<ATerm>::from(t.arg(0).clone()).iter().collect();
        if bound.iter().any(|b| b.arg(0) == variable.arg(0)) {
            return false;
        }
        return occurs_in_term(variable, &t.arg(1).clone());
    }

    if data::is_where_clause(t) {
        let definitions: Vec<ATerm> = ATermList::<ATerm>::from(t.arg(1).clone()).iter().collect();
        if definitions
            .iter()
            .any(|d| occurs_in_term(variable, &d.arg(1).clone()))
        {
            return true;
        }
        if definitions.iter().any(|d| d.arg(0).arg(0) == variable.arg(0)) {
            return false;
        }
        return occurs_in_term(variable, &t.arg(0).clone());
    }

    t.arguments()
        .iter()
        .any(|argument| occurs_in_term(variable, argument))
}

/// Returns true iff the variable occurs in any of the given terms.
pub fn occurs_in_terms<'a>(variable: &ATerm, terms: impl IntoIterator<Item = &'a ATerm>) -> bool {
    terms.into_iter().any(|t| occurs_in_term(variable, t))
}

/// Returns true iff the variable occurs in a term of the given list term.
pub fn occurs_in_term_list(variable: &ATerm, list: &ATerm) -> bool {
    ATermList::<ATerm>::from(list.clone())
        .iter()
        .any(|t| occurs_in_term(variable, &t))
}

/// Returns true iff the variable occurs in an argument of the multi-action.
pub fn occurs_in_multi_action(variable: &ATerm, ma: &ATerm) -> bool {
    if process::is_delta(ma) {
        return false;
    }
    process::multi_action_list(ma)
        .iter()
        .any(|action| occurs_in_term_list(variable, &action.arg(1).clone()))
}

/// Returns true iff the variable occurs in a right hand side of the
/// assignments or in the parameter list.
pub fn occurs_in_assignments(variable: &ATerm, assignments: &ATerm, parameters: &[ATerm]) -> bool {
    if occurs_in_terms(variable, parameters) {
        return true;
    }

    if data::is_nil(assignments) {
        return false;
    }

    ATermList::<ATerm>::from(assignments.clone())
        .iter()
        .any(|assignment| occurs_in_term(variable, &lps::assignment_expression(&assignment)))
}

/// Returns true iff the variable occurs in the pCRL process body. When
/// `strict` holds a variable bound by a sum counts as an occurrence;
/// otherwise sums shadow the variable.
pub fn occurs_in_pcrl_term(variable: &ATerm, p: &ATerm, strict: bool) -> bool {
    if process::is_choice(p) || process::is_seq(p) || process::is_sync(p) {
        return occurs_in_pcrl_term(variable, &p.arg(0).clone(), strict)
            || occurs_in_pcrl_term(variable, &p.arg(1).clone(), strict);
    }

    if process::is_cond(p) {
        return occurs_in_term(variable, &p.arg(0).clone())
            || occurs_in_pcrl_term(variable, &p.arg(1).clone(), strict)
            || occurs_in_pcrl_term(variable, &p.arg(2).clone(), strict);
    }

    if process::is_sum(p) {
        if strict {
            return occurs_in_term_list(variable, &p.arg(0).clone())
                || occurs_in_pcrl_term(variable, &p.arg(1).clone(), strict);
        }
        return !occurs_in_term_list(variable, &p.arg(0).clone())
            && occurs_in_pcrl_term(variable, &p.arg(1).clone(), strict);
    }

    if process::is_process(p) || process::is_action(p) {
        return occurs_in_term_list(variable, &p.arg(1).clone());
    }

    if process::is_multi_action(p) {
        return occurs_in_multi_action(variable, p);
    }

    if process::is_at_time(p) {
        return occurs_in_term(variable, &p.arg(1).clone())
            || occurs_in_pcrl_term(variable, &p.arg(0).clone(), strict);
    }

    if process::is_delta(p) || process::is_tau(p) {
        return false;
    }

    panic!("Expected a pCRL process in occurs_in_pcrl_term, found {p}");
}

/// Replaces every variable of `variables` that occurs in the banned
/// variables or terms by a fresh one. Returns the new variable list and the
/// renaming pairs for the replaced variables.
pub fn alpha_convert(
    tp: &mut TermPool,
    fresh: &mut FreshNameGenerator,
    variables: &[ATerm],
    banned_variables: &[ATerm],
    banned_terms: &[ATerm],
) -> (Vec<ATerm>, Vec<(ATerm, ATerm)>) {
    let mut new_variables = Vec::with_capacity(variables.len());
    let mut renaming = Vec::new();

    for variable in variables {
        if occurs_in_terms(variable, banned_variables) || occurs_in_terms(variable, banned_terms) {
            let sort = variable.arg(1).clone();
            let new_variable = fresh.fresh_variable(tp, data::name(variable), &sort);
            renaming.push((variable.clone(), new_variable.clone()));
            new_variables.push(new_variable);
        } else {
            new_variables.push(variable.clone());
        }
    }

    (new_variables, renaming)
}

/// Like [alpha_convert], except that the banned occurrences are the free
/// variables of a process body.
pub fn alpha_convert_process(
    tp: &mut TermPool,
    fresh: &mut FreshNameGenerator,
    variables: &[ATerm],
    body: &ATerm,
) -> (Vec<ATerm>, Vec<(ATerm, ATerm)>) {
    let mut new_variables = Vec::with_capacity(variables.len());
    let mut renaming = Vec::new();

    for variable in variables {
        if occurs_in_pcrl_term(variable, body, true) {
            let sort = variable.arg(1).clone();
            let new_variable = fresh.fresh_variable(tp, data::name(variable), &sort);
            renaming.push((variable.clone(), new_variable.clone()));
            new_variables.push(new_variable);
        } else {
            new_variables.push(variable.clone());
        }
    }

    (new_variables, renaming)
}

/// Renames the variables of `variables` that clash with a name in `taken`.
/// Returns the full renamed variable list and the renaming pairs. Used to
/// make the parameters of parallel components disjoint.
pub fn construct_renaming(
    tp: &mut TermPool,
    fresh: &mut FreshNameGenerator,
    taken: &[ATerm],
    variables: &[ATerm],
) -> (Vec<ATerm>, Vec<(ATerm, ATerm)>) {
    let mut renamed = Vec::with_capacity(variables.len());
    let mut renaming = Vec::new();

    for variable in variables {
        if occurs_in_terms(variable, taken) {
            let sort = variable.arg(1).clone();
            let new_variable = fresh.fresh_variable(tp, data::name(variable), &sort);
            renaming.push((variable.clone(), new_variable.clone()));
            renamed.push(new_variable);
        } else {
            renamed.push(variable.clone());
        }
    }

    (renamed, renaming)
}

/// Returns the renaming that maps the first variable list onto the second,
/// or None when the lists differ in length or sorts. Variables that are
/// already equal yield no pair.
pub fn variables_equal(first: &[ATerm], second: &[ATerm]) -> Option<Vec<(ATerm, ATerm)>> {
    if first.len() != second.len() {
        return None;
    }

    let mut renaming = Vec::new();
    for (var1, var2) in first.iter().zip(second) {
        if var1.arg(1) != var2.arg(1) {
            // Different sorts cannot be identified by renaming.
            return None;
        }
        if var1 != var2 {
            renaming.push((var1.clone(), var2.clone()));
        }
    }
    Some(renaming)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::sort;

    fn setup(tp: &mut TermPool) -> (ATerm, ATerm, ATerm) {
        let nat = sort::nat_sort(tp);
        let x = data::variable(tp, "x", &nat);
        let y = data::variable(tp, "y", &nat);
        (nat, x, y)
    }

    #[test]
    fn test_substitute_data() {
        let mut tp = TermPool::new();
        let (nat, x, y) = setup(&mut tp);

        let bool_sort = sort::bool_sort(&mut tp);
        let f_sort = sort::sort_arrow(&mut tp, &[nat.clone()], &bool_sort);
        let f = data::op_id(&mut tp, "f", &f_sort);
        let fx = data::apply(&mut tp, &f, &[x.clone()]);

        let result = substitute_data(&mut tp, &[(x.clone(), y.clone())], &fx);
        let expected = data::apply(&mut tp, &f, &[y.clone()]);
        assert_eq!(result, expected);

        // The empty substitution returns the original handle.
        let unchanged = substitute_data(&mut tp, &[], &fx);
        assert_eq!(unchanged, fx);

        // A substitution that does not trigger preserves sharing.
        let untouched = substitute_data(&mut tp, &[(y, x)], &fx);
        assert_eq!(untouched, fx);
    }

    #[test]
    fn test_substitute_avoids_capture() {
        let mut tp = TermPool::new();
        let mut fresh = FreshNameGenerator::new();
        let (_, x, y) = setup(&mut tp);

        // sum y. a(x) with x := y must rename the bound y.
        let nat = sort::nat_sort(&mut tp);
        let a_id = process::act_id(&mut tp, "a", &[nat.clone()]);
        let a_x = process::action(&mut tp, &a_id, &[x.clone()]);
        let summed = process::sum(&mut tp, &[y.clone()], &a_x);

        let result = substitute_pcrl_proc(&mut tp, &mut fresh, &[(x.clone(), y.clone())], &summed);

        let sum_vars: Vec<ATerm> = ATermList::<ATerm>::from(result.arg(0).clone()).iter().collect();
        assert_eq!(sum_vars.len(), 1);
        assert_ne!(sum_vars[0], y, "The bound variable must have been renamed");

        let body = result.arg(1);
        assert!(occurs_in_pcrl_term(&y, &body.clone(), true), "y was substituted in");
    }

    #[test]
    fn test_binder_shadows_substitution() {
        let mut tp = TermPool::new();
        let (nat, x, y) = setup(&mut tp);

        // exists x. f(x) is not affected by a substitution for x, and x does
        // not occur free in it.
        let bool_sort = sort::bool_sort(&mut tp);
        let f_sort = sort::sort_arrow(&mut tp, &[nat.clone()], &bool_sort);
        let f = data::op_id(&mut tp, "f", &f_sort);
        let f_x = data::apply(&mut tp, &f, &[x.clone()]);
        let quantified = data::exists_binder(&mut tp, &[x.clone()], &f_x);

        assert!(!occurs_in_term(&x, &quantified));

        let zero = data::op_id(&mut tp, "0", &nat);
        let substituted = substitute_data(&mut tp, &[(x.clone(), zero)], &quantified);
        assert_eq!(substituted, quantified);

        // A where clause substitutes in its definitions but not in the
        // shadowed body occurrences.
        let definition = data::where_definition(&mut tp, &x, &y);
        let clause = data::where_clause(&mut tp, &f_x, &[definition]);
        assert!(occurs_in_term(&y, &clause));
        assert!(!occurs_in_term(&x, &clause));
    }

    #[test]
    fn test_occurs_checks_names() {
        let mut tp = TermPool::new();
        let (_, x, _) = setup(&mut tp);

        // A variable with the same name but a different sort still counts as
        // an occurrence.
        let bool_sort = sort::bool_sort(&mut tp);
        let x_bool = data::variable(&mut tp, "x", &bool_sort);
        assert!(occurs_in_term(&x, &x_bool));
    }

    #[test]
    fn test_alpha_convert_empty_ban_returns_input() {
        let mut tp = TermPool::new();
        let mut fresh = FreshNameGenerator::new();
        let (_, x, y) = setup(&mut tp);

        let (unchanged, renaming) = alpha_convert(&mut tp, &mut fresh, &[x.clone(), y.clone()], &[], &[]);
        assert_eq!(unchanged, vec![x, y]);
        assert!(renaming.is_empty());
    }

    #[test]
    fn test_variables_equal() {
        let mut tp = TermPool::new();
        let (nat, x, y) = setup(&mut tp);

        assert_eq!(variables_equal(&[x.clone()], &[x.clone()]), Some(vec![]));
        assert_eq!(
            variables_equal(&[x.clone()], &[y.clone()]),
            Some(vec![(x.clone(), y.clone())])
        );

        let bool_sort = sort::bool_sort(&mut tp);
        let z = data::variable(&mut tp, "z", &bool_sort);
        assert_eq!(variables_equal(&[x.clone()], &[z]), None);

        let w = data::variable(&mut tp, "w", &nat);
        assert_eq!(variables_equal(&[x], &[y, w]), None);
    }

    #[test]
    fn test_substitute_assignments() {
        let mut tp = TermPool::new();
        let (nat, x, y) = setup(&mut tp);
        let z = data::variable(&mut tp, "z", &nat);
        let zero = data::op_id(&mut tp, "0", &nat);

        // Parameters [x, y], assignment y := x. Substituting x := 0 in the
        // right hand sides yields y := 0.
        let assignment = lps::assignment(&mut tp, &y, &x);
        let assignments = tp.list(&[assignment]);

        let result = substitute_assignments(
            &mut tp,
            &[(x.clone(), zero.clone())],
            &assignments,
            &[x.clone(), y.clone()],
            false,
            true,
        );

        let list: Vec<ATerm> = ATermList::<ATerm>::from(result).iter().collect();
        assert_eq!(list.len(), 1);
        assert_eq!(lps::assignment_parameter(&list[0]), y);
        assert_eq!(lps::assignment_expression(&list[0]), zero);

        // Renaming the parameter x to z introduces the assignment z := x,
        // since the old value is still referred to by its old name.
        let empty = tp.list(&[]);
        let renamed = substitute_assignments(
            &mut tp,
            &[(x.clone(), z.clone())],
            &empty,
            &[x.clone(), y.clone()],
            true,
            false,
        );
        let list: Vec<ATerm> = ATermList::<ATerm>::from(renamed).iter().collect();
        assert_eq!(list.len(), 1);
        assert_eq!(lps::assignment_parameter(&list[0]), z);
        assert_eq!(lps::assignment_expression(&list[0]), x);
    }
}
