//! Linear process equations: summands, assignment lists and the resulting
//! linear process specification nodes.

use mcrl2rust_aterm::{ATerm, ATermList, TermPool};

use crate::data;

/// A summand: sum variables, condition, multi-action or delta, time stamp or
/// nil, and the assignments to the next state. A terminated summand, i.e. one
/// after which the process ends, has nil instead of an assignment list.
pub fn summand(
    tp: &mut TermPool,
    variables: &ATerm,
    condition: &ATerm,
    multi_action: &ATerm,
    time: &ATerm,
    next_state: &ATerm,
) -> ATerm {
    debug_assert!(variables.is_list(), "The sum variables form a list");
    let symbol = tp.create_symbol("LPESummand", 5);
    tp.create(
        &symbol,
        &[
            variables.clone(),
            condition.clone(),
            multi_action.clone(),
            time.clone(),
            next_state.clone(),
        ],
    )
}

pub fn is_summand(t: &ATerm) -> bool {
    t.head_symbol().name() == "LPESummand" && t.head_symbol().arity() == 5
}

pub fn summand_variables(summand: &ATerm) -> ATermList<ATerm> {
    debug_assert!(is_summand(summand), "Expected a summand, found {summand}");
    summand.arg(0).clone().into()
}

pub fn summand_condition(summand: &ATerm) -> ATerm {
    debug_assert!(is_summand(summand), "Expected a summand, found {summand}");
    summand.arg(1).clone()
}

pub fn summand_multi_action(summand: &ATerm) -> ATerm {
    debug_assert!(is_summand(summand), "Expected a summand, found {summand}");
    summand.arg(2).clone()
}

pub fn summand_time(summand: &ATerm) -> ATerm {
    debug_assert!(is_summand(summand), "Expected a summand, found {summand}");
    summand.arg(3).clone()
}

pub fn summand_next_state(summand: &ATerm) -> ATerm {
    debug_assert!(is_summand(summand), "Expected a summand, found {summand}");
    summand.arg(4).clone()
}

/// Returns true iff the process ends after this summand.
pub fn is_terminated_summand(summand: &ATerm) -> bool {
    data::is_nil(&summand_next_state(summand))
}

/// The assignment of an expression to a parameter.
pub fn assignment(tp: &mut TermPool, parameter: &ATerm, expression: &ATerm) -> ATerm {
    debug_assert!(
        data::is_variable(parameter),
        "Can only assign to a parameter, found {parameter}"
    );
    let symbol = tp.create_symbol("Assignment", 2);
    tp.create(&symbol, &[parameter.clone(), expression.clone()])
}

pub fn is_assignment(t: &ATerm) -> bool {
    t.head_symbol().name() == "Assignment" && t.head_symbol().arity() == 2
}

pub fn assignment_parameter(assignment: &ATerm) -> ATerm {
    debug_assert!(is_assignment(assignment), "Expected an assignment");
    assignment.arg(0).clone()
}

pub fn assignment_expression(assignment: &ATerm) -> ATerm {
    debug_assert!(is_assignment(assignment), "Expected an assignment");
    assignment.arg(1).clone()
}

/// The linear process equation: free variables, parameters and summands.
pub fn lpe(tp: &mut TermPool, free_variables: &ATerm, parameters: &ATerm, summands: &ATerm) -> ATerm {
    let symbol = tp.create_symbol("LPE", 3);
    tp.create(
        &symbol,
        &[free_variables.clone(), parameters.clone(), summands.clone()],
    )
}

pub fn is_lpe(t: &ATerm) -> bool {
    t.head_symbol().name() == "LPE" && t.head_symbol().arity() == 3
}

/// The initial state: free variables and the initial assignment list.
pub fn lpe_init(tp: &mut TermPool, free_variables: &ATerm, assignments: &ATerm) -> ATerm {
    let symbol = tp.create_symbol("LPEInit", 2);
    tp.create(&symbol, &[free_variables.clone(), assignments.clone()])
}

pub fn is_lpe_init(t: &ATerm) -> bool {
    t.head_symbol().name() == "LPEInit" && t.head_symbol().arity() == 2
}

/// Replaces a positional argument list by an assignment list; arguments equal
/// to the parameter they assign are omitted. A nil argument list, i.e. a
/// terminated summand, stays nil.
pub fn replace_arguments_by_assignments(
    tp: &mut TermPool,
    arguments: &ATerm,
    parameters: &[ATerm],
) -> ATerm {
    if data::is_nil(arguments) {
        return arguments.clone();
    }

    let argument_terms: Vec<ATerm> = ATermList::<ATerm>::from(arguments.clone()).iter().collect();
    debug_assert_eq!(
        argument_terms.len(),
        parameters.len(),
        "Argument list does not match the parameter list"
    );

    let mut assignments = Vec::new();
    for (parameter, argument) in parameters.iter().zip(&argument_terms) {
        if parameter != argument {
            assignments.push(assignment(tp, parameter, argument));
        }
    }

    tp.list(&assignments)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::{process, sort};
    use mcrl2rust_aterm::TermPool;

    #[test]
    fn test_summand_accessors() {
        let mut tp = TermPool::new();

        let nat = sort::nat_sort(&mut tp);
        let x = data::variable(&mut tp, "x", &nat);
        let variables = tp.list(&[x.clone()]);
        let condition = data::true_term(&mut tp);
        let a_id = process::act_id(&mut tp, "a", &[nat.clone()]);
        let a = process::action(&mut tp, &a_id, &[x.clone()]);
        let multi_action = process::multi_action(&mut tp, &[a]);
        let time = data::nil(&mut tp);
        let next_state = tp.list(&[]);

        let s = summand(&mut tp, &variables, &condition, &multi_action, &time, &next_state);
        assert!(is_summand(&s));
        assert_eq!(summand_condition(&s), condition);
        assert_eq!(summand_multi_action(&s), multi_action);
        assert_eq!(summand_variables(&s).len(), 1);
        assert!(!is_terminated_summand(&s));
    }

    #[test]
    fn test_replace_arguments_by_assignments() {
        let mut tp = TermPool::new();

        let nat = sort::nat_sort(&mut tp);
        let x = data::variable(&mut tp, "x", &nat);
        let y = data::variable(&mut tp, "y", &nat);
        let zero = data::op_id(&mut tp, "0", &nat);

        // x := x is dropped, y := 0 is kept.
        let arguments = tp.list(&[x.clone(), zero.clone()]);
        let assignments = replace_arguments_by_assignments(
            &mut tp,
            &arguments,
            &[x.clone(), y.clone()],
        );

        let list: Vec<ATerm> = ATermList::<ATerm>::from(assignments).iter().collect();
        assert_eq!(list.len(), 1);
        assert_eq!(assignment_parameter(&list[0]), y);
        assert_eq!(assignment_expression(&list[0]), zero);
    }
}
