//! Actions, multi-actions and process expressions.
//!
//! A multi-action keeps its actions sorted on the action label, so two
//! multi-actions with the same actions share their representation and can be
//! compared with a pointer comparison.

use std::cmp::Ordering;

use mcrl2rust_aterm::{ATerm, ATermList, TermPool};

fn name_term(tp: &mut TermPool, name: &str) -> ATerm {
    let symbol = tp.create_symbol_quoted(name, 0);
    tp.create(&symbol, &[])
}

/// An action label: a name with the sorts of its arguments.
pub fn act_id(tp: &mut TermPool, name: &str, sorts: &[ATerm]) -> ATerm {
    let name_term = name_term(tp, name);
    let sort_list = tp.list(sorts);
    let symbol = tp.create_symbol("ActId", 2);
    tp.create(&symbol, &[name_term, sort_list])
}

/// An action: a label with argument expressions.
pub fn action(tp: &mut TermPool, act_id: &ATerm, arguments: &[ATerm]) -> ATerm {
    debug_assert!(is_act_id(act_id), "Expected an action label, found {act_id}");
    let argument_list = tp.list(arguments);
    let symbol = tp.create_symbol("Action", 2);
    tp.create(&symbol, &[act_id.clone(), argument_list])
}

/// A multi-action over a list of action terms; the list is sorted on the
/// canonical action ordering.
pub fn multi_action(tp: &mut TermPool, actions: &[ATerm]) -> ATerm {
    let mut sorted = actions.to_vec();
    sorted.sort_by(action_compare);

    let action_list = tp.list(&sorted);
    let symbol = tp.create_symbol("MultAct", 1);
    tp.create(&symbol, &[action_list])
}

/// The canonical ordering on actions: by label name, then by the label's
/// argument sorts. Interned names make this reproducible across runs.
pub fn action_compare(a1: &ATerm, a2: &ATerm) -> Ordering {
    let id1 = a1.arg(0);
    let id2 = a2.arg(0);

    action_name(a1)
        .cmp(action_name(a2))
        .then_with(|| format!("{}", id1.arg(1)).cmp(&format!("{}", id2.arg(1))))
}

/// The name of the label of an action.
pub fn action_name(action: &ATerm) -> &str {
    debug_assert!(is_action(action), "Expected an action, found {action}");
    action.arg(0).arg(0).head_symbol().name()
}

/// The argument expressions of an action.
pub fn action_arguments(action: &ATerm) -> ATermList<ATerm> {
    debug_assert!(is_action(action), "Expected an action, found {action}");
    action.arg(1).clone().into()
}

/// The actions of a multi-action.
pub fn multi_action_list(multi_action: &ATerm) -> ATermList<ATerm> {
    debug_assert!(
        is_multi_action(multi_action),
        "Expected a multi-action, found {multi_action}"
    );
    multi_action.arg(0).clone().into()
}

/// Merges two multi-actions into their sorted union.
pub fn merge_multi_actions(tp: &mut TermPool, ma1: &ATerm, ma2: &ATerm) -> ATerm {
    let mut actions: Vec<ATerm> = multi_action_list(ma1).iter().collect();
    actions.extend(multi_action_list(ma2).iter());
    multi_action(tp, &actions)
}

/// The empty multi-action, i.e. the internal rendition of tau.
pub fn tau_multi_action(tp: &mut TermPool) -> ATerm {
    multi_action(tp, &[])
}

pub fn delta(tp: &mut TermPool) -> ATerm {
    let symbol = tp.create_symbol("Delta", 0);
    tp.create(&symbol, &[])
}

pub fn tau(tp: &mut TermPool) -> ATerm {
    let symbol = tp.create_symbol("Tau", 0);
    tp.create(&symbol, &[])
}

/// A process identifier: a name with the sorts of its parameters.
pub fn proc_var_id(tp: &mut TermPool, name: &str, sorts: &[ATerm]) -> ATerm {
    let name_term = name_term(tp, name);
    let sort_list = tp.list(sorts);
    let symbol = tp.create_symbol("ProcVarId", 2);
    tp.create(&symbol, &[name_term, sort_list])
}

/// A process identifier with the parameter sorts given as a list term.
pub fn proc_var_id_sorts(tp: &mut TermPool, name: &str, sorts: &ATerm) -> ATerm {
    debug_assert!(sorts.is_list(), "Expected a sort list");
    let name_term = name_term(tp, name);
    let symbol = tp.create_symbol("ProcVarId", 2);
    tp.create(&symbol, &[name_term, sorts.clone()])
}

/// The invocation of a process identifier with argument expressions.
pub fn process_instance(tp: &mut TermPool, proc_id: &ATerm, arguments: &[ATerm]) -> ATerm {
    debug_assert!(
        is_proc_var_id(proc_id),
        "Expected a process identifier, found {proc_id}"
    );
    let argument_list = tp.list(arguments);
    let symbol = tp.create_symbol("Process", 2);
    tp.create(&symbol, &[proc_id.clone(), argument_list])
}

/// The invocation of a process identifier with the arguments given as a list
/// term.
pub fn process_instance_list(tp: &mut TermPool, proc_id: &ATerm, arguments: &ATerm) -> ATerm {
    debug_assert!(arguments.is_list(), "Expected an argument list");
    let symbol = tp.create_symbol("Process", 2);
    tp.create(&symbol, &[proc_id.clone(), arguments.clone()])
}

fn binary(tp: &mut TermPool, name: &str, lhs: &ATerm, rhs: &ATerm) -> ATerm {
    let symbol = tp.create_symbol(name, 2);
    tp.create(&symbol, &[lhs.clone(), rhs.clone()])
}

pub fn seq(tp: &mut TermPool, first: &ATerm, second: &ATerm) -> ATerm {
    binary(tp, "Seq", first, second)
}

pub fn choice(tp: &mut TermPool, lhs: &ATerm, rhs: &ATerm) -> ATerm {
    binary(tp, "Choice", lhs, rhs)
}

pub fn merge(tp: &mut TermPool, lhs: &ATerm, rhs: &ATerm) -> ATerm {
    binary(tp, "Merge", lhs, rhs)
}

pub fn left_merge(tp: &mut TermPool, lhs: &ATerm, rhs: &ATerm) -> ATerm {
    binary(tp, "LMerge", lhs, rhs)
}

pub fn sync(tp: &mut TermPool, lhs: &ATerm, rhs: &ATerm) -> ATerm {
    binary(tp, "Sync", lhs, rhs)
}

pub fn at_time(tp: &mut TermPool, process: &ATerm, time: &ATerm) -> ATerm {
    binary(tp, "AtTime", process, time)
}

pub fn bounded_init(tp: &mut TermPool, lhs: &ATerm, rhs: &ATerm) -> ATerm {
    binary(tp, "BInit", lhs, rhs)
}

/// A summation over data variables.
pub fn sum(tp: &mut TermPool, variables: &[ATerm], body: &ATerm) -> ATerm {
    debug_assert!(!variables.is_empty(), "A sum binds at least one variable");
    let variable_list = tp.list(variables);
    let symbol = tp.create_symbol("Sum", 2);
    tp.create(&symbol, &[variable_list, body.clone()])
}

/// The conditional process if guard then `then` else `otherwise`.
pub fn cond(tp: &mut TermPool, guard: &ATerm, then: &ATerm, otherwise: &ATerm) -> ATerm {
    let symbol = tp.create_symbol("Cond", 3);
    tp.create(&symbol, &[guard.clone(), then.clone(), otherwise.clone()])
}

/// Scoping operators carry a list as first argument and a body as second.
fn scoped(tp: &mut TermPool, name: &str, list: &ATerm, body: &ATerm) -> ATerm {
    debug_assert!(list.is_list(), "The first argument of {name} is a list");
    let symbol = tp.create_symbol(name, 2);
    tp.create(&symbol, &[list.clone(), body.clone()])
}

pub fn hide(tp: &mut TermPool, labels: &ATerm, body: &ATerm) -> ATerm {
    scoped(tp, "Hide", labels, body)
}

pub fn block(tp: &mut TermPool, labels: &ATerm, body: &ATerm) -> ATerm {
    scoped(tp, "Block", labels, body)
}

pub fn rename(tp: &mut TermPool, renamings: &ATerm, body: &ATerm) -> ATerm {
    scoped(tp, "Rename", renamings, body)
}

pub fn comm(tp: &mut TermPool, communications: &ATerm, body: &ATerm) -> ATerm {
    scoped(tp, "Comm", communications, body)
}

pub fn allow(tp: &mut TermPool, multi_action_names: &ATerm, body: &ATerm) -> ATerm {
    scoped(tp, "Allow", multi_action_names, body)
}

/// A renaming from one action name to another.
pub fn rename_expr(tp: &mut TermPool, from: &str, to: &str) -> ATerm {
    let from_term = name_term(tp, from);
    let to_term = name_term(tp, to);
    let symbol = tp.create_symbol("RenameExpr", 2);
    tp.create(&symbol, &[from_term, to_term])
}

/// A multi-action name: the sorted list of action names of a communication
/// left-hand side or an allowed multi-action.
pub fn multi_act_name(tp: &mut TermPool, names: &[&str]) -> ATerm {
    let mut name_terms: Vec<ATerm> = names.iter().map(|n| name_term(tp, n)).collect();
    name_terms.sort_by(|a, b| a.head_symbol().name().cmp(b.head_symbol().name()));
    let list = tp.list(&name_terms);
    let symbol = tp.create_symbol("MultActName", 1);
    tp.create(&symbol, &[list])
}

/// A communication a1 | ... | ak -> target; a target of [tau] hides the
/// result.
pub fn comm_expr(tp: &mut TermPool, lhs: &ATerm, target: &ATerm) -> ATerm {
    let symbol = tp.create_symbol("CommExpr", 2);
    tp.create(&symbol, &[lhs.clone(), target.clone()])
}

/// A process equation: identifier, parameters and body.
pub fn proc_eqn(tp: &mut TermPool, proc_id: &ATerm, parameters: &[ATerm], body: &ATerm) -> ATerm {
    let parameter_list = tp.list(parameters);
    let symbol = tp.create_symbol("ProcEqn", 3);
    tp.create(&symbol, &[proc_id.clone(), parameter_list, body.clone()])
}

macro_rules! recogniser {
    ($function:ident, $name:literal, $arity:literal) => {
        pub fn $function(t: &ATerm) -> bool {
            t.head_symbol().name() == $name && t.head_symbol().arity() == $arity
        }
    };
}

recogniser!(is_act_id, "ActId", 2);
recogniser!(is_action, "Action", 2);
recogniser!(is_multi_action, "MultAct", 1);
recogniser!(is_delta, "Delta", 0);
recogniser!(is_tau, "Tau", 0);
recogniser!(is_proc_var_id, "ProcVarId", 2);
recogniser!(is_process, "Process", 2);
recogniser!(is_seq, "Seq", 2);
recogniser!(is_choice, "Choice", 2);
recogniser!(is_merge, "Merge", 2);
recogniser!(is_left_merge, "LMerge", 2);
recogniser!(is_sync, "Sync", 2);
recogniser!(is_at_time, "AtTime", 2);
recogniser!(is_bounded_init, "BInit", 2);
recogniser!(is_sum, "Sum", 2);
recogniser!(is_cond, "Cond", 3);
recogniser!(is_hide, "Hide", 2);
recogniser!(is_block, "Block", 2);
recogniser!(is_rename, "Rename", 2);
recogniser!(is_comm, "Comm", 2);
recogniser!(is_allow, "Allow", 2);
recogniser!(is_proc_eqn, "ProcEqn", 3);

/// The name of a process identifier.
pub fn proc_id_name(proc_id: &ATerm) -> &str {
    debug_assert!(
        is_proc_var_id(proc_id),
        "Expected a process identifier, found {proc_id}"
    );
    proc_id.arg(0).head_symbol().name()
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::{data, sort};

    #[test]
    fn test_multi_action_normalisation() {
        let mut tp = TermPool::new();

        let a_id = act_id(&mut tp, "a", &[]);
        let b_id = act_id(&mut tp, "b", &[]);
        let a = action(&mut tp, &a_id, &[]);
        let b = action(&mut tp, &b_id, &[]);

        // The order of insertion does not matter after normalisation.
        let ma1 = multi_action(&mut tp, &[b.clone(), a.clone()]);
        let ma2 = multi_action(&mut tp, &[a.clone(), b.clone()]);
        assert_eq!(ma1, ma2);

        let merged = {
            let single_a = multi_action(&mut tp, &[a.clone()]);
            let single_b = multi_action(&mut tp, &[b.clone()]);
            merge_multi_actions(&mut tp, &single_b, &single_a)
        };
        assert_eq!(merged, ma1);
    }

    #[test]
    fn test_process_constructors() {
        let mut tp = TermPool::new();

        let nat = sort::nat_sort(&mut tp);
        let x = data::variable(&mut tp, "x", &nat);
        let p = proc_var_id(&mut tp, "P", &[nat.clone()]);
        let invocation = process_instance(&mut tp, &p, &[x.clone()]);

        assert!(is_process(&invocation));
        assert_eq!(proc_id_name(&p), "P");

        let body = sum(&mut tp, &[x.clone()], &invocation);
        assert!(is_sum(&body));
        assert!(!is_choice(&body));
    }
}
