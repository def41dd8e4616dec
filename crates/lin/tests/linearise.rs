//! End-to-end linearisation scenarios: the specifications are built
//! directly as terms and the resulting linear process equations are
//! inspected structurally.

use test_log::test;

use mcrl2rust_aterm::{ATerm, ATermList, TermPool};
use mcrl2rust_lin::{linearise, LinMethod, LinOptions};
use mcrl2rust_mcrl2::{data, lps, process, sort, specification as spec};

/// Builds a specification term from the given declarations.
fn build_spec(
    tp: &mut TermPool,
    sorts: &[ATerm],
    constructors: &[ATerm],
    mappings: &[ATerm],
    actions: &[ATerm],
    processes: &[ATerm],
    init: &ATerm,
) -> ATerm {
    let sort_list = tp.list(sorts);
    let cons_list = tp.list(constructors);
    let map_list = tp.list(mappings);
    let empty = tp.list(&[]);
    let act_list = tp.list(actions);
    let proc_list = tp.list(processes);

    let sort_spec = spec::sort_spec(tp, &sort_list);
    let cons_spec = spec::cons_spec(tp, &cons_list);
    let map_spec = spec::map_spec(tp, &map_list);
    let eqn_spec = spec::data_eqn_spec(tp, &empty);
    let act_spec = spec::act_spec(tp, &act_list);
    let proc_spec = spec::proc_eqn_spec(tp, &proc_list);
    let init_clause = spec::init(tp, &empty, init);

    spec::spec_v1(
        tp,
        &[sort_spec, cons_spec, map_spec, eqn_spec, act_spec, proc_spec, init_clause],
    )
}

/// The summands of a linearised specification.
fn summands(result: &ATerm) -> Vec<ATerm> {
    let lpe = result.arg(5).clone();
    assert!(lps::is_lpe(&lpe), "the sixth section is the linear process");
    ATermList::<ATerm>::from(lpe.arg(2).clone()).iter().collect()
}

/// The parameters of a linearised specification.
fn parameters(result: &ATerm) -> Vec<ATerm> {
    let lpe = result.arg(5).clone();
    ATermList::<ATerm>::from(lpe.arg(1).clone()).iter().collect()
}

/// The action labels of a summand's multi-action, or None for deadlock.
fn action_labels(summand: &ATerm) -> Option<Vec<String>> {
    let multi_action = lps::summand_multi_action(summand);
    if process::is_delta(&multi_action) {
        return None;
    }
    Some(
        process::multi_action_list(&multi_action)
            .iter()
            .map(|action| process::action_name(&action).to_string())
            .collect(),
    )
}

/// Checks the structural invariants of every summand: the sum variables are
/// pairwise distinct and only declared parameters are assigned.
fn check_summand_invariants(result: &ATerm) {
    let parameters = parameters(result);
    for summand in summands(result) {
        let variables: Vec<ATerm> = lps::summand_variables(&summand).iter().collect();
        for (position, variable) in variables.iter().enumerate() {
            assert!(
                !variables[position + 1..].contains(variable),
                "duplicate sum variable {variable}"
            );
        }

        let next_state = lps::summand_next_state(&summand);
        if !lps::is_terminated_summand(&summand) {
            for assignment in ATermList::<ATerm>::from(next_state).iter() {
                let assigned = lps::assignment_parameter(&assignment);
                assert!(
                    parameters.contains(&assigned),
                    "assignment to the unknown parameter {assigned}"
                );
            }
        }
    }
}

/// Summands performing exactly the given visible action sequence.
fn summands_with_labels(result: &ATerm, labels: &[&str]) -> Vec<ATerm> {
    summands(result)
        .into_iter()
        .filter(|summand| {
            action_labels(summand).is_some_and(|found| {
                found.len() == labels.len() && found.iter().zip(labels).all(|(f, l)| f == l)
            })
        })
        .collect()
}

#[test]
fn test_single_action_loop() {
    let mut tp = TermPool::new();

    // P = a . P with init P: a single summand without parameters.
    let a_id = process::act_id(&mut tp, "a", &[]);
    let a = process::action(&mut tp, &a_id, &[]);
    let p_id = process::proc_var_id(&mut tp, "P", &[]);
    let p_ref = process::process_instance(&mut tp, &p_id, &[]);
    let body = process::seq(&mut tp, &a, &p_ref);
    let p_eqn = process::proc_eqn(&mut tp, &p_id, &[], &body);

    let input = build_spec(&mut tp, &[], &[], &[], &[a_id], &[p_eqn], &p_ref);
    let result = linearise(&mut tp, &input, LinOptions::default()).unwrap();

    check_summand_invariants(&result.spec);
    let summands = summands(&result.spec);
    assert_eq!(summands.len(), 1);
    assert_eq!(action_labels(&summands[0]), Some(vec!["a".to_string()]));

    // A single control state needs no state parameter.
    assert!(parameters(&result.spec).is_empty());

    let condition = lps::summand_condition(&summands[0]);
    assert!(data::is_true(&mut tp, &condition));
}

#[test]
fn test_nondeterministic_choice() {
    let mut tp = TermPool::new();

    // P = a + b: both actions lead to successful termination.
    let a_id = process::act_id(&mut tp, "a", &[]);
    let b_id = process::act_id(&mut tp, "b", &[]);
    let a = process::action(&mut tp, &a_id, &[]);
    let b = process::action(&mut tp, &b_id, &[]);
    let p_id = process::proc_var_id(&mut tp, "P", &[]);
    let body = process::choice(&mut tp, &a, &b);
    let p_eqn = process::proc_eqn(&mut tp, &p_id, &[], &body);
    let p_ref = process::process_instance(&mut tp, &p_id, &[]);

    let input = build_spec(&mut tp, &[], &[], &[], &[a_id, b_id], &[p_eqn], &p_ref);
    let result = linearise(&mut tp, &input, LinOptions::default()).unwrap();

    assert_eq!(summands_with_labels(&result.spec, &["a"]).len(), 1);
    assert_eq!(summands_with_labels(&result.spec, &["b"]).len(), 1);

    // The termination action of the wrapped process is declared and
    // performed by one summand.
    let with_terminator: Vec<ATerm> = summands(&result.spec)
        .into_iter()
        .filter(|summand| {
            action_labels(summand).is_some_and(|labels| labels.iter().any(|l| l.starts_with("Terminate")))
        })
        .collect();
    assert_eq!(with_terminator.len(), 1);
}

#[test]
fn test_parallel_interleaving() {
    let mut tp = TermPool::new();

    // P || Q with P = a . delta and Q = b . delta: the interleavings and at
    // most the synchronous summand.
    let a_id = process::act_id(&mut tp, "a", &[]);
    let b_id = process::act_id(&mut tp, "b", &[]);
    let a = process::action(&mut tp, &a_id, &[]);
    let b = process::action(&mut tp, &b_id, &[]);
    let delta = process::delta(&mut tp);

    let p_id = process::proc_var_id(&mut tp, "P", &[]);
    let p_body = process::seq(&mut tp, &a, &delta);
    let p_eqn = process::proc_eqn(&mut tp, &p_id, &[], &p_body);

    let q_id = process::proc_var_id(&mut tp, "Q", &[]);
    let q_body = process::seq(&mut tp, &b, &delta);
    let q_eqn = process::proc_eqn(&mut tp, &q_id, &[], &q_body);

    let p_ref = process::process_instance(&mut tp, &p_id, &[]);
    let q_ref = process::process_instance(&mut tp, &q_id, &[]);
    let init = process::merge(&mut tp, &p_ref, &q_ref);

    let input = build_spec(&mut tp, &[], &[], &[], &[a_id, b_id], &[p_eqn, q_eqn], &init);
    let result = linearise(&mut tp, &input, LinOptions::default()).unwrap();

    check_summand_invariants(&result.spec);
    assert_eq!(summands_with_labels(&result.spec, &["a"]).len(), 1);
    assert_eq!(summands_with_labels(&result.spec, &["b"]).len(), 1);

    // At most the two interleavings and the synchronous a|b summand.
    let visible = summands(&result.spec)
        .iter()
        .filter(|s| action_labels(s).is_some())
        .count();
    assert!(visible <= 3, "expected at most 3 summands, found {visible}");
}

#[test]
fn test_communication() {
    let mut tp = TermPool::new();

    // Comm({c|d -> e}, (c(1) . delta) || (d(1) . delta)): the only visible
    // result is e(1).
    let pos = sort::pos_sort(&mut tp);
    let c_id = process::act_id(&mut tp, "c", &[pos.clone()]);
    let d_id = process::act_id(&mut tp, "d", &[pos.clone()]);
    let e_id = process::act_id(&mut tp, "e", &[pos.clone()]);

    let one = data::pos_literal(&mut tp, 1);
    let c = process::action(&mut tp, &c_id, &[one.clone()]);
    let d = process::action(&mut tp, &d_id, &[one.clone()]);
    let delta = process::delta(&mut tp);

    let p_id = process::proc_var_id(&mut tp, "P", &[]);
    let p_body = process::seq(&mut tp, &c, &delta);
    let p_eqn = process::proc_eqn(&mut tp, &p_id, &[], &p_body);

    let q_id = process::proc_var_id(&mut tp, "Q", &[]);
    let q_body = process::seq(&mut tp, &d, &delta);
    let q_eqn = process::proc_eqn(&mut tp, &q_id, &[], &q_body);

    let p_ref = process::process_instance(&mut tp, &p_id, &[]);
    let q_ref = process::process_instance(&mut tp, &q_id, &[]);
    let merged = process::merge(&mut tp, &p_ref, &q_ref);

    let lhs = process::multi_act_name(&mut tp, &["c", "d"]);
    let target = {
        let symbol = tp.create_symbol_quoted("e", 0);
        tp.create(&symbol, &[])
    };
    let comm_expr = process::comm_expr(&mut tp, &lhs, &target);
    let comm_list = tp.list(&[comm_expr]);
    let communicated = process::comm(&mut tp, &comm_list, &merged);

    // Only the communication result is allowed to happen.
    let allowed = process::multi_act_name(&mut tp, &["e"]);
    let allow_list = tp.list(&[allowed]);
    let init = process::allow(&mut tp, &allow_list, &communicated);

    let input = build_spec(
        &mut tp,
        &[],
        &[],
        &[],
        &[c_id, d_id, e_id],
        &[p_eqn, q_eqn],
        &init,
    );
    let result = linearise(&mut tp, &input, LinOptions::default()).unwrap();

    check_summand_invariants(&result.spec);

    // The communication fires with matching arguments.
    let e_summands = summands_with_labels(&result.spec, &["e"]);
    assert_eq!(e_summands.len(), 1);

    let arguments: Vec<ATerm> = {
        let multi_action = lps::summand_multi_action(&e_summands[0]);
        let action = process::multi_action_list(&multi_action).iter().next().unwrap();
        process::action_arguments(&action).iter().collect()
    };
    assert_eq!(arguments, vec![one]);

    // The synchronous c|d summand is blocked by the no-larger-communication
    // clause and the lone c and d steps by the allow set.
    assert!(summands_with_labels(&result.spec, &["c"]).is_empty());
    assert!(summands_with_labels(&result.spec, &["d"]).is_empty());
    assert!(summands_with_labels(&result.spec, &["c", "d"]).is_empty());
}

#[test]
fn test_timed_parallel_ultimate_delay() {
    let mut tp = TermPool::new();

    // (a@3 . delta) || (b@5 . delta): the summands carry the ultimate-delay
    // constraint of the opposite component.
    let real = sort::real_sort(&mut tp);
    let three = data::op_id(&mut tp, "3", &real);
    let five = data::op_id(&mut tp, "5", &real);

    let a_id = process::act_id(&mut tp, "a", &[]);
    let b_id = process::act_id(&mut tp, "b", &[]);
    let a = process::action(&mut tp, &a_id, &[]);
    let b = process::action(&mut tp, &b_id, &[]);
    let delta = process::delta(&mut tp);

    let p_id = process::proc_var_id(&mut tp, "P", &[]);
    let timed_a = process::at_time(&mut tp, &a, &three);
    let p_body = process::seq(&mut tp, &timed_a, &delta);
    let p_eqn = process::proc_eqn(&mut tp, &p_id, &[], &p_body);

    let q_id = process::proc_var_id(&mut tp, "Q", &[]);
    let timed_b = process::at_time(&mut tp, &b, &five);
    let q_body = process::seq(&mut tp, &timed_b, &delta);
    let q_eqn = process::proc_eqn(&mut tp, &q_id, &[], &q_body);

    let p_ref = process::process_instance(&mut tp, &p_id, &[]);
    let q_ref = process::process_instance(&mut tp, &q_id, &[]);
    let init = process::merge(&mut tp, &p_ref, &q_ref);

    let input = build_spec(&mut tp, &[], &[], &[], &[a_id, b_id], &[p_eqn, q_eqn], &init);
    let result = linearise(&mut tp, &input, LinOptions::default()).unwrap();

    // The a summand keeps its time stamp and receives the delay constraint
    // 3 <= 5 in its condition.
    let a_summands = summands_with_labels(&result.spec, &["a"]);
    assert_eq!(a_summands.len(), 1);
    assert_eq!(lps::summand_time(&a_summands[0]), three);

    let condition = format!("{}", lps::summand_condition(&a_summands[0]));
    assert!(condition.contains("<="), "expected a delay constraint, found {condition}");

    let b_summands = summands_with_labels(&result.spec, &["b"]);
    assert_eq!(b_summands.len(), 1);
    assert_eq!(lps::summand_time(&b_summands[0]), five);
}

#[test]
fn test_sum_elimination() {
    let mut tp = TermPool::new();

    // P(n : Nat) = sum x : Nat . (x == 3) -> a(x) . P(x): the sum variable
    // is bound by the equality and disappears.
    let nat = sort::nat_sort(&mut tp);
    let three = data::op_id(&mut tp, "3", &nat);
    let three_decl = three.clone();

    let a_id = process::act_id(&mut tp, "a", &[nat.clone()]);

    let n = data::variable(&mut tp, "n", &nat);
    let x = data::variable(&mut tp, "x", &nat);

    let p_id = process::proc_var_id(&mut tp, "P", &[nat.clone()]);
    let a_x = process::action(&mut tp, &a_id, &[x.clone()]);
    let p_x = process::process_instance(&mut tp, &p_id, &[x.clone()]);
    let continue_ = process::seq(&mut tp, &a_x, &p_x);
    let guard = data::equal(&mut tp, &x, &three);
    let delta = process::delta(&mut tp);
    let guarded = process::cond(&mut tp, &guard, &continue_, &delta);
    let body = process::sum(&mut tp, &[x.clone()], &guarded);
    let p_eqn = process::proc_eqn(&mut tp, &p_id, &[n.clone()], &body);

    let init_arg = data::op_id(&mut tp, "3", &nat);
    let p_ref = process::process_instance(&mut tp, &p_id, &[init_arg]);

    let input = build_spec(&mut tp, &[], &[], &[three_decl], &[a_id], &[p_eqn], &p_ref);
    let result = linearise(&mut tp, &input, LinOptions::default()).unwrap();

    let a_summands = summands_with_labels(&result.spec, &["a"]);
    assert_eq!(a_summands.len(), 1);
    let summand = &a_summands[0];

    // No sum variables are left and the action argument is the literal.
    assert_eq!(lps::summand_variables(summand).len(), 0);

    let multi_action = lps::summand_multi_action(summand);
    let action = process::multi_action_list(&multi_action).iter().next().unwrap();
    let arguments: Vec<ATerm> = process::action_arguments(&action).iter().collect();
    assert_eq!(arguments, vec![three]);
}

#[test]
fn test_hide_of_nothing_is_identity() {
    let mut tp = TermPool::new();

    // Hide({}, P) produces the same summand structure as P itself.
    let a_id = process::act_id(&mut tp, "a", &[]);
    let a = process::action(&mut tp, &a_id, &[]);
    let p_id = process::proc_var_id(&mut tp, "P", &[]);
    let p_ref = process::process_instance(&mut tp, &p_id, &[]);
    let body = process::seq(&mut tp, &a, &p_ref);
    let p_eqn = process::proc_eqn(&mut tp, &p_id, &[], &body);

    let plain = build_spec(&mut tp, &[], &[], &[], &[a_id.clone()], &[p_eqn.clone()], &p_ref);
    let plain_result = linearise(&mut tp, &plain, LinOptions::default()).unwrap();

    let mut tp2 = TermPool::new();
    let a_id2 = process::act_id(&mut tp2, "a", &[]);
    let a2 = process::action(&mut tp2, &a_id2, &[]);
    let p_id2 = process::proc_var_id(&mut tp2, "P", &[]);
    let p_ref2 = process::process_instance(&mut tp2, &p_id2, &[]);
    let body2 = process::seq(&mut tp2, &a2, &p_ref2);
    let p_eqn2 = process::proc_eqn(&mut tp2, &p_id2, &[], &body2);
    let empty2 = tp2.list(&[]);
    let hidden_init2 = process::hide(&mut tp2, &empty2, &p_ref2);

    let hidden = build_spec(&mut tp2, &[], &[], &[], &[a_id2], &[p_eqn2], &hidden_init2);
    let hidden_result = linearise(&mut tp2, &hidden, LinOptions::default()).unwrap();

    let plain_labels: Vec<Option<Vec<String>>> =
        summands(&plain_result.spec).iter().map(action_labels).collect();
    let hidden_labels: Vec<Option<Vec<String>>> =
        summands(&hidden_result.spec).iter().map(action_labels).collect();
    assert_eq!(plain_labels, hidden_labels);
}

#[test]
fn test_allow_nothing_blocks_actions() {
    let mut tp = TermPool::new();

    // Allow({}, P) with P = a . P: every non-tau multi-action is demoted to
    // deadlock, so no a summand remains.
    let a_id = process::act_id(&mut tp, "a", &[]);
    let a = process::action(&mut tp, &a_id, &[]);
    let p_id = process::proc_var_id(&mut tp, "P", &[]);
    let p_ref = process::process_instance(&mut tp, &p_id, &[]);
    let body = process::seq(&mut tp, &a, &p_ref);
    let p_eqn = process::proc_eqn(&mut tp, &p_id, &[], &body);

    let empty = tp.list(&[]);
    let init = process::allow(&mut tp, &empty, &p_ref);

    let input = build_spec(&mut tp, &[], &[], &[], &[a_id], &[p_eqn], &init);
    let result = linearise(&mut tp, &input, LinOptions::default()).unwrap();

    assert!(summands_with_labels(&result.spec, &["a"]).is_empty());
}

#[test]
fn test_allow_everything_is_identity() {
    let mut tp = TermPool::new();

    // Allow({a}, P) with P = a . P keeps the a summand.
    let a_id = process::act_id(&mut tp, "a", &[]);
    let a = process::action(&mut tp, &a_id, &[]);
    let p_id = process::proc_var_id(&mut tp, "P", &[]);
    let p_ref = process::process_instance(&mut tp, &p_id, &[]);
    let body = process::seq(&mut tp, &a, &p_ref);
    let p_eqn = process::proc_eqn(&mut tp, &p_id, &[], &body);

    let entry = process::multi_act_name(&mut tp, &["a"]);
    let allow_list = tp.list(&[entry]);
    let init = process::allow(&mut tp, &allow_list, &p_ref);

    let input = build_spec(&mut tp, &[], &[], &[], &[a_id], &[p_eqn], &init);
    let result = linearise(&mut tp, &input, LinOptions::default()).unwrap();

    assert_eq!(summands_with_labels(&result.spec, &["a"]).len(), 1);
}

#[test]
fn test_rename() {
    let mut tp = TermPool::new();

    // Rename({a -> b}, P) with P = a . P performs b.
    let a_id = process::act_id(&mut tp, "a", &[]);
    let b_id = process::act_id(&mut tp, "b", &[]);
    let a = process::action(&mut tp, &a_id, &[]);
    let p_id = process::proc_var_id(&mut tp, "P", &[]);
    let p_ref = process::process_instance(&mut tp, &p_id, &[]);
    let body = process::seq(&mut tp, &a, &p_ref);
    let p_eqn = process::proc_eqn(&mut tp, &p_id, &[], &body);

    let renaming = process::rename_expr(&mut tp, "a", "b");
    let renamings = tp.list(&[renaming]);
    let init = process::rename(&mut tp, &renamings, &p_ref);

    let input = build_spec(&mut tp, &[], &[], &[], &[a_id, b_id], &[p_eqn], &init);
    let result = linearise(&mut tp, &input, LinOptions::default()).unwrap();

    assert!(summands_with_labels(&result.spec, &["a"]).is_empty());
    assert_eq!(summands_with_labels(&result.spec, &["b"]).len(), 1);
}

#[test]
fn test_stack_mode() {
    let mut tp = TermPool::new();

    // The stack translation of a simple loop declares the stack datatype
    // and keeps the behaviour.
    let a_id = process::act_id(&mut tp, "a", &[]);
    let a = process::action(&mut tp, &a_id, &[]);
    let p_id = process::proc_var_id(&mut tp, "P", &[]);
    let p_ref = process::process_instance(&mut tp, &p_id, &[]);
    let body = process::seq(&mut tp, &a, &p_ref);
    let p_eqn = process::proc_eqn(&mut tp, &p_id, &[], &body);

    let input = build_spec(&mut tp, &[], &[], &[], &[a_id], &[p_eqn], &p_ref);
    let options = LinOptions {
        lin_method: LinMethod::Stack,
        ..Default::default()
    };
    let result = linearise(&mut tp, &input, options).unwrap();

    assert_eq!(summands_with_labels(&result.spec, &["a"]).len(), 1);

    // A single stack parameter and the generated Stack sort.
    assert_eq!(parameters(&result.spec).len(), 1);
    let sorts: Vec<ATerm> = ATermList::<ATerm>::from(result.spec.arg(0).arg(0).clone())
        .iter()
        .collect();
    assert!(sorts
        .iter()
        .any(|sort_decl| sort::sort_name(sort_decl).starts_with("Stack")));
}

#[test]
fn test_unguarded_recursion_is_rejected() {
    let mut tp = TermPool::new();

    // P = P is unguarded.
    let a_id = process::act_id(&mut tp, "a", &[]);
    let p_id = process::proc_var_id(&mut tp, "P", &[]);
    let p_ref = process::process_instance(&mut tp, &p_id, &[]);
    let p_eqn = process::proc_eqn(&mut tp, &p_id, &[], &p_ref);

    let input = build_spec(&mut tp, &[], &[], &[], &[a_id], &[p_eqn], &p_ref);
    let result = linearise(&mut tp, &input, LinOptions::default());
    assert!(result.is_err());
}

#[test]
fn test_left_merge_is_rejected() {
    let mut tp = TermPool::new();

    let a_id = process::act_id(&mut tp, "a", &[]);
    let a = process::action(&mut tp, &a_id, &[]);
    let p_id = process::proc_var_id(&mut tp, "P", &[]);
    let p_ref = process::process_instance(&mut tp, &p_id, &[]);
    let body = process::seq(&mut tp, &a, &p_ref);
    let p_eqn = process::proc_eqn(&mut tp, &p_id, &[], &body);

    let init = process::left_merge(&mut tp, &p_ref, &p_ref);
    let input = build_spec(&mut tp, &[], &[], &[], &[a_id], &[p_eqn], &init);
    let result = linearise(&mut tp, &input, LinOptions::default());
    assert!(result.is_err());
}

#[test]
fn test_regular2_mode() {
    let mut tp = TermPool::new();

    // A loop with two actions linearises in regular2 mode as well.
    let a_id = process::act_id(&mut tp, "a", &[]);
    let b_id = process::act_id(&mut tp, "b", &[]);
    let a = process::action(&mut tp, &a_id, &[]);
    let b = process::action(&mut tp, &b_id, &[]);
    let p_id = process::proc_var_id(&mut tp, "P", &[]);
    let p_ref = process::process_instance(&mut tp, &p_id, &[]);
    let inner = process::seq(&mut tp, &b, &p_ref);
    let body = process::seq(&mut tp, &a, &inner);
    let p_eqn = process::proc_eqn(&mut tp, &p_id, &[], &body);

    let input = build_spec(&mut tp, &[], &[], &[], &[a_id, b_id], &[p_eqn], &p_ref);
    let options = LinOptions {
        lin_method: LinMethod::Regular2,
        ..Default::default()
    };
    let result = linearise(&mut tp, &input, options).unwrap();

    assert_eq!(summands_with_labels(&result.spec, &["a"]).len(), 1);
    assert_eq!(summands_with_labels(&result.spec, &["b"]).len(), 1);
}
