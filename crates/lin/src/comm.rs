//! Expansion of the communication operator, following the calculation of
//! communication with open terms by Muck van Weerdenburg: for every summand
//! each maximal set of disjoint subsequences of its multi-action that match
//! a communication left-hand side is replaced by the right-hand side,
//! guarded by the equality of the argument lists and by the condition that
//! no larger communication was possible.

use mcrl2rust_aterm::{ATerm, TermPool};
use mcrl2rust_mcrl2::{data, lps, process, substitution};

use crate::context::{list_elements, Ips, Lineariser};

/// One communication a_1 | ... | a_k -> b with the left-hand side names
/// sorted.
struct CommEntry {
    lhs: Vec<ATerm>,
    /// The target action name, or a tau term for a hidden result.
    rhs: ATerm,
}

/// The sorted label names of a sequence of actions.
fn action_names(actions: &[ATerm]) -> Vec<ATerm> {
    actions.iter().map(|action| action.arg(0).arg(0).clone()).collect()
}

fn name_str(name: &ATerm) -> &str {
    name.head_symbol().name()
}

/// Whether `small` is a sub-multiset of `large`; both are sorted by name.
fn is_sub_multiset(small: &[ATerm], large: &[ATerm]) -> bool {
    let mut remaining = large.iter();
    'outer: for name in small {
        for candidate in remaining.by_ref() {
            if name_str(candidate) == name_str(name) {
                continue 'outer;
            }
        }
        return false;
    }
    true
}

/// The multiset difference `large` minus `small`; both sorted by name.
fn multiset_difference(large: &[ATerm], small: &[ATerm]) -> Vec<ATerm> {
    let mut result = Vec::new();
    let mut remaining = small.to_vec();
    for name in large {
        if let Some(position) = remaining.iter().position(|n| name_str(n) == name_str(name)) {
            remaining.remove(position);
        } else {
            result.push(name.clone());
        }
    }
    result
}

impl CommEntry {
    fn parse_all(communications: &ATerm) -> Vec<CommEntry> {
        list_elements(communications)
            .iter()
            .map(|expr| {
                let mut lhs = list_elements(&expr.arg(0).arg(0).clone());
                lhs.sort_by(|a, b| name_str(a).cmp(name_str(b)));
                CommEntry {
                    lhs,
                    rhs: expr.arg(1).clone(),
                }
            })
            .collect()
    }
}

/// The label the actions of `m` communicate to: None when no left-hand side
/// matches exactly; Some(None) when the right-hand side is tau, so the
/// result is hidden.
fn can_communicate(tp: &mut TermPool, entries: &[CommEntry], m: &[ATerm]) -> Option<Option<ATerm>> {
    let names = action_names(m);
    for entry in entries {
        let matches = entry.lhs.len() == names.len()
            && entry
                .lhs
                .iter()
                .zip(&names)
                .all(|(l, n)| name_str(l) == name_str(n));
        if matches {
            if process::is_tau(&entry.rhs) {
                return Some(None);
            }
            let sorts = m[0].arg(0).arg(1).clone();
            let act_id = {
                let symbol = tp.create_symbol("ActId", 2);
                tp.create(&symbol, &[entry.rhs.clone(), sorts])
            };
            return Some(Some(act_id));
        }
    }
    None
}

/// Whether the actions of `m` can be part of a communication: a left-hand
/// side containing them, whose remaining actions all occur in `n` when a
/// remainder is given.
fn might_communicate(entries: &[CommEntry], m: &[ATerm], n: Option<&[ATerm]>) -> bool {
    let names = action_names(m);
    entries.iter().any(|entry| {
        if !is_sub_multiset(&names, &entry.lhs) {
            return false;
        }
        match n {
            None => true,
            Some(remainder) => {
                let rest = multiset_difference(&entry.lhs, &names);
                let remainder_names = action_names(remainder);
                is_sub_multiset(&rest, &remainder_names)
            }
        }
    })
}

/// The pairwise equality of two argument lists; false when the lengths or
/// sorts differ.
fn pairwise_match(tp: &mut TermPool, l1: &[ATerm], l2: &[ATerm]) -> ATerm {
    if l1.len() != l2.len() {
        return data::false_term(tp);
    }

    let mut result = data::true_term(tp);
    for (t1, t2) in l1.iter().zip(l2).rev() {
        if data::sort_of(t1) != data::sort_of(t2) {
            return data::false_term(tp);
        }
        let equality = data::equal(tp, t1, t2);
        result = if data::is_true(tp, &result) {
            equality
        } else {
            data::and(tp, &equality, &result)
        };
    }
    result
}

/// Inserts an action in front of every tuple of `tuples`, conjoining the
/// condition; with no action only the condition is added.
fn add_action_condition(
    tp: &mut TermPool,
    action: Option<&ATerm>,
    condition: &ATerm,
    tuples: Vec<(Vec<ATerm>, ATerm)>,
    mut accumulator: Vec<(Vec<ATerm>, ATerm)>,
) -> Vec<(Vec<ATerm>, ATerm)> {
    for (actions, tuple_condition) in tuples {
        let mut actions = actions;
        if let Some(action) = action {
            let position = actions
                .iter()
                .position(|existing| process::action_compare(action, existing).is_lt())
                .unwrap_or(actions.len());
            actions.insert(position, action.clone());
        }
        let combined = data::and(tp, &tuple_condition, condition);
        accumulator.push((actions, combined));
    }
    accumulator
}

impl Lineariser {
    /// The tuples describing how the actions m | w | n can communicate: all
    /// of m takes part, none of w, and any subset of n. `d` holds the data
    /// arguments of the communication.
    #[allow(clippy::too_many_arguments)]
    fn phi(
        &mut self,
        tp: &mut TermPool,
        entries: &[CommEntry],
        m: &[ATerm],
        d: &[ATerm],
        w: &[ATerm],
        n: &[ATerm],
        r: Option<&[ATerm]>,
    ) -> Vec<(Vec<ATerm>, ATerm)> {
        if !might_communicate(entries, m, Some(n)) {
            return Vec::new();
        }

        if n.is_empty() {
            let Some(result) = can_communicate(tp, entries, m) else {
                return Vec::new();
            };

            let tuples = self.multi_action_condition_list_aux(tp, entries, w, r);
            let action = result.map(|act_id| process::action(tp, &act_id, d));
            let true_term = data::true_term(tp);
            return add_action_condition(tp, action.as_ref(), &true_term, tuples, Vec::new());
        }

        let first = n[0].clone();
        let rest = &n[1..];

        // Either the first action joins the communication or it does not.
        let mut joined = m.to_vec();
        joined.push(first.clone());
        let with_first = self.phi(tp, entries, &joined, d, w, rest, r);

        let mut skipped = w.to_vec();
        skipped.push(first.clone());
        let without_first = self.phi(tp, entries, m, d, &skipped, rest, r);

        let first_arguments = list_elements(&first.arg(1).clone());
        let matching = pairwise_match(tp, d, &first_arguments);
        add_action_condition(tp, None, &matching, with_first, without_first)
    }

    /// Whether alpha extends to a communication within beta.
    fn xi(&mut self, tp: &mut TermPool, entries: &[CommEntry], alpha: &[ATerm], beta: &[ATerm]) -> bool {
        if beta.is_empty() {
            return can_communicate(tp, entries, alpha).is_some();
        }

        let first = beta[0].clone();
        let rest = &beta[1..];

        let mut extended = alpha.to_vec();
        extended.push(first);

        if can_communicate(tp, entries, &extended).is_some() {
            return true;
        }
        if might_communicate(entries, &extended, Some(rest)) {
            return self.xi(tp, entries, &extended, rest) || self.xi(tp, entries, alpha, rest);
        }
        self.xi(tp, entries, alpha, rest)
    }

    /// The conditions under which a pair of actions of alpha could still
    /// communicate; their negated conjunction is the "no larger
    /// communication applies" side condition.
    fn psi(&mut self, tp: &mut TermPool, entries: &[CommEntry], alpha: &[ATerm]) -> Vec<ATerm> {
        let mut conditions = Vec::new();

        for (position, action) in alpha.iter().enumerate() {
            let beta = &alpha[position + 1..];
            for (offset, candidate) in beta.iter().enumerate() {
                let rest = &beta[offset + 1..];
                let mut pair = vec![action.clone(), candidate.clone()];
                pair.sort_by(|a, b| process::action_compare(a, b));

                if might_communicate(entries, &pair, Some(rest)) && self.xi(tp, entries, &pair, rest) {
                    let arguments1 = list_elements(&action.arg(1).clone());
                    let arguments2 = list_elements(&candidate.arg(1).clone());
                    conditions.push(pairwise_match(tp, &arguments1, &arguments2));
                }
            }
        }
        conditions
    }

    fn negated_conjunction(&mut self, tp: &mut TermPool, conditions: &[ATerm]) -> ATerm {
        let mut result = data::true_term(tp);
        for condition in conditions {
            let negated = data::not(tp, condition);
            result = data::and(tp, &negated, &result);
        }
        result
    }

    /// The function gamma(m, C, r) of the note: every way the multi-action
    /// can communicate, with the condition making that way apply.
    fn multi_action_condition_list_aux(
        &mut self,
        tp: &mut TermPool,
        entries: &[CommEntry],
        multi_action: &[ATerm],
        r: Option<&[ATerm]>,
    ) -> Vec<(Vec<ATerm>, ATerm)> {
        if multi_action.is_empty() {
            let condition = match r {
                None => data::true_term(tp),
                Some(r) => {
                    let conditions = self.psi(tp, entries, r);
                    self.negated_conjunction(tp, &conditions)
                }
            };
            return vec![(Vec::new(), condition)];
        }

        let first = multi_action[0].clone();
        let rest = &multi_action[1..];

        let first_arguments = list_elements(&first.arg(1).clone());
        let communicating = self.phi(tp, entries, &[first.clone()], &first_arguments, &[], rest, r);

        let mut extended_r = match r {
            None => Vec::new(),
            Some(r) => r.to_vec(),
        };
        extended_r.insert(0, first.clone());
        let not_communicating = self.multi_action_condition_list_aux(tp, entries, rest, Some(&extended_r));

        let true_term = data::true_term(tp);
        add_action_condition(tp, Some(&first), &true_term, not_communicating, communicating)
    }

    /// Comm(C, LPE): rewrites every summand's multi-action into the possible
    /// communication results, each with its applicability condition. The
    /// conditions exclude each other; when nothing can communicate the
    /// original multi-action is delivered with condition true.
    pub(crate) fn communication_composition(
        &mut self,
        tp: &mut TermPool,
        communications: &ATerm,
        ips: Ips,
    ) -> Ips {
        let entries = CommEntry::parse_all(communications);
        let before = ips.summands.len();

        let mut delta_summands = Vec::new();
        let mut result_summands = Vec::new();

        for summand in &ips.summands {
            let multi_action = lps::summand_multi_action(summand);
            if process::is_delta(&multi_action) {
                delta_summands.push(summand.clone());
                continue;
            }

            let condition = lps::summand_condition(summand);
            let time = lps::summand_time(summand);
            let next_state = lps::summand_next_state(summand);

            // Recall a deadlock summand for every action summand: with
            // communication the summand conditions become complex, and a
            // deadlock with the original condition simplifies removing the
            // blocked results later on.
            let restricted: Vec<ATerm> = lps::summand_variables(summand)
                .iter()
                .filter(|variable| {
                    substitution::occurs_in_term(variable, &condition)
                        || (!data::is_nil(&time) && substitution::occurs_in_term(variable, &time))
                })
                .collect();
            let restricted = tp.list(&restricted);
            let delta = process::delta(tp);
            delta_summands.push(lps::summand(tp, &restricted, &condition, &delta, &time, &next_state));

            let actions: Vec<ATerm> = process::multi_action_list(&multi_action).iter().collect();
            let tuples = self.multi_action_condition_list_aux(tp, &entries, &actions, None);
            debug_assert!(!tuples.is_empty());

            for (tuple_actions, tuple_condition) in tuples {
                let communication_condition = self.rewrite_term(tp, &tuple_condition);
                let new_multi_action = process::multi_action(tp, &tuple_actions);

                let sum_vars: Vec<ATerm> = lps::summand_variables(summand).iter().collect();

                let (sum_vars, new_condition, new_multi_action, new_time, new_next_state) =
                    if self.options.nosumelm {
                        let combined = data::and(tp, &condition, &communication_condition);
                        (sum_vars, combined, new_multi_action, time.clone(), next_state.clone())
                    } else {
                        self.apply_sum_elimination(
                            tp,
                            sum_vars,
                            condition.clone(),
                            new_multi_action,
                            time.clone(),
                            next_state.clone(),
                            &communication_condition,
                            &ips.parameters,
                        )
                    };

                let new_condition = self.rewrite_term(tp, &new_condition);
                if data::is_false(tp, &new_condition) {
                    continue;
                }

                let variables = tp.list(&sum_vars);
                result_summands.push(lps::summand(
                    tp,
                    &variables,
                    &new_condition,
                    &new_multi_action,
                    &new_time,
                    &new_next_state,
                ));
            }
        }

        let summands = self.append_delta_summands(tp, result_summands, delta_summands);
        log::debug!(
            "calculating the communication operator on {} summands resulting in {} summands",
            before,
            summands.len()
        );

        Ips {
            init: ips.init,
            parameters: ips.parameters,
            summands,
        }
    }
}
