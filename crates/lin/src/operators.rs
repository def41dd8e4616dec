//! Expansion of the hiding, blocking, allow and renaming operators over a
//! summand set, and the collapse of subsumed deadlock summands.

use mcrl2rust_aterm::{ATerm, TermPool};
use mcrl2rust_mcrl2::{data, lps, process, substitution};

use crate::context::{list_elements, Ips, Lineariser};

/// Whether the action name term occurs in the label list.
fn is_in_set(name: &ATerm, labels: &[ATerm]) -> bool {
    labels.contains(name)
}

impl Lineariser {
    /// Strikes the hidden actions from a multi-action; a fully hidden
    /// multi-action becomes tau.
    fn hide_multi_action(&self, tp: &mut TermPool, labels: &[ATerm], multi_action: &ATerm) -> ATerm {
        if process::is_delta(multi_action) {
            return multi_action.clone();
        }

        let remaining: Vec<ATerm> = process::multi_action_list(multi_action)
            .iter()
            .filter(|action| !is_in_set(&action.arg(0).arg(0).clone(), labels))
            .collect();
        process::multi_action(tp, &remaining)
    }

    /// Hide(H, LPE): strike the actions with a label in H from every
    /// summand.
    pub(crate) fn hide_composition(&mut self, tp: &mut TermPool, labels: &ATerm, ips: Ips) -> Ips {
        let labels = list_elements(labels);

        let summands = ips
            .summands
            .iter()
            .map(|summand| {
                let variables = summand.arg(0).clone();
                let condition = lps::summand_condition(summand);
                let multi_action = lps::summand_multi_action(summand);
                let hidden = self.hide_multi_action(tp, &labels, &multi_action);
                let time = lps::summand_time(summand);
                let next_state = lps::summand_next_state(summand);
                lps::summand(tp, &variables, &condition, &hidden, &time, &next_state)
            })
            .collect();

        Ips {
            init: ips.init,
            parameters: ips.parameters,
            summands,
        }
    }

    /// Block(B, LPE): a summand whose multi-action contains a blocked label
    /// becomes a deadlock summand.
    pub(crate) fn encap_composition(&mut self, tp: &mut TermPool, labels: &ATerm, ips: Ips) -> Ips {
        let labels = list_elements(labels);

        let mut action_summands = Vec::new();
        let mut delta_summands = Vec::new();

        for summand in &ips.summands {
            let multi_action = lps::summand_multi_action(summand);

            let blocked = !process::is_delta(&multi_action)
                && process::multi_action_list(&multi_action)
                    .iter()
                    .any(|action| is_in_set(&action.arg(0).arg(0).clone(), &labels));

            if blocked || process::is_delta(&multi_action) {
                let variables = summand.arg(0).clone();
                let condition = lps::summand_condition(summand);
                let delta = process::delta(tp);
                let time = lps::summand_time(summand);
                let next_state = lps::summand_next_state(summand);
                delta_summands.push(lps::summand(tp, &variables, &condition, &delta, &time, &next_state));
            } else {
                action_summands.push(summand.clone());
            }
        }

        let summands = self.append_delta_summands(tp, action_summands, delta_summands);
        Ips {
            init: ips.init,
            parameters: ips.parameters,
            summands,
        }
    }

    /// Allow(A, LPE): keep a summand iff its action label sequence is
    /// allowed; tau and deadlock always pass. Rejected summands are demoted
    /// to deadlock summands over the variables their condition and time
    /// still need.
    pub(crate) fn allow_composition(&mut self, tp: &mut TermPool, allowed: &ATerm, ips: Ips) -> Ips {
        // Normalise every allowed multi-action name to its sorted name list.
        let allow_list: Vec<Vec<ATerm>> = list_elements(allowed)
            .iter()
            .map(|entry| {
                let mut names = list_elements(&entry.arg(0).clone());
                names.sort_by(|a, b| a.head_symbol().name().cmp(b.head_symbol().name()));
                names
            })
            .collect();

        let mut action_summands = Vec::new();
        let mut simple_delta_summands = Vec::new();
        let mut delta_summands = Vec::new();

        for summand in &ips.summands {
            let multi_action = lps::summand_multi_action(summand);

            if allow_multi_action(&allow_list, &multi_action) {
                action_summands.push(summand.clone());
                continue;
            }

            // Restrict the sum variables to those the remaining condition
            // and time stamp mention.
            let condition = lps::summand_condition(summand);
            let time = lps::summand_time(summand);
            let variables: Vec<ATerm> = lps::summand_variables(summand)
                .iter()
                .filter(|variable| {
                    substitution::occurs_in_term(variable, &condition)
                        || (!data::is_nil(&time) && substitution::occurs_in_term(variable, &time))
                })
                .collect();

            let variables = tp.list(&variables);
            let delta = process::delta(tp);
            let next_state = lps::summand_next_state(summand);
            let demoted = lps::summand(tp, &variables, &condition, &delta, &time, &next_state);

            if data::is_true(tp, &condition) {
                simple_delta_summands.push(demoted);
            } else {
                delta_summands.push(demoted);
            }
        }

        let mut all_delta = simple_delta_summands;
        all_delta.extend(delta_summands);

        let summands = self.append_delta_summands(tp, action_summands, all_delta);
        Ips {
            init: ips.init,
            parameters: ips.parameters,
            summands,
        }
    }

    /// Rename(R, LPE): rename each action label and restore the multi-action
    /// ordering.
    pub(crate) fn rename_composition(&mut self, tp: &mut TermPool, renamings: &ATerm, ips: Ips) -> Ips {
        let renamings = list_elements(renamings);

        let summands = ips
            .summands
            .iter()
            .map(|summand| {
                let multi_action = lps::summand_multi_action(summand);
                let renamed = if process::is_delta(&multi_action) {
                    multi_action
                } else {
                    let actions: Vec<ATerm> = process::multi_action_list(&multi_action)
                        .iter()
                        .map(|action| rename_action(tp, &renamings, &action))
                        .collect();
                    process::multi_action(tp, &actions)
                };

                let variables = summand.arg(0).clone();
                let condition = lps::summand_condition(summand);
                let time = lps::summand_time(summand);
                let next_state = lps::summand_next_state(summand);
                lps::summand(tp, &variables, &condition, &renamed, &time, &next_state)
            })
            .collect();

        Ips {
            init: ips.init,
            parameters: ips.parameters,
            summands,
        }
    }

    /// Appends deadlock summands to the action summands, collapsing those
    /// subsumed by a summand that is retained.
    pub(crate) fn append_delta_summands(
        &mut self,
        tp: &mut TermPool,
        action_summands: Vec<ATerm>,
        delta_summands: Vec<ATerm>,
    ) -> Vec<ATerm> {
        if self.options.nodeltaelimination {
            let mut result = action_summands;
            result.extend(delta_summands);
            return result;
        }

        let mut result = action_summands;
        for summand in delta_summands {
            result = self.insert_timed_delta_summand(tp, result, &summand);
        }
        result
    }

    /// Inserts a deadlock summand unless an existing summand already covers
    /// it: a summand whose condition is implied by the new one, at the same
    /// or any time. Deadlock summands subsumed by the new one are dropped.
    pub(crate) fn insert_timed_delta_summand(
        &mut self,
        tp: &mut TermPool,
        summands: Vec<ATerm>,
        summand: &ATerm,
    ) -> Vec<ATerm> {
        let delta = process::delta(tp);
        debug_assert!(lps::summand_multi_action(summand) == delta);

        let condition = lps::summand_condition(summand);
        let time = lps::summand_time(summand);

        let mut result = Vec::with_capacity(summands.len() + 1);
        for (position, existing) in summands.iter().enumerate() {
            let existing_condition = lps::summand_condition(existing);
            let existing_time = lps::summand_time(existing);

            if self.implies_condition(tp, &condition, &existing_condition)
                && (time == existing_time || data::is_nil(&existing_time))
            {
                // The existing summand supersedes the new deadlock. Move it
                // to the front, so it is found early for the next deadlock.
                let mut rest: Vec<ATerm> = vec![existing.clone()];
                rest.extend(result);
                rest.extend(summands[position + 1..].iter().cloned());
                return rest;
            }

            let superseded = lps::summand_multi_action(existing) == delta
                && self.implies_condition(tp, &existing_condition, &condition)
                && (time == existing_time || data::is_nil(&time));
            if !superseded {
                result.push(existing.clone());
            }
        }

        result.push(summand.clone());
        result
    }

    /// A cheap structural implication test over the boolean connectives; no
    /// solver is involved.
    pub(crate) fn implies_condition(&mut self, tp: &mut TermPool, c1: &ATerm, c2: &ATerm) -> bool {
        if data::is_true(tp, c2) || data::is_false(tp, c1) {
            return true;
        }
        if data::is_true(tp, c1) || data::is_false(tp, c2) {
            return false;
        }
        if c1 == c2 {
            return true;
        }

        // Dealing with the conjunctions first and then the disjunctions is
        // considerably faster on the typical conditions produced by the
        // parallel composition.
        if data::is_and(tp, c2) {
            let (lhs, rhs) = data::binary_operands(c2);
            return self.implies_condition(tp, c1, &lhs) && self.implies_condition(tp, c1, &rhs);
        }

        if data::is_or(tp, c1) {
            let (lhs, rhs) = data::binary_operands(c1);
            return self.implies_condition(tp, &lhs, c2) && self.implies_condition(tp, &rhs, c2);
        }

        if data::is_and(tp, c1) {
            let (lhs, rhs) = data::binary_operands(c1);
            return self.implies_condition(tp, &lhs, c2) || self.implies_condition(tp, &rhs, c2);
        }

        if data::is_or(tp, c2) {
            let (lhs, rhs) = data::binary_operands(c2);
            return self.implies_condition(tp, c1, &lhs) || self.implies_condition(tp, c1, &rhs);
        }

        false
    }
}

/// Renames an action label through the renaming list, keeping its sorts.
fn rename_action(tp: &mut TermPool, renamings: &[ATerm], action: &ATerm) -> ATerm {
    let act_id = action.arg(0).clone();
    let name = act_id.arg(0).clone();

    for renaming in renamings {
        if renaming.arg(0) == &name {
            let new_name = renaming.arg(1).clone();
            let sorts = list_elements(&act_id.arg(1).clone());
            let new_id = process::act_id(tp, new_name.head_symbol().name(), &sorts);
            let arguments = list_elements(&action.arg(1).clone());
            return process::action(tp, &new_id, &arguments);
        }
    }
    action.clone()
}

/// Whether the multi-action's label sequence matches an allowed entry, or is
/// tau; deadlock is never allowed here and handled by the caller.
fn allow_multi_action(allow_list: &[Vec<ATerm>], multi_action: &ATerm) -> bool {
    if process::is_delta(multi_action) {
        return false;
    }

    let actions: Vec<ATerm> = process::multi_action_list(multi_action).iter().collect();
    if actions.is_empty() {
        // The empty multi-action, i.e. tau, is never blocked by allow.
        return true;
    }

    let names: Vec<ATerm> = actions.iter().map(|action| action.arg(0).arg(0).clone()).collect();

    allow_list.iter().any(|entry| {
        entry.len() == names.len()
            && entry
                .iter()
                .zip(&names)
                .all(|(allowed, name)| allowed.head_symbol().name() == name.head_symbol().name())
    })
}
