//! Clustering of summands that share an action pattern into a single
//! summand quantified over a fresh enumerated-type variable, with case
//! functions selecting the per-summand condition, action arguments, time
//! stamp and next state.

use mcrl2rust_aterm::{ATerm, TermPool};
use mcrl2rust_mcrl2::{data, lps, process, sort, substitution};

use crate::context::{list_elements, Ips, Lineariser};
use crate::enumtypes::EnumUsage;

/// Whether two summands can share a clustered summand: same timedness, and
/// either both deadlock or the same action labels and termination status.
fn summands_can_be_clustered(s1: &ATerm, s2: &ATerm) -> bool {
    let time1 = lps::summand_time(s1);
    let time2 = lps::summand_time(s2);
    if data::is_nil(&time1) != data::is_nil(&time2) {
        return false;
    }

    if lps::is_terminated_summand(s1) != lps::is_terminated_summand(s2) {
        return false;
    }

    let ma1 = lps::summand_multi_action(s1);
    let ma2 = lps::summand_multi_action(s2);

    if process::is_delta(&ma1) || process::is_delta(&ma2) {
        return process::is_delta(&ma1) && process::is_delta(&ma2);
    }

    let actions1: Vec<ATerm> = process::multi_action_list(&ma1).iter().collect();
    let actions2: Vec<ATerm> = process::multi_action_list(&ma2).iter().collect();
    actions1.len() == actions2.len()
        && actions1
            .iter()
            .zip(&actions2)
            .all(|(a1, a2)| a1.arg(0) == a2.arg(0))
}

/// The value assigned to the parameter, or the parameter itself when the
/// assignment list leaves it unchanged.
fn rhs_assignment(parameter: &ATerm, assignments: &ATerm) -> ATerm {
    for assignment in list_elements(assignments) {
        if lps::assignment_parameter(&assignment) == *parameter {
            return lps::assignment_expression(&assignment);
        }
    }
    parameter.clone()
}

impl Lineariser {
    /// Merges the sum variables of a summand into the accumulated cluster
    /// variables: variables of matching sort are identified, name clashes
    /// are renamed fresh. The per-summand renaming and the guard making the
    /// unused cluster variables deterministic are recorded.
    fn merge_variables(
        &mut self,
        tp: &mut TermPool,
        summand_vars: &[ATerm],
        accumulated: Vec<ATerm>,
        renamings: &mut Vec<Vec<(ATerm, ATerm)>>,
        condition_list: &mut Vec<ATerm>,
    ) -> Vec<ATerm> {
        let mut matching = accumulated.clone();
        let mut result = accumulated.clone();
        let mut renaming = Vec::new();

        for variable in summand_vars {
            // Join with an unused cluster variable of the same sort.
            if let Some(position) = matching.iter().position(|m| m.arg(1) == variable.arg(1)) {
                let cluster_var = matching.remove(position);
                if cluster_var != *variable {
                    renaming.push((variable.clone(), cluster_var));
                }
                continue;
            }

            // No join: the variable enters the cluster, renamed when its
            // name is already taken.
            let mut variable = variable.clone();
            if accumulated.iter().any(|a| a.arg(0) == variable.arg(0)) {
                let sort = variable.arg(1).clone();
                let fresh = self.fresh.fresh_variable(tp, data::name(&variable), &sort);
                renaming.push((variable.clone(), fresh.clone()));
                variable = fresh;
            }

            // The summands merged before do not mention this variable; fix
            // it to a don't-care value in their guards.
            let dummy = {
                let variable_sort = variable.arg(1).clone();
                self.dummy_term(tp, &variable_sort)
            };
            let guard = data::equal(tp, &variable, &dummy);
            for entry in condition_list.iter_mut() {
                *entry = data::and(tp, &guard, entry);
            }

            result.insert(0, variable);
        }

        // This summand in turn does not mention the cluster variables that
        // remained unmatched.
        let mut own_guard = data::true_term(tp);
        for unmatched in &matching {
            let dummy = {
                let unmatched_sort = unmatched.arg(1).clone();
                self.dummy_term(tp, &unmatched_sort)
            };
            let guard = data::equal(tp, unmatched, &dummy);
            own_guard = if data::is_true(tp, &own_guard) {
                guard
            } else {
                data::and(tp, &own_guard, &guard)
            };
        }
        condition_list.push(own_guard);
        renamings.push(renaming);

        result
    }

    /// The sum variables of the binary encoding: one boolean per bit, with
    /// the condition restricting the encoded value below n.
    fn make_binary_sums(
        &mut self,
        tp: &mut TermPool,
        n: usize,
        tail: Vec<ATerm>,
    ) -> (Vec<ATerm>, ATerm, Vec<ATerm>) {
        debug_assert!(n > 1);
        let bool_sort = sort::bool_sort(tp);

        let mut bit_variables = Vec::new();
        let mut condition: Option<ATerm> = None;
        let mut value = n - 1;
        while value > 0 {
            let variable = self.fresh.fresh_variable(tp, "e", &bool_sort);
            bit_variables.push(variable.clone());

            condition = Some(if value % 2 == 0 {
                match condition {
                    None => variable,
                    Some(rest) => data::and(tp, &variable, &rest),
                }
            } else {
                match condition {
                    None => data::true_term(tp),
                    Some(rest) => data::or(tp, &variable, &rest),
                }
            });
            value /= 2;
        }

        let mut result = bit_variables.clone();
        result.extend(tail);
        let condition = condition.unwrap_or_else(|| data::true_term(tp));
        (result, condition, bit_variables)
    }

    /// A balanced if-tree over the bit variables selecting among the terms.
    fn binary_case_tree(
        &mut self,
        tp: &mut TermPool,
        depth: usize,
        bits: &[ATerm],
        terms: &mut std::vec::IntoIter<ATerm>,
        term_sort: &ATerm,
        enum_usage: &EnumUsage,
    ) -> ATerm {
        if depth == 0 {
            return terms.next().expect("a term per leaf");
        }

        let case_variable = bits[0].clone();
        let rest = &bits[1..];

        let left = self.binary_case_tree(tp, depth / 2, rest, terms, term_sort, enum_usage);
        if terms.as_slice().is_empty() {
            return left;
        }
        let right = self.binary_case_tree(tp, depth / 2, rest, terms, term_sort, enum_usage);
        if left == right {
            return left;
        }

        let case_function = self.find_case_function(enum_usage.type_index, term_sort);
        data::apply(tp, &case_function, &[case_variable, left, right])
    }

    fn construct_binary_case_tree(
        &mut self,
        tp: &mut TermPool,
        n: usize,
        bits: &[ATerm],
        terms: Vec<ATerm>,
        term_sort: &ATerm,
        enum_usage: &EnumUsage,
    ) -> ATerm {
        let mut iterator = terms.into_iter();
        self.binary_case_tree(tp, n - 1, bits, &mut iterator, term_sort, enum_usage)
    }

    /// Selects among the per-summand terms: the shared term when they all
    /// agree, otherwise a case function application (or an if-tree for the
    /// binary encoding).
    #[allow(clippy::too_many_arguments)]
    fn select(
        &mut self,
        tp: &mut TermPool,
        per_summand: Vec<ATerm>,
        term_sort: &ATerm,
        enum_usage: &EnumUsage,
        n: usize,
        bits: &[ATerm],
    ) -> ATerm {
        debug_assert!(!per_summand.is_empty());
        if per_summand.iter().all(|t| *t == per_summand[0]) {
            return per_summand[0].clone();
        }

        if self.options.binary {
            return self.construct_binary_case_tree(tp, n, bits, per_summand, term_sort, enum_usage);
        }

        let case_function = self.find_case_function(enum_usage.type_index, term_sort);
        let mut arguments = vec![enum_usage.variable.clone()];
        arguments.extend(per_summand);
        data::apply(tp, &case_function, &arguments)
    }

    /// Builds the clustered summand of a group with the same action pattern.
    fn cluster_group(
        &mut self,
        tp: &mut TermPool,
        enum_usage: &EnumUsage,
        group: &[ATerm],
        parameters: &[ATerm],
        with_assignments: bool,
    ) -> ATerm {
        let n = group.len();

        // Merge the sum variables of the group.
        let mut renamings: Vec<Vec<(ATerm, ATerm)>> = Vec::new();
        let mut condition_list: Vec<ATerm> = Vec::new();
        let mut cluster_vars: Vec<ATerm> = Vec::new();
        for summand in group {
            let summand_vars: Vec<ATerm> = lps::summand_variables(summand).iter().collect();
            cluster_vars = self.merge_variables(tp, &summand_vars, cluster_vars, &mut renamings, &mut condition_list);
        }

        let (sum_vars, binary_sum_condition, bits) = if self.options.binary {
            let (vars, condition, bits) = self.make_binary_sums(tp, n, cluster_vars);
            (vars, Some(condition), bits)
        } else {
            let mut vars = vec![enum_usage.variable.clone()];
            vars.extend(cluster_vars);
            (vars, None, Vec::new())
        };

        // The clustered condition: the guards fixing unused variables and
        // the per-summand conditions, both selected by the cluster variable.
        let bool_sort = sort::bool_sort(tp);
        let per_summand_conditions: Vec<ATerm> = group
            .iter()
            .zip(&renamings)
            .map(|(summand, renaming)| {
                let condition = lps::summand_condition(summand);
                substitution::substitute_data(tp, renaming, &condition)
            })
            .collect();

        let selected_condition = self.select(tp, per_summand_conditions, &bool_sort, enum_usage, n, &bits);
        let selected_guard = self.select(tp, condition_list, &bool_sort, enum_usage, n, &bits);
        let mut condition = data::and(tp, &selected_guard, &selected_condition);
        if let Some(binary_condition) = binary_sum_condition {
            condition = data::and(tp, &binary_condition, &condition);
        }

        // The clustered multi-action: per action and per argument position a
        // selection over the summands.
        let first_action = lps::summand_multi_action(&group[0]);
        let multi_action = if process::is_delta(&first_action) {
            first_action
        } else {
            let label_count = process::multi_action_list(&first_action).iter().count();
            let mut actions = Vec::with_capacity(label_count);

            for action_position in 0..label_count {
                let label = process::multi_action_list(&first_action)
                    .iter()
                    .nth(action_position)
                    .expect("the action exists")
                    .arg(0)
                    .clone();
                let argument_sorts = list_elements(&label.arg(1).clone());

                let mut arguments = Vec::with_capacity(argument_sorts.len());
                for (argument_position, argument_sort) in argument_sorts.iter().enumerate() {
                    let per_summand: Vec<ATerm> = group
                        .iter()
                        .zip(&renamings)
                        .map(|(summand, renaming)| {
                            let ma = lps::summand_multi_action(summand);
                            let action = process::multi_action_list(&ma)
                                .iter()
                                .nth(action_position)
                                .expect("the group shares the action pattern");
                            let argument = list_elements(&action.arg(1).clone())[argument_position].clone();
                            substitution::substitute_data(tp, renaming, &argument)
                        })
                        .collect();
                    arguments.push(self.select(tp, per_summand, argument_sort, enum_usage, n, &bits));
                }
                actions.push(process::action(tp, &label, &arguments));
            }
            process::multi_action(tp, &actions)
        };

        // The clustered time stamp.
        let first_time = lps::summand_time(&group[0]);
        let time = if data::is_nil(&first_time) {
            first_time
        } else {
            let real_sort = sort::real_sort(tp);
            let per_summand: Vec<ATerm> = group
                .iter()
                .zip(&renamings)
                .map(|(summand, renaming)| {
                    let time = lps::summand_time(summand);
                    substitution::substitute_time(tp, renaming, &time)
                })
                .collect();
            self.select(tp, per_summand, &real_sort, enum_usage, n, &bits)
        };

        // The clustered next state, one selection per parameter.
        let next_state = if lps::is_terminated_summand(&group[0]) {
            data::nil(tp)
        } else {
            let mut values = Vec::with_capacity(parameters.len());
            for (position, parameter) in parameters.iter().enumerate() {
                let parameter_sort = parameter.arg(1).clone();
                let per_summand: Vec<ATerm> = group
                    .iter()
                    .zip(&renamings)
                    .map(|(summand, renaming)| {
                        let next = lps::summand_next_state(summand);
                        let value = if with_assignments {
                            rhs_assignment(parameter, &next)
                        } else {
                            list_elements(&next)[position].clone()
                        };
                        substitution::substitute_data(tp, renaming, &value)
                    })
                    .collect();
                values.push(self.select(tp, per_summand, &parameter_sort, enum_usage, n, &bits));
            }

            if with_assignments {
                let value_list = tp.list(&values);
                lps::replace_arguments_by_assignments(tp, &value_list, parameters)
            } else {
                tp.list(&values)
            }
        };

        let variables = tp.list(&sum_vars);
        lps::summand(tp, &variables, &condition, &multi_action, &time, &next_state)
    }

    /// Clusters the summand set: groups with the same action pattern are
    /// folded into one summand each, quantified over an enumerated type of
    /// the group size.
    pub(crate) fn cluster_actions(
        &mut self,
        tp: &mut TermPool,
        summands: Vec<ATerm>,
        parameters: &[ATerm],
        with_assignments: bool,
    ) -> Vec<ATerm> {
        let mut remaining = summands;
        let mut result = Vec::new();

        while let Some(first) = remaining.first().cloned() {
            let mut group = vec![first.clone()];
            let mut rest = Vec::new();
            for summand in remaining.drain(1..) {
                if summands_can_be_clustered(&first, &summand) {
                    group.push(summand);
                } else {
                    rest.push(summand);
                }
            }
            remaining = rest;

            if group.len() == 1 {
                result.push(first);
                continue;
            }

            let multi_action = lps::summand_multi_action(&first);
            let action_sorts: Vec<ATerm> = if process::is_delta(&multi_action) {
                Vec::new()
            } else {
                process::multi_action_list(&multi_action)
                    .iter()
                    .flat_map(|action| list_elements(&action.arg(0).arg(1).clone()))
                    .collect()
            };
            let parameter_sorts: Vec<ATerm> = parameters.iter().map(|p| p.arg(1).clone()).collect();

            let size = if self.options.binary { 2 } else { group.len() };
            let enum_usage = self.generate_enumerated_datatype(tp, size, &action_sorts, &parameter_sorts);

            result.push(self.cluster_group(tp, &enum_usage, &group, parameters, with_assignments));
        }

        result
    }

    /// Clusters the final result once more, now over assignment lists.
    pub(crate) fn cluster_final_result(&mut self, tp: &mut TermPool, ips: Ips) -> Ips {
        let parameters = ips.parameters.clone();
        let summands = self.cluster_actions(tp, ips.summands, &parameters, true);
        Ips {
            init: ips.init,
            parameters: ips.parameters,
            summands,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::stacks::upper_power_of_two;

    #[test]
    fn test_upper_power_used_by_binary_sums() {
        // make_binary_sums introduces one boolean per bit.
        let mut tp = TermPool::new();
        let mut lin = Lineariser::new(crate::LinOptions {
            binary: true,
            ..Default::default()
        });

        let (vars, _condition, bits) = lin.make_binary_sums(&mut tp, 5, Vec::new());
        assert_eq!(bits.len(), upper_power_of_two(5));
        assert_eq!(vars.len(), bits.len());
    }
}
