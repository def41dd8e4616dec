//! Parallel composition of two linear processes: for every pair of summands
//! a synchronous summand, plus an asynchronous summand per side constrained
//! by the ultimate-delay condition of the other side.

use mcrl2rust_aterm::{ATerm, TermPool};
use mcrl2rust_mcrl2::{data, lps, process, sort, substitution};

use crate::context::{list_elements, Ips, Lineariser};

impl Lineariser {
    /// The instantiation of a linearised process: the arguments of the
    /// invocation become the initial assignments.
    pub(crate) fn name_composition(&mut self, tp: &mut TermPool, proc_id: &ATerm, arguments: &ATerm, ips: Ips) -> Ips {
        let parameters = self.process_parameters(proc_id);
        let arguments = list_elements(arguments);
        let substitution: Vec<(ATerm, ATerm)> = parameters
            .iter()
            .cloned()
            .zip(arguments.iter().cloned())
            .collect();

        let init_term = tp.list(&ips.init);
        let init = substitution::substitute_assignments(
            tp,
            &substitution,
            &init_term,
            &ips.parameters,
            false,
            true,
        );

        Ips {
            init: list_elements(&init),
            parameters: ips.parameters,
            summands: ips.summands,
        }
    }

    /// The symbolic upper bound on the time until which a summand set can
    /// idle: for each summand with sum variables v, condition c and time t
    /// the clause "exists v. c && T <= t"; an untimed summand makes the
    /// condition degenerate to true.
    pub(crate) fn ultimate_delay_condition(
        &mut self,
        tp: &mut TermPool,
        summands: &[ATerm],
        free_variables: &[ATerm],
        time_variable: &ATerm,
    ) -> ATerm {
        let mut result = data::false_term(tp);

        for summand in summands {
            let time = lps::summand_time(summand);
            if data::is_nil(&time) {
                return data::true_term(tp);
            }

            let sum_vars: Vec<ATerm> = lps::summand_variables(summand).iter().collect();
            let condition = lps::summand_condition(summand);
            let clause = self.single_ultimate_delay_condition(
                tp,
                &sum_vars,
                free_variables,
                &condition,
                time_variable,
                &time,
            );
            result = data::or(tp, &result, &clause);
        }
        result
    }

    /// One clause of the ultimate-delay condition. The existential
    /// quantification over the sum variables is realised by declaring a
    /// fresh predicate with an equation binding it to the body.
    fn single_ultimate_delay_condition(
        &mut self,
        tp: &mut TermPool,
        sum_vars: &[ATerm],
        free_variables: &[ATerm],
        condition: &ATerm,
        time_variable: &ATerm,
        time: &ATerm,
    ) -> ATerm {
        let comparison = data::less_equal(tp, time_variable, time);
        let body = data::and(tp, condition, &comparison);
        let mut result = self.rewrite_term(tp, &body);

        let mut variables = vec![time_variable.clone()];
        for free in free_variables {
            if substitution::occurs_in_term(free, &result) {
                variables.push(free.clone());
            }
        }
        for free in self.proc_data_vars.clone() {
            if substitution::occurs_in_term(&free, &result) {
                variables.push(free);
            }
        }

        for (position, sum_var) in sum_vars.iter().enumerate() {
            if !substitution::occurs_in_term(sum_var, &result) {
                continue;
            }

            // exists sum_var. result, as a declared predicate applied to the
            // remaining variables.
            let mut extended: Vec<ATerm> = variables.clone();
            extended.extend(sum_vars[position + 1..].iter().cloned());
            extended.push(sum_var.clone());

            let bool_sort = sort::bool_sort(tp);
            let domain: Vec<ATerm> = extended.iter().map(|v| v.arg(1).clone()).collect();
            let function_sort = sort::sort_arrow(tp, &domain, &bool_sort);
            let name = self.fresh.fresh_name(tp, "ExistsFun");
            let function = data::op_id(tp, &name, &function_sort);
            self.insert_mapping(&function)
                .expect("a fresh predicate cannot clash");

            self.declare_equation_variables(&extended);
            let lhs = data::apply(tp, &function, &extended);
            self.new_equation(tp, None, &lhs, &result);
            self.end_equation_section();

            let mut remaining: Vec<ATerm> = variables.clone();
            remaining.extend(sum_vars[position + 1..].iter().cloned());
            let application = data::apply(tp, &function, &remaining);
            result = data::exists(tp, &application);
        }

        result
    }

    /// The parallel composition of two linearised processes.
    pub(crate) fn parallel_composition(&mut self, tp: &mut TermPool, ips1: Ips, ips2: Ips) -> Ips {
        // Rename the parameters of the right operand apart from the left.
        let (renamed_parameters, renaming) =
            substitution::construct_renaming(tp, &mut self.fresh, &ips1.parameters, &ips2.parameters);

        let summands = self.combine_sum_lists(tp, &ips1, &ips2, &renamed_parameters, &renaming);

        log::debug!(
            "calculating parallel composition: {} || {} = {} summands",
            ips1.summands.len(),
            ips2.summands.len(),
            summands.len()
        );

        let init2_term = tp.list(&ips2.init);
        let init2 = substitution::substitute_assignments(
            tp,
            &renaming,
            &init2_term,
            &ips2.parameters,
            true,
            false,
        );

        let mut init = ips1.init;
        init.extend(list_elements(&init2));

        let mut parameters = ips1.parameters;
        parameters.extend(renamed_parameters);

        Ips {
            init,
            parameters,
            summands,
        }
    }

    fn combine_sum_lists(
        &mut self,
        tp: &mut TermPool,
        ips1: &Ips,
        ips2: &Ips,
        renamed_parameters: &[ATerm],
        renaming: &[(ATerm, ATerm)],
    ) -> Vec<ATerm> {
        let mut all_parameters = ips1.parameters.clone();
        all_parameters.extend(renamed_parameters.iter().cloned());

        let termination_action = self.termination_action();
        let mut result = Vec::new();

        let real_sort = sort::real_sort(tp);
        let time_variable = self.fresh.fresh_variable(tp, "timevar", &real_sort);
        self.insert_variable(&time_variable, true)
            .expect("a fresh time variable cannot clash");

        // The asynchronous summands of the left operand, delayed until the
        // right operand can no longer act earlier.
        let ultimate_delay = {
            let raw =
                self.ultimate_delay_condition(tp, &ips2.summands, &ips2.parameters, &time_variable);
            substitution::substitute_data(tp, renaming, &raw)
        };

        for summand in &ips1.summands {
            if lps::summand_multi_action(summand) == termination_action {
                continue;
            }

            let parts = self.rename_summand_apart(tp, summand, &all_parameters);
            let (sum_vars, condition, multi_action, time, next_state) = parts;

            let (condition, time, sum_vars) = self.add_ultimate_delay(
                tp,
                &ultimate_delay,
                condition,
                time,
                &time_variable,
                sum_vars,
            );

            let condition = self.rewrite_term(tp, &condition);
            if data::is_false(tp, &condition) {
                continue;
            }

            let variables = tp.list(&sum_vars);
            result.push(lps::summand(tp, &variables, &condition, &multi_action, &time, &next_state));
        }

        // The asynchronous summands of the right operand.
        let ultimate_delay =
            self.ultimate_delay_condition(tp, &ips1.summands, &ips1.parameters, &time_variable);

        for summand in &ips2.summands {
            if lps::summand_multi_action(summand) == termination_action {
                continue;
            }

            let parts = self.rename_summand_apart(tp, summand, &all_parameters);
            let (sum_vars, condition, multi_action, time, next_state) = parts;

            // Apply the parameter renaming of the right operand.
            let condition = substitution::substitute_data(tp, renaming, &condition);
            let multi_action = substitution::substitute_multi_action(tp, renaming, &multi_action);
            let time = substitution::substitute_time(tp, renaming, &time);
            let next_state = substitution::substitute_assignments(
                tp,
                renaming,
                &next_state,
                &ips2.parameters,
                true,
                true,
            );

            let (condition, time, sum_vars) = self.add_ultimate_delay(
                tp,
                &ultimate_delay,
                condition,
                time,
                &time_variable,
                sum_vars,
            );

            let condition = self.rewrite_term(tp, &condition);
            if data::is_false(tp, &condition) {
                continue;
            }

            let variables = tp.list(&sum_vars);
            result.push(lps::summand(tp, &variables, &condition, &multi_action, &time, &next_state));
        }

        // The synchronous summands: every pair whose termination status
        // agrees.
        for summand1 in &ips1.summands {
            let terminated1 = lps::summand_multi_action(summand1) == termination_action;

            let parts1 = self.rename_summand_apart(tp, summand1, &all_parameters);
            let (sum_vars1, condition1, multi_action1, time1, next_state1) = parts1;

            for summand2 in &ips2.summands {
                let terminated2 = lps::summand_multi_action(summand2) == termination_action;
                if terminated1 != terminated2 {
                    continue;
                }

                let mut blocked = all_parameters.clone();
                blocked.extend(sum_vars1.iter().cloned());
                let parts2 = self.rename_summand_apart(tp, summand2, &blocked);
                let (sum_vars2, condition2, multi_action2, time2, next_state2) = parts2;

                let condition2 = substitution::substitute_data(tp, renaming, &condition2);
                let multi_action2 = substitution::substitute_multi_action(tp, renaming, &multi_action2);
                let time2 = substitution::substitute_time(tp, renaming, &time2);
                let next_state2 = substitution::substitute_assignments(
                    tp,
                    renaming,
                    &next_state2,
                    &ips2.parameters,
                    true,
                    true,
                );

                let multi_action = if terminated1 && terminated2 {
                    termination_action.clone()
                } else {
                    process::merge_multi_actions(tp, &multi_action1, &multi_action2)
                };

                let mut condition = data::and(tp, &condition1, &condition2);

                let time = if data::is_nil(&time1) {
                    time2.clone()
                } else if data::is_nil(&time2) {
                    time1.clone()
                } else {
                    // Both are timed: they synchronise at the same moment.
                    let equal_times = data::equal(tp, &time1, &time2);
                    condition = data::and(tp, &condition, &equal_times);
                    time1.clone()
                };

                let condition = self.rewrite_term(tp, &condition);
                if data::is_false(tp, &condition) {
                    continue;
                }

                let mut sum_vars = sum_vars1.clone();
                sum_vars.extend(sum_vars2.iter().cloned());

                let next_state = if data::is_nil(&next_state1) {
                    next_state2.clone()
                } else if data::is_nil(&next_state2) {
                    next_state1.clone()
                } else {
                    tp.list_concat(&next_state1, &next_state2)
                };

                let variables = tp.list(&sum_vars);
                result.push(lps::summand(tp, &variables, &condition, &multi_action, &time, &next_state));
            }
        }

        result
    }

    /// Renames the sum variables of a summand apart from the given
    /// variables and returns its renamed constituents.
    fn rename_summand_apart(
        &mut self,
        tp: &mut TermPool,
        summand: &ATerm,
        taken: &[ATerm],
    ) -> (Vec<ATerm>, ATerm, ATerm, ATerm, ATerm) {
        let sum_vars: Vec<ATerm> = lps::summand_variables(summand).iter().collect();
        let (sum_vars, renaming) =
            substitution::construct_renaming(tp, &mut self.fresh, taken, &sum_vars);

        let condition = {
            let original = lps::summand_condition(summand);
            substitution::substitute_data(tp, &renaming, &original)
        };
        let multi_action = {
            let original = lps::summand_multi_action(summand);
            substitution::substitute_multi_action(tp, &renaming, &original)
        };
        let time = {
            let original = lps::summand_time(summand);
            substitution::substitute_time(tp, &renaming, &original)
        };
        let next_state = {
            let original = lps::summand_next_state(summand);
            if data::is_nil(&original) {
                original
            } else {
                // Only the right hand sides mention sum variables.
                substitute_assignment_rhs(tp, &renaming, &original)
            }
        };

        (sum_vars, condition, multi_action, time, next_state)
    }

    /// Constrains an asynchronous summand by the other side's ultimate
    /// delay: an untimed summand gets the fresh time variable as its stamp,
    /// a timed one substitutes its own stamp into the delay condition.
    fn add_ultimate_delay(
        &mut self,
        tp: &mut TermPool,
        ultimate_delay: &ATerm,
        condition: ATerm,
        time: ATerm,
        time_variable: &ATerm,
        mut sum_vars: Vec<ATerm>,
    ) -> (ATerm, ATerm, Vec<ATerm>) {
        if data::is_true(tp, ultimate_delay) {
            return (condition, time, sum_vars);
        }

        if data::is_nil(&time) {
            let condition = data::and(tp, ultimate_delay, &condition);
            sum_vars.insert(0, time_variable.clone());
            return (condition, time_variable.clone(), sum_vars);
        }

        let binding = [(time_variable.clone(), time.clone())];
        let instantiated = substitution::substitute_data(tp, &binding, ultimate_delay);
        let condition = data::and(tp, &instantiated, &condition);
        (condition, time, sum_vars)
    }
}

/// Applies a substitution to the right hand sides of an assignment list
/// without consulting the parameter list; used for sum-variable renamings,
/// which never touch the left hand sides.
pub(crate) fn substitute_assignment_rhs(
    tp: &mut TermPool,
    substitution: &[(ATerm, ATerm)],
    assignments: &ATerm,
) -> ATerm {
    if substitution.is_empty() {
        return assignments.clone();
    }

    let result: Vec<ATerm> = list_elements(assignments)
        .iter()
        .map(|assignment| {
            let parameter = lps::assignment_parameter(assignment);
            let expression = lps::assignment_expression(assignment);
            let substituted = substitution::substitute_data(tp, substitution, &expression);
            lps::assignment(tp, &parameter, &substituted)
        })
        .collect();
    tp.list(&result)
}
