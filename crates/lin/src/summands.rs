//! Summand extraction: each choice branch of a process body in Greibach
//! normal form yields one summand, guarded by the condition selecting the
//! state of its process. Summands that only differ in their condition are
//! merged.

use mcrl2rust_aterm::{ATerm, TermPool};
use mcrl2rust_mcrl2::{data, lps, process, substitution};

use crate::context::{list_elements, Lineariser};
use crate::stacks::ControlStack;
use crate::LinError;

impl Lineariser {
    /// Collects the summands of all processes of the aggregated cluster.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn collect_sum_list(
        &mut self,
        tp: &mut TermPool,
        pcrl_processes: &[ATerm],
        stack: &ControlStack,
        can_terminate: bool,
        single_state: bool,
    ) -> Result<Vec<ATerm>, LinError> {
        let mut summands = Vec::new();
        for proc_id in pcrl_processes {
            let body = self.process_body(proc_id);
            let index = self.object_index(proc_id);
            let process_terminates = can_terminate && self.object(index).can_terminate;
            self.collect_sum_list_term(
                tp,
                proc_id,
                &body,
                stack,
                process_terminates,
                single_state,
                pcrl_processes,
                &mut summands,
            )?;
        }
        Ok(summands)
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_sum_list_term(
        &mut self,
        tp: &mut TermPool,
        proc_id: &ATerm,
        body: &ATerm,
        stack: &ControlStack,
        can_terminate: bool,
        single_state: bool,
        pcrl_processes: &[ATerm],
        summands: &mut Vec<ATerm>,
    ) -> Result<(), LinError> {
        if process::is_choice(body) {
            self.collect_sum_list_term(
                tp,
                proc_id,
                &body.arg(0).clone(),
                stack,
                can_terminate,
                single_state,
                pcrl_processes,
                summands,
            )?;
            return self.collect_sum_list_term(
                tp,
                proc_id,
                &body.arg(1).clone(),
                stack,
                can_terminate,
                single_state,
                pcrl_processes,
                summands,
            );
        }

        self.add_summands(
            tp,
            proc_id,
            body,
            stack,
            can_terminate,
            single_state,
            pcrl_processes,
            summands,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn add_summands(
        &mut self,
        tp: &mut TermPool,
        proc_id: &ATerm,
        summand_term: &ATerm,
        stack: &ControlStack,
        can_terminate: bool,
        single_state: bool,
        pcrl_processes: &[ATerm],
        summands: &mut Vec<ATerm>,
    ) -> Result<(), LinError> {
        let regular = self.options.regular();

        // Strip the sum operators, collecting the sum variables.
        let mut summand_term = summand_term.clone();
        let mut sum_vars: Vec<ATerm> = Vec::new();
        while process::is_sum(&summand_term) {
            let mut vars = list_elements(&summand_term.arg(0).clone());
            vars.append(&mut sum_vars);
            sum_vars = vars;
            summand_term = summand_term.arg(1).clone();
        }

        // The condition starts with the state selector and accumulates the
        // stripped guards.
        let mut condition = if regular && single_state {
            data::true_term(tp)
        } else {
            self.correct_state_cond(tp, proc_id, pcrl_processes, stack)
        };

        while process::is_cond(&summand_term) {
            debug_assert!(process::is_delta(&summand_term.arg(2).clone()));
            let local = summand_term.arg(0).clone();
            if regular && single_state {
                condition = data::and(tp, &local, &condition);
            } else {
                let local = if regular {
                    local
                } else {
                    self.adapt_term_to_stack(tp, &local, stack, &sum_vars)
                };
                condition = data::and(tp, &condition, &local);
            }
            summand_term = summand_term.arg(1).clone();
        }

        if process::is_seq(&summand_term) {
            // One summand with a continuation.
            let mut first = summand_term.arg(0).clone();
            let continuation = summand_term.arg(1).clone();

            let mut time = data::nil(tp);
            if process::is_at_time(&first) {
                time = first.arg(1).clone();
                first = first.arg(0).clone();
            }

            let multi_action = if process::is_delta(&first) {
                first
            } else if process::is_tau(&first) {
                process::tau_multi_action(tp)
            } else if process::is_action(&first) {
                process::multi_action(tp, &[first])
            } else {
                first
            };

            let next_state = self.make_process_arguments(
                tp,
                &continuation,
                stack,
                pcrl_processes,
                &sum_vars,
                single_state,
            )?;

            let (multi_action, time) = if regular {
                (multi_action, time)
            } else {
                let adapted_action = self.adapt_multi_action_to_stack(tp, &multi_action, stack, &sum_vars);
                let adapted_time = if data::is_nil(&time) {
                    time
                } else {
                    self.adapt_term_to_stack(tp, &time, stack, &sum_vars)
                };
                (adapted_action, adapted_time)
            };

            let condition = self.rewrite_term(tp, &condition);
            self.insert_summand(tp, summands, &sum_vars, &condition, &multi_action, &time, Some(next_state));
            return Ok(());
        }

        // A single multi-action or deadlock, possibly timed.
        let mut time = data::nil(tp);
        if process::is_at_time(&summand_term) {
            time = summand_term.arg(1).clone();
            summand_term = summand_term.arg(0).clone();
        }

        let multi_action = if process::is_delta(&summand_term) {
            summand_term.clone()
        } else if process::is_tau(&summand_term) {
            process::tau_multi_action(tp)
        } else if process::is_action(&summand_term) {
            process::multi_action(tp, &[summand_term.clone()])
        } else if process::is_multi_action(&summand_term) {
            summand_term.clone()
        } else {
            return Err(LinError::Syntactic(format!(
                "expected a multi-action, found {summand_term}"
            )));
        };

        if regular {
            if !process::is_delta(&multi_action) {
                return Err(LinError::Syntactic(
                    "in regular mode terminating processes should no longer exist".to_string(),
                ));
            }
            let condition = self.rewrite_term(tp, &condition);
            let next_state = self.state_parameter_list(stack, single_state);
            self.insert_summand(tp, summands, &sum_vars, &condition, &multi_action, &time, Some(next_state));
            return Ok(());
        }

        // With a stack the process either continues with the popped frame or
        // terminates on an empty remainder.
        let operations = stack.operations.expect("a stack datatype in stack mode");
        let is_empty = self.stack_types[operations].is_empty.clone();
        let pop = self.stack_types[operations].pop.clone();

        let popped = data::apply(tp, &pop, &[stack.variable.clone()]);
        let empty_pop = data::apply(tp, &is_empty, &[popped.clone()]);

        let continue_condition = if can_terminate {
            let not_empty = data::not(tp, &empty_pop);
            data::and(tp, &not_empty, &condition)
        } else {
            condition.clone()
        };

        let multi_action = self.adapt_multi_action_to_stack(tp, &multi_action, stack, &sum_vars);
        let continue_condition = self.rewrite_term(tp, &continue_condition);
        self.insert_summand(
            tp,
            summands,
            &sum_vars,
            &continue_condition,
            &multi_action,
            &time,
            Some(vec![popped]),
        );

        if can_terminate {
            let terminate_condition = data::and(tp, &empty_pop, &condition);
            let terminate_condition = self.rewrite_term(tp, &terminate_condition);
            self.insert_summand(
                tp,
                summands,
                &sum_vars,
                &terminate_condition,
                &multi_action,
                &time,
                None,
            );
        }

        Ok(())
    }

    /// Inserts a new summand, first trying to merge it into a summand that
    /// is identical up to a renaming of the sum variables; the conditions
    /// are then joined by a disjunction. A next state of None marks a
    /// terminated summand.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn insert_summand(
        &mut self,
        tp: &mut TermPool,
        summands: &mut Vec<ATerm>,
        sum_vars: &[ATerm],
        condition: &ATerm,
        multi_action: &ATerm,
        time: &ATerm,
        next_state: Option<Vec<ATerm>>,
    ) {
        // A deadlock summand without a time stamp adds nothing.
        if process::is_delta(multi_action) && data::is_nil(time) {
            return;
        }

        let next_state_term = match &next_state {
            Some(arguments) => tp.list(arguments),
            None => data::nil(tp),
        };

        for position in 0..summands.len() {
            let existing = summands[position].clone();
            if !identical_action_ids(multi_action, &lps::summand_multi_action(&existing)) {
                continue;
            }

            let existing_vars: Vec<ATerm> = lps::summand_variables(&existing).iter().collect();
            let Some(renaming) = substitution::variables_equal(sum_vars, &existing_vars) else {
                continue;
            };

            let renamed_next = if data::is_nil(&next_state_term) {
                next_state_term.clone()
            } else {
                substitution::substitute_data_list(tp, &renaming, &next_state_term)
            };
            if renamed_next != lps::summand_next_state(&existing) {
                continue;
            }

            let renamed_time = substitution::substitute_time(tp, &renaming, time);
            if renamed_time != lps::summand_time(&existing) {
                continue;
            }

            let renamed_action = substitution::substitute_multi_action(tp, &renaming, multi_action);
            if renamed_action != lps::summand_multi_action(&existing) {
                continue;
            }

            let renamed_condition = substitution::substitute_data(tp, &renaming, condition);
            let joined = {
                let existing_condition = lps::summand_condition(&existing);
                data::or(tp, &existing_condition, &renamed_condition)
            };

            let variables = existing.arg(0).clone();
            let multi_action = lps::summand_multi_action(&existing);
            let time = lps::summand_time(&existing);
            let next_state = lps::summand_next_state(&existing);
            summands[position] = lps::summand(tp, &variables, &joined, &multi_action, &time, &next_state);
            return;
        }

        let variables = tp.list(sum_vars);
        let summand = lps::summand(tp, &variables, condition, multi_action, time, &next_state_term);
        summands.insert(0, summand);
    }
}

/// Whether two multi-actions carry the same action labels in the same
/// order; deadlock only matches deadlock.
pub(crate) fn identical_action_ids(ma1: &ATerm, ma2: &ATerm) -> bool {
    if process::is_delta(ma1) {
        return process::is_delta(ma2);
    }
    if process::is_delta(ma2) {
        return false;
    }

    let actions1: Vec<ATerm> = process::multi_action_list(ma1).iter().collect();
    let actions2: Vec<ATerm> = process::multi_action_list(ma2).iter().collect();
    actions1.len() == actions2.len()
        && actions1
            .iter()
            .zip(&actions2)
            .all(|(a1, a2)| a1.arg(0) == a2.arg(0))
}
