//! Sum elimination: a conjunct x == t (or t == x) with x a sum variable not
//! occurring in t fixes the value of x, so x is substituted away and dropped
//! from the sum variables.

use mcrl2rust_aterm::{ATerm, TermPool};
use mcrl2rust_mcrl2::{data, lps, substitution};

use crate::context::{list_elements, Lineariser};
use crate::parallel::substitute_assignment_rhs;

impl Lineariser {
    /// Conjoins a communication condition onto a summand, eliminating every
    /// equality conjunct that binds a sum variable. The remaining conjuncts
    /// are added to the summand condition.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn apply_sum_elimination(
        &mut self,
        tp: &mut TermPool,
        mut sum_vars: Vec<ATerm>,
        mut condition: ATerm,
        mut multi_action: ATerm,
        mut time: ATerm,
        mut next_state: ATerm,
        communication_condition: &ATerm,
        parameters: &[ATerm],
    ) -> (Vec<ATerm>, ATerm, ATerm, ATerm, ATerm) {
        // The communication condition is a conjunction; process it conjunct
        // by conjunct.
        let mut pending = vec![communication_condition.clone()];

        while let Some(conjunct) = pending.pop() {
            if data::is_true(tp, &conjunct) {
                continue;
            }

            if data::is_and(tp, &conjunct) {
                let (lhs, rhs) = data::binary_operands(&conjunct);
                pending.push(rhs);
                pending.push(lhs);
                continue;
            }

            if let Some((lhs, rhs)) = data::match_equality(&conjunct) {
                let (variable, value) = if data::is_variable(&rhs) && sum_vars.contains(&rhs) {
                    (rhs, lhs)
                } else {
                    (lhs, rhs)
                };

                if data::is_variable(&variable)
                    && sum_vars.contains(&variable)
                    && !substitution::occurs_in_term(&variable, &value)
                {
                    let binding = [(variable.clone(), value)];
                    sum_vars.retain(|v| *v != variable);
                    condition = substitution::substitute_data(tp, &binding, &condition);
                    multi_action = substitution::substitute_multi_action(tp, &binding, &multi_action);
                    time = substitution::substitute_time(tp, &binding, &time);
                    next_state = if data::is_nil(&next_state) {
                        next_state
                    } else {
                        substitution::substitute_assignments(
                            tp,
                            &binding,
                            &next_state,
                            parameters,
                            false,
                            true,
                        )
                    };
                    // The substitution also applies to the remaining
                    // conjuncts.
                    for remaining in &mut pending {
                        *remaining = substitution::substitute_data(tp, &binding, remaining);
                    }
                    continue;
                }
            }

            // Not an eliminating equality; the conjunct stays a condition.
            condition = data::and(tp, &condition, &conjunct);
        }

        (sum_vars, condition, multi_action, time, next_state)
    }

    /// Eliminates bindable sum variables from every conjunct of the
    /// summand's own condition, to a fixpoint. Applied to summands whose
    /// next state is an assignment list.
    pub(crate) fn sum_eliminate_summand(&mut self, tp: &mut TermPool, summand: &ATerm, parameters: &[ATerm]) -> ATerm {
        let mut sum_vars: Vec<ATerm> = lps::summand_variables(summand).iter().collect();
        let mut condition = lps::summand_condition(summand);
        let mut multi_action = lps::summand_multi_action(summand);
        let mut time = lps::summand_time(summand);
        let mut next_state = lps::summand_next_state(summand);

        loop {
            let Some((variable, value, remainder)) = find_binding(tp, &condition, &sum_vars) else {
                break;
            };

            let binding = [(variable.clone(), value)];
            sum_vars.retain(|v| *v != variable);
            condition = substitution::substitute_data(tp, &binding, &remainder);
            multi_action = substitution::substitute_multi_action(tp, &binding, &multi_action);
            time = substitution::substitute_time(tp, &binding, &time);
            next_state = if data::is_nil(&next_state) {
                next_state
            } else if assignments_aligned(&next_state, parameters) {
                substitution::substitute_assignments(tp, &binding, &next_state, parameters, false, true)
            } else {
                substitute_assignment_rhs(tp, &binding, &next_state)
            };
        }

        let condition = self.rewrite_term(tp, &condition);
        let variables = tp.list(&sum_vars);
        lps::summand(tp, &variables, &condition, &multi_action, &time, &next_state)
    }

    /// Applies sum elimination to every summand.
    pub(crate) fn sum_eliminate(&mut self, tp: &mut TermPool, summands: &[ATerm], parameters: &[ATerm]) -> Vec<ATerm> {
        summands
            .iter()
            .map(|summand| self.sum_eliminate_summand(tp, summand, parameters))
            .collect()
    }
}

/// Whether the assignment list mentions only the given parameters, in
/// parameter order.
fn assignments_aligned(assignments: &ATerm, parameters: &[ATerm]) -> bool {
    let mut position = 0;
    for assignment in list_elements(assignments) {
        let lhs = lps::assignment_parameter(&assignment);
        match parameters[position..].iter().position(|p| *p == lhs) {
            Some(offset) => position += offset + 1,
            None => return false,
        }
    }
    true
}

/// Searches the conjunction for an equality fixing a sum variable; returns
/// the variable, its value and the condition without that conjunct.
fn find_binding(tp: &mut TermPool, condition: &ATerm, sum_vars: &[ATerm]) -> Option<(ATerm, ATerm, ATerm)> {
    if data::is_and(tp, condition) {
        let (lhs, rhs) = data::binary_operands(condition);
        if let Some((variable, value, remainder)) = find_binding(tp, &lhs, sum_vars) {
            let rest = data::and(tp, &remainder, &rhs);
            return Some((variable, value, rest));
        }
        if let Some((variable, value, remainder)) = find_binding(tp, &rhs, sum_vars) {
            let rest = data::and(tp, &lhs, &remainder);
            return Some((variable, value, rest));
        }
        return None;
    }

    let (lhs, rhs) = data::match_equality(condition)?;

    let binds = |variable: &ATerm, value: &ATerm| {
        data::is_variable(variable)
            && sum_vars.contains(variable)
            && !substitution::occurs_in_term(variable, value)
    };

    if binds(&lhs, &rhs) {
        return Some((lhs, rhs, data::true_term(tp)));
    }
    if binds(&rhs, &lhs) {
        return Some((rhs, lhs, data::true_term(tp)));
    }
    None
}
