//! Control-state encodings. In regular mode the continuation is a single
//! state parameter over an enumerated sort, a tuple of booleans or a
//! positive number. In stack mode a stack datatype is declared whose frames
//! hold the state and the data parameters; stack datatypes are cached per
//! parameter-sort list.

use mcrl2rust_aterm::{ATerm, TermPool};
use mcrl2rust_mcrl2::{data, process, sort};

use crate::context::{list_elements, Lineariser};
use crate::LinError;

/// A generated stack datatype, reusable for any process with the same
/// parameter sorts.
pub struct StackType {
    pub parameter_sorts: Vec<ATerm>,
    pub stack_sort: ATerm,
    pub push: ATerm,
    pub empty_stack: ATerm,
    pub is_empty: ATerm,
    pub pop: ATerm,
    pub get_state: ATerm,
    /// One projection per parameter position.
    pub getters: Vec<ATerm>,
}

/// The control state of one aggregated pCRL process: the collected data
/// parameters and the variable holding the state or the stack.
pub(crate) struct ControlStack {
    pub parameters: Vec<ATerm>,
    pub variable: ATerm,
    pub no_of_states: usize,
    /// The boolean state parameters of the binary encoding, least
    /// significant bit first.
    pub boolean_variables: Vec<ATerm>,
    /// The catalogue index of the stack datatype; absent in regular mode.
    pub operations: Option<usize>,
}

/// The number of bits needed to represent a state smaller than n.
pub(crate) fn upper_power_of_two(n: usize) -> usize {
    let mut bits = 0;
    let mut power = 1;
    while power < n {
        bits += 1;
        power *= 2;
    }
    bits
}

impl Lineariser {
    /// Builds the control state for the given aggregated parameters. In
    /// stack mode the stack datatype is declared, or reused when one with
    /// the same parameter sorts exists.
    pub(crate) fn new_control_stack(
        &mut self,
        tp: &mut TermPool,
        parameters: &[ATerm],
        pcrl_processes: &[ATerm],
    ) -> Result<ControlStack, LinError> {
        let no_of_states = pcrl_processes.len();

        let variable_name = if self.options.statenames {
            process::proc_id_name(&pcrl_processes[0]).to_string()
        } else {
            "s3".to_string()
        };

        let mut boolean_variables = Vec::new();
        if self.options.binary && !self.options.oldstate() {
            let bool_sort = sort::bool_sort(tp);
            for _ in 0..upper_power_of_two(no_of_states) {
                let variable = self.fresh.fresh_variable(tp, "bst", &bool_sort);
                self.insert_variable(&variable, true)?;
                boolean_variables.push(variable);
            }
        }

        if self.options.regular() {
            let variable = if self.options.oldstate() {
                let pos = sort::pos_sort(tp);
                self.fresh.fresh_variable(tp, &variable_name, &pos)
            } else {
                let type_index = self.create_enumerated_type(tp, no_of_states.max(1));
                let enum_sort = self.enum_types[type_index].sort_id.clone();
                self.fresh.fresh_variable(tp, &variable_name, &enum_sort)
            };
            self.insert_variable(&variable, true)?;

            return Ok(ControlStack {
                parameters: parameters.to_vec(),
                variable,
                no_of_states,
                boolean_variables,
                operations: None,
            });
        }

        // Stack mode. The state within a frame is a positive number; the
        // enumerated and binary encodings do not combine with stacks.
        if self.options.binary {
            return Err(LinError::Semantic(
                "cannot combine stacks with a binary state encoding".to_string(),
            ));
        }

        let operations = self.find_or_create_stack_type(tp, parameters)?;
        let stack_sort = self.stack_types[operations].stack_sort.clone();
        let variable = self.fresh.fresh_variable(tp, &variable_name, &stack_sort);
        self.insert_variable(&variable, true)?;

        Ok(ControlStack {
            parameters: parameters.to_vec(),
            variable,
            no_of_states,
            boolean_variables,
            operations: Some(operations),
        })
    }

    fn find_or_create_stack_type(&mut self, tp: &mut TermPool, parameters: &[ATerm]) -> Result<usize, LinError> {
        let parameter_sorts: Vec<ATerm> = parameters.iter().map(|p| p.arg(1).clone()).collect();

        if let Some(index) = self
            .stack_types
            .iter()
            .position(|stack| stack.parameter_sorts == parameter_sorts)
        {
            return Ok(index);
        }

        let sort_name = self.fresh.fresh_name(tp, "Stack");
        let stack_sort = sort::sort_id(tp, &sort_name);
        self.insert_sort(&stack_sort)?;

        let pos_sort = sort::pos_sort(tp);
        let bool_sort = sort::bool_sort(tp);

        // One projection per parameter.
        let mut getters = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            let getter_name = self.fresh.fresh_name(tp, &format!("get{}", data::name(parameter)));
            let getter_sort = sort::sort_arrow(tp, &[stack_sort.clone()], &parameter.arg(1).clone());
            let getter = data::op_id(tp, &getter_name, &getter_sort);
            self.insert_mapping(&getter)?;
            getters.push(getter);
        }

        // push : Pos x sorts x Stack -> Stack, emptystack : Stack.
        let mut push_domain = vec![pos_sort.clone()];
        push_domain.extend(parameter_sorts.iter().cloned());
        push_domain.push(stack_sort.clone());
        let push_sort = sort::sort_arrow(tp, &push_domain, &stack_sort);
        let push_name = self.fresh.fresh_name(tp, "push");
        let push = data::op_id(tp, &push_name, &push_sort);
        self.insert_constructor(&push)?;

        let empty_name = self.fresh.fresh_name(tp, "emptystack");
        let empty_stack = data::op_id(tp, &empty_name, &stack_sort);
        self.insert_constructor(&empty_stack)?;

        let is_empty_sort = sort::sort_arrow(tp, &[stack_sort.clone()], &bool_sort);
        let is_empty_name = self.fresh.fresh_name(tp, "isempty");
        let is_empty = data::op_id(tp, &is_empty_name, &is_empty_sort);
        self.insert_mapping(&is_empty)?;

        let pop_sort = sort::sort_arrow(tp, &[stack_sort.clone()], &stack_sort);
        let pop_name = self.fresh.fresh_name(tp, "pop");
        let pop = data::op_id(tp, &pop_name, &pop_sort);
        self.insert_mapping(&pop)?;

        let get_state_sort = sort::sort_arrow(tp, &[stack_sort.clone()], &pos_sort);
        let get_state_name = self.fresh.fresh_name(tp, "getstate");
        let get_state = data::op_id(tp, &get_state_name, &get_state_sort);
        self.insert_mapping(&get_state)?;

        // The defining equations over a fully pushed frame.
        let state_variable = self.fresh.fresh_variable(tp, "svr", &pos_sort);
        let mut frame_variables = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            frame_variables.push(self.fresh.fresh_variable(tp, "v", &parameter.arg(1).clone()));
        }
        let stack_variable = self.fresh.fresh_variable(tp, "svs", &stack_sort);

        let mut push_arguments = vec![state_variable.clone()];
        push_arguments.extend(frame_variables.iter().cloned());
        push_arguments.push(stack_variable.clone());
        let frame = data::apply(tp, &push, &push_arguments);

        let mut equation_variables = vec![state_variable.clone()];
        equation_variables.extend(frame_variables.iter().cloned());
        equation_variables.push(stack_variable.clone());

        self.declare_equation_variables(&equation_variables);
        let true_term = data::true_term(tp);
        let false_term = data::false_term(tp);

        let lhs = data::apply(tp, &is_empty, &[empty_stack.clone()]);
        self.new_equation(tp, None, &lhs, &true_term);
        let lhs = data::apply(tp, &is_empty, &[frame.clone()]);
        self.new_equation(tp, None, &lhs, &false_term);
        let lhs = data::apply(tp, &pop, &[frame.clone()]);
        self.new_equation(tp, None, &lhs, &stack_variable);
        let lhs = data::apply(tp, &get_state, &[frame.clone()]);
        self.new_equation(tp, None, &lhs, &state_variable);
        for (getter, frame_variable) in getters.iter().zip(&frame_variables) {
            let lhs = data::apply(tp, getter, &[frame.clone()]);
            self.new_equation(tp, None, &lhs, frame_variable);
        }
        self.end_equation_section();

        self.stack_types.push(StackType {
            parameter_sorts,
            stack_sort,
            push,
            empty_stack,
            is_empty,
            pop,
            get_state,
            getters,
        });
        Ok(self.stack_types.len() - 1)
    }

    /// The value of a variable reconstructed from the stack: parameters are
    /// projected out of the stack variable, free process data variables stay
    /// themselves.
    fn get_from_stack(&self, tp: &mut TermPool, variable: &ATerm, stack: &ControlStack) -> ATerm {
        if self.proc_data_vars.contains(variable) {
            return variable.clone();
        }

        let operations = &self.stack_types[stack.operations.expect("a stack datatype")];
        for (parameter, getter) in stack.parameters.iter().zip(&operations.getters) {
            if parameter == variable {
                return data::apply(tp, getter, &[stack.variable.clone()]);
            }
        }
        panic!("variable {variable} is not a parameter of the stack");
    }

    /// Replaces in a data expression every parameter that is not locally
    /// bound by its projection from the stack.
    pub(crate) fn adapt_term_to_stack(
        &self,
        tp: &mut TermPool,
        t: &ATerm,
        stack: &ControlStack,
        bound: &[ATerm],
    ) -> ATerm {
        if data::is_op_id(t) {
            return t.clone();
        }

        if data::is_variable(t) {
            if bound.contains(t) {
                return t.clone();
            }
            return self.get_from_stack(tp, t, stack);
        }

        debug_assert!(data::is_application(t), "expected a data expression, found {t}");
        let head = self.adapt_term_to_stack(tp, &t.arg(0).clone(), stack, bound);
        let arguments: Vec<ATerm> = list_elements(&t.arg(1).clone())
            .iter()
            .map(|argument| self.adapt_term_to_stack(tp, argument, stack, bound))
            .collect();
        data::apply(tp, &head, &arguments)
    }

    pub(crate) fn adapt_multi_action_to_stack(
        &self,
        tp: &mut TermPool,
        multi_action: &ATerm,
        stack: &ControlStack,
        bound: &[ATerm],
    ) -> ATerm {
        if process::is_delta(multi_action) {
            return multi_action.clone();
        }

        let actions: Vec<ATerm> = process::multi_action_list(multi_action)
            .iter()
            .map(|action| {
                let arguments: Vec<ATerm> = list_elements(&action.arg(1).clone())
                    .iter()
                    .map(|argument| self.adapt_term_to_stack(tp, argument, stack, bound))
                    .collect();
                process::action(tp, &action.arg(0).clone(), &arguments)
            })
            .collect();
        process::multi_action(tp, &actions)
    }

    /// Prepends the encoding of state i (counted from one) to the argument
    /// list.
    pub(crate) fn process_encoding(
        &mut self,
        tp: &mut TermPool,
        state: usize,
        mut arguments: Vec<ATerm>,
        stack: &ControlStack,
    ) -> Vec<ATerm> {
        if self.options.oldstate() || stack.operations.is_some() {
            let mut result = vec![data::pos_literal(tp, state as u64)];
            result.append(&mut arguments);
            return result;
        }

        if !self.options.binary {
            let type_index = self.create_enumerated_type(tp, stack.no_of_states.max(1));
            let mut result = vec![self.enum_element(type_index, state - 1)];
            result.append(&mut arguments);
            return result;
        }

        // Binary: a sequence of booleans representing state - 1, least
        // significant bit first.
        let mut bits = Vec::new();
        let mut value = state - 1;
        for _ in 0..upper_power_of_two(stack.no_of_states) {
            bits.push(if value % 2 == 0 {
                data::false_term(tp)
            } else {
                data::true_term(tp)
            });
            value /= 2;
        }
        bits.append(&mut arguments);
        bits
    }

    /// The condition selecting the summands of the given process: the state
    /// parameter, or its projection from the stack, equals the state value
    /// representing the process.
    pub(crate) fn correct_state_cond(
        &mut self,
        tp: &mut TermPool,
        proc_id: &ATerm,
        pcrl_processes: &[ATerm],
        stack: &ControlStack,
    ) -> ATerm {
        let state = pcrl_processes
            .iter()
            .position(|p| p == proc_id)
            .expect("the process is part of this cluster")
            + 1;

        if self.options.oldstate() || stack.operations.is_some() {
            let value = data::pos_literal(tp, state as u64);
            let current = match stack.operations {
                Some(index) => {
                    let get_state = self.stack_types[index].get_state.clone();
                    data::apply(tp, &get_state, &[stack.variable.clone()])
                }
                None => stack.variable.clone(),
            };
            return data::equal(tp, &current, &value);
        }

        if !self.options.binary {
            let type_index = self.create_enumerated_type(tp, stack.no_of_states.max(1));
            let value = self.enum_element(type_index, state - 1);
            return data::equal(tp, &stack.variable, &value);
        }

        // Binary encoding: a conjunction over the boolean state parameters.
        let mut result: Option<ATerm> = None;
        let mut value = state - 1;
        for variable in &stack.boolean_variables {
            let literal = if value % 2 == 0 {
                data::not(tp, variable)
            } else {
                variable.clone()
            };
            result = Some(match result {
                None => literal,
                Some(rest) => data::and(tp, &literal, &rest),
            });
            value /= 2;
        }
        debug_assert!(value == 0, "state does not fit in the boolean parameters");
        result.unwrap_or_else(|| data::true_term(tp))
    }

    /// The value of stack parameter `parameter` after invoking `proc_id`
    /// with `arguments`: the matching argument, or a don't-care value for a
    /// parameter the invoked process does not have.
    fn find_argument(
        &mut self,
        tp: &mut TermPool,
        parameter: &ATerm,
        invoked_parameters: &[ATerm],
        arguments: &[ATerm],
        stack: &ControlStack,
        bound: &[ATerm],
    ) -> ATerm {
        let result = match invoked_parameters.iter().position(|p| p == parameter) {
            Some(position) => arguments[position].clone(),
            None => {
                let parameter_sort = parameter.arg(1).clone();
                self.dummy_term(tp, &parameter_sort)
            }
        };

        if self.options.regular() {
            return result;
        }
        self.adapt_term_to_stack(tp, &result, stack, bound)
    }

    /// The argument list encoding the invocation of `proc_id`: a value per
    /// stack parameter followed by the continuation, with the state encoding
    /// prepended.
    #[allow(clippy::too_many_arguments)]
    fn push_invocation(
        &mut self,
        tp: &mut TermPool,
        proc_id: &ATerm,
        arguments: &[ATerm],
        continuation: Vec<ATerm>,
        stack: &ControlStack,
        pcrl_processes: &[ATerm],
        bound: &[ATerm],
        single_state: bool,
    ) -> Vec<ATerm> {
        let invoked_parameters = self.process_parameters(proc_id);

        let mut values = Vec::with_capacity(stack.parameters.len() + 1);
        let stack_parameters = stack.parameters.clone();
        for parameter in &stack_parameters {
            values.push(self.find_argument(tp, parameter, &invoked_parameters, arguments, stack, bound));
        }
        values.extend(continuation);

        let state = pcrl_processes
            .iter()
            .position(|p| p == proc_id)
            .expect("the invoked process is part of this cluster")
            + 1;

        if self.options.regular() {
            if single_state {
                return values;
            }
            return self.process_encoding(tp, state, values, stack);
        }

        let encoded = self.process_encoding(tp, state, values, stack);
        let push = self.stack_types[stack.operations.expect("a stack datatype")].push.clone();
        vec![data::apply(tp, &push, &encoded)]
    }

    /// Translates the continuation of a summand, a sequential composition
    /// of process references, to the next-state argument list.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn make_process_arguments(
        &mut self,
        tp: &mut TermPool,
        t: &ATerm,
        stack: &ControlStack,
        pcrl_processes: &[ATerm],
        bound: &[ATerm],
        single_state: bool,
    ) -> Result<Vec<ATerm>, LinError> {
        if process::is_seq(t) {
            if self.options.regular() {
                return Err(LinError::Syntactic(format!(
                    "the process is not regular, as it has stacking variables: {t}"
                )));
            }

            let invocation = t.arg(0).clone();
            debug_assert!(process::is_process(&invocation));
            let proc_id = invocation.arg(0).clone();
            let arguments = list_elements(&invocation.arg(1).clone());

            let continuation = if self.object(self.object_index(&proc_id)).can_terminate {
                self.make_process_arguments(tp, &t.arg(1).clone(), stack, pcrl_processes, bound, single_state)?
            } else {
                let empty = self.stack_types[stack.operations.expect("a stack datatype")]
                    .empty_stack
                    .clone();
                vec![empty]
            };

            return Ok(self.push_invocation(
                tp,
                &proc_id,
                &arguments,
                continuation,
                stack,
                pcrl_processes,
                bound,
                single_state,
            ));
        }

        if process::is_process(t) {
            let proc_id = t.arg(0).clone();
            let arguments = list_elements(&t.arg(1).clone());

            if self.options.regular() {
                return Ok(self.push_invocation(
                    tp,
                    &proc_id,
                    &arguments,
                    Vec::new(),
                    stack,
                    pcrl_processes,
                    bound,
                    single_state,
                ));
            }

            let operations = stack.operations.expect("a stack datatype");
            let continuation = if self.object(self.object_index(&proc_id)).can_terminate {
                let pop = self.stack_types[operations].pop.clone();
                vec![data::apply(tp, &pop, &[stack.variable.clone()])]
            } else {
                vec![self.stack_types[operations].empty_stack.clone()]
            };

            return Ok(self.push_invocation(
                tp,
                &proc_id,
                &arguments,
                continuation,
                stack,
                pcrl_processes,
                bound,
                single_state,
            ));
        }

        Err(LinError::Syntactic(format!(
            "expected a process reference or sequence, found {t}"
        )))
    }

    /// The initial state: values for the parameters the initial process
    /// binds, don't-care values for the rest, with the state encoding of the
    /// initial process prepended.
    pub(crate) fn make_initial_state(
        &mut self,
        tp: &mut TermPool,
        initial: &ATerm,
        stack: &ControlStack,
        pcrl_processes: &[ATerm],
        single_state: bool,
    ) -> Vec<ATerm> {
        let state = pcrl_processes
            .iter()
            .position(|p| p == initial)
            .expect("the initial process is part of this cluster")
            + 1;

        let initial_parameters = self.process_parameters(initial);
        let stack_parameters = stack.parameters.clone();
        let mut values = Vec::with_capacity(stack_parameters.len() + 1);
        for parameter in &stack_parameters {
            if initial_parameters
                .iter()
                .any(|p| p.arg(0) == parameter.arg(0))
            {
                values.push(parameter.clone());
            } else {
                // The value of this parameter is irrelevant in the initial
                // state.
                let parameter_sort = parameter.arg(1).clone();
                values.push(self.dummy_term(tp, &parameter_sort));
            }
        }

        if self.options.regular() {
            if single_state {
                return values;
            }
            return self.process_encoding(tp, state, values, stack);
        }

        let operations = stack.operations.expect("a stack datatype");
        let empty = self.stack_types[operations].empty_stack.clone();
        values.push(empty);
        let encoded = self.process_encoding(tp, state, values, stack);
        let push = self.stack_types[operations].push.clone();
        vec![data::apply(tp, &push, &encoded)]
    }

    /// The parameter list of the generated linear process: the state or
    /// stack variable followed by the data parameters.
    pub(crate) fn state_parameter_list(&self, stack: &ControlStack, single_state: bool) -> Vec<ATerm> {
        if stack.operations.is_some() {
            return vec![stack.variable.clone()];
        }

        if self.options.binary && !self.options.oldstate() {
            let mut result = stack.boolean_variables.clone();
            result.extend(stack.parameters.iter().cloned());
            return result;
        }

        if single_state {
            return stack.parameters.clone();
        }

        let mut result = vec![stack.variable.clone()];
        result.extend(stack.parameters.iter().cloned());
        result
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_upper_power_of_two() {
        assert_eq!(upper_power_of_two(1), 0);
        assert_eq!(upper_power_of_two(2), 1);
        assert_eq!(upper_power_of_two(3), 2);
        assert_eq!(upper_power_of_two(4), 2);
        assert_eq!(upper_power_of_two(5), 3);
    }
}
