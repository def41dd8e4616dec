//! Greibach normal form. Every pCRL body becomes a choice of guarded,
//! summed, action-prefixed continuations: first actions are brought to the
//! head of every branch, then head invocations of other pCRL processes are
//! inlined until every branch starts with a multi-action.

use mcrl2rust_aterm::{ATerm, TermPool};
use mcrl2rust_mcrl2::{data, process, substitution};

use crate::context::{list_elements, Lineariser, ObjectKind, ProcessStatus};
use crate::LinError;

/// How much structure is still allowed above the current position while
/// bringing a body to variable-head form. The states are ordered: a
/// construct is kept in place iff its state is at least the current one.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum GnfState {
    Alt,
    Sum,
    Seq,
    Name,
    MultiAction,
}

/// Whether the position can start the process body or is behind an action.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum VarPosition {
    First,
    Later,
}

impl Lineariser {
    /// Brings the bodies of the given pCRL processes to variable-head form:
    /// actions at the head, process invocations behind them.
    pub(crate) fn procs_to_var_head_gnf(
        &mut self,
        tp: &mut TermPool,
        pcrl_processes: &[ATerm],
    ) -> Result<(), LinError> {
        for proc_id in pcrl_processes {
            let index = self.object_index(proc_id);
            let body = self.process_body(proc_id);
            let parameters = self.object(index).parameters.clone();
            let result =
                self.body_to_var_head_gnf(tp, &body, GnfState::Alt, &parameters, VarPosition::First)?;
            self.object_mut(index).body = Some(result);
        }
        Ok(())
    }

    fn to_process(&mut self, tp: &mut TermPool, free_variables: &[ATerm], body: &ATerm) -> Result<ATerm, LinError> {
        let body = self.body_to_var_head_gnf(tp, body, GnfState::Alt, free_variables, VarPosition::First)?;
        let can_terminate = self.can_terminate_body(&body);
        let proc_id = self.new_process(tp, free_variables, &body, ProcessStatus::Pcrl, can_terminate);
        let parameters = self.process_parameters(&proc_id);
        Ok(process::process_instance(tp, &proc_id, &parameters))
    }

    pub(crate) fn body_to_var_head_gnf(
        &mut self,
        tp: &mut TermPool,
        body: &ATerm,
        state: GnfState,
        free_variables: &[ATerm],
        position: VarPosition,
    ) -> Result<ATerm, LinError> {
        if process::is_choice(body) {
            if GnfState::Alt >= state {
                let lhs = self.body_to_var_head_gnf(tp, &body.arg(0).clone(), GnfState::Alt, free_variables, VarPosition::First)?;
                let rhs = self.body_to_var_head_gnf(tp, &body.arg(1).clone(), GnfState::Alt, free_variables, VarPosition::First)?;
                return Ok(process::choice(tp, &lhs, &rhs));
            }
            return self.to_process(tp, free_variables, body);
        }

        if process::is_sum(body) {
            if GnfState::Sum >= state {
                let sum_vars = list_elements(&body.arg(0).clone());
                let (sum_vars, renaming) =
                    substitution::alpha_convert(tp, &mut self.fresh, &sum_vars, free_variables, &[]);
                let body1 =
                    substitution::substitute_pcrl_proc(tp, &mut self.fresh, &renaming, &body.arg(1).clone());

                let mut extended = sum_vars.clone();
                extended.extend(free_variables.iter().cloned());
                let body1 = self.body_to_var_head_gnf(tp, &body1, GnfState::Sum, &extended, VarPosition::First)?;

                // The optimisation below can deliver a choice of the form
                // c -> x <> !c -> y; the sum variables must then be
                // distributed over both summands.
                if process::is_choice(&body1) {
                    let lhs = process::sum(tp, &sum_vars, &body1.arg(0).clone());
                    let rhs = process::sum(tp, &sum_vars, &body1.arg(1).clone());
                    return Ok(process::choice(tp, &lhs, &rhs));
                }
                return Ok(process::sum(tp, &sum_vars, &body1));
            }
            return self.to_process(tp, free_variables, body);
        }

        if process::is_cond(body) {
            let condition = body.arg(0).clone();
            let then = body.arg(1).clone();
            let otherwise = body.arg(2).clone();

            if state <= GnfState::Sum && (process::is_delta(&then) || process::is_delta(&otherwise)) {
                if process::is_delta(&otherwise) {
                    let then = self.body_to_var_head_gnf(tp, &then, GnfState::Seq, free_variables, VarPosition::First)?;
                    let delta = process::delta(tp);
                    return Ok(process::cond(tp, &condition, &then, &delta));
                }
                let negated = data::not(tp, &condition);
                let otherwise = self.body_to_var_head_gnf(tp, &otherwise, GnfState::Seq, free_variables, VarPosition::First)?;
                let delta = process::delta(tp);
                return Ok(process::cond(tp, &negated, &otherwise, &delta));
            }

            if state == GnfState::Alt {
                let then = self.body_to_var_head_gnf(tp, &then, GnfState::Seq, free_variables, VarPosition::First)?;
                let otherwise =
                    self.body_to_var_head_gnf(tp, &otherwise, GnfState::Seq, free_variables, VarPosition::First)?;
                let negated = data::not(tp, &condition);
                let delta = process::delta(tp);
                let lhs = process::cond(tp, &condition, &then, &delta);
                let rhs = process::cond(tp, &negated, &otherwise, &delta);
                return Ok(process::choice(tp, &lhs, &rhs));
            }
            return self.to_process(tp, free_variables, body);
        }

        if process::is_seq(body) {
            let first = body.arg(0).clone();
            let second = body.arg(1).clone();

            if state <= GnfState::Seq {
                let first = self.body_to_var_head_gnf(tp, &first, GnfState::Name, free_variables, position)?;

                if process::is_cond(&second) && state <= GnfState::Sum {
                    // A body of the form a . (c -> x <> y) is rewritten to
                    // c -> a . x <> !c -> a . y. The duplication of the
                    // action reduces the number of states in the generated
                    // state space.
                    let condition = second.arg(0).clone();
                    let then =
                        self.body_to_var_head_gnf(tp, &second.arg(1).clone(), GnfState::Seq, free_variables, VarPosition::Later)?;
                    let otherwise =
                        self.body_to_var_head_gnf(tp, &second.arg(2).clone(), GnfState::Seq, free_variables, VarPosition::Later)?;

                    let negated = data::not(tp, &condition);
                    let delta = process::delta(tp);
                    let then_seq = process::seq(tp, &first, &then);
                    let otherwise_seq = process::seq(tp, &first, &otherwise);
                    let lhs = process::cond(tp, &condition, &then_seq, &delta);
                    let rhs = process::cond(tp, &negated, &otherwise_seq, &delta);
                    return Ok(process::choice(tp, &lhs, &rhs));
                }

                let second = self.body_to_var_head_gnf(tp, &second, GnfState::Seq, free_variables, VarPosition::Later)?;
                return Ok(process::seq(tp, &first, &second));
            }
            return self.to_process(tp, free_variables, body);
        }

        if process::is_action(body) {
            let multi_action = process::multi_action(tp, &[body.clone()]);
            if state == GnfState::MultiAction || position == VarPosition::First {
                return Ok(multi_action);
            }
            return Ok(self.multi_action_process(tp, &multi_action));
        }

        if process::is_multi_action(body) {
            if state == GnfState::MultiAction || position == VarPosition::First {
                return Ok(body.clone());
            }
            return Ok(self.multi_action_process(tp, body));
        }

        if process::is_sync(body) {
            let lhs = self.body_to_var_head_gnf(tp, &body.arg(0).clone(), GnfState::MultiAction, free_variables, position)?;
            let rhs = self.body_to_var_head_gnf(tp, &body.arg(1).clone(), GnfState::MultiAction, free_variables, position)?;
            let multi_action = process::merge_multi_actions(tp, &lhs, &rhs);

            if state == GnfState::MultiAction || position == VarPosition::First {
                return Ok(multi_action);
            }
            return Ok(self.multi_action_process(tp, &multi_action));
        }

        if process::is_at_time(body) {
            let inner = self.body_to_var_head_gnf(tp, &body.arg(0).clone(), state, free_variables, VarPosition::First)?;
            let time = body.arg(1).clone();
            let wrapped = self.wrap_time(tp, &inner, &time, free_variables);
            if position == VarPosition::First {
                return Ok(wrapped);
            }

            let can_terminate = self.can_terminate_body(&wrapped);
            let proc_id = self.new_process(tp, free_variables, &wrapped, ProcessStatus::Pcrl, can_terminate);
            let parameters = self.process_parameters(&proc_id);
            return Ok(process::process_instance(tp, &proc_id, &parameters));
        }

        if process::is_process(body) {
            return Ok(body.clone());
        }

        if process::is_tau(body) {
            if position == VarPosition::First {
                return Ok(process::tau_multi_action(tp));
            }
            if self.tau_process.is_none() {
                let tau = process::tau_multi_action(tp);
                let tau_process = self.new_process(tp, &[], &tau, ProcessStatus::Pcrl, true);
                self.tau_process = Some(tau_process);
            }
            let tau_process = self.tau_process.clone().expect("just created");
            return Ok(process::process_instance(tp, &tau_process, &[]));
        }

        if process::is_delta(body) {
            if position == VarPosition::First {
                return Ok(body.clone());
            }
            if self.delta_process.is_none() {
                let delta = process::delta(tp);
                let delta_process = self.new_process(tp, &[], &delta, ProcessStatus::Pcrl, false);
                self.delta_process = Some(delta_process);
            }
            let delta_process = self.delta_process.clone().expect("just created");
            return Ok(process::process_instance(tp, &delta_process, &[]));
        }

        Err(LinError::Syntactic(format!(
            "unexpected process format in the head normalisation of {body}"
        )))
    }

    /// The invocation of the process representing the given multi-action.
    /// Multi-actions with the same action labels share one such process,
    /// interned by the sequence of action identifiers.
    fn multi_action_process(&mut self, tp: &mut TermPool, multi_action: &ATerm) -> ATerm {
        let actions: Vec<ATerm> = process::multi_action_list(multi_action).iter().collect();
        let labels: Vec<ATerm> = actions.iter().map(|action| action.arg(0).clone()).collect();
        let key = tp.list(&labels);

        let (index, is_new) = self.add_object(&key);
        if is_new {
            // A formal parameter per action argument.
            let mut parameters = Vec::new();
            for label in &labels {
                for argument_sort in list_elements(&label.arg(1).clone()) {
                    parameters.push(self.fresh.fresh_variable(tp, "a", &argument_sort));
                }
            }

            let mut formal_actions = Vec::new();
            let mut remaining = parameters.as_slice();
            for label in &labels {
                let arity = list_elements(&label.arg(1).clone()).len();
                let (arguments, rest) = remaining.split_at(arity);
                formal_actions.push(process::action(tp, label, arguments));
                remaining = rest;
            }
            let formal_multi_action = process::multi_action(tp, &formal_actions);

            let object = self.object_mut(index);
            object.kind = ObjectKind::MultiAction;
            object.parameters = parameters;
            object.body = Some(formal_multi_action);
        }

        if self.object(index).target.is_none() {
            let parameters = self.object(index).parameters.clone();
            let formal_multi_action = self.object(index).body.clone().expect("a stored multi-action");
            let target = self.new_process(tp, &parameters, &formal_multi_action, ProcessStatus::Gnf, true);
            self.object_mut(index).target = Some(target);
        }

        let target = self.object(index).target.clone().expect("just created");
        let arguments: Vec<ATerm> = actions
            .iter()
            .flat_map(|action| list_elements(&action.arg(1).clone()))
            .collect();
        process::process_instance(tp, &target, &arguments)
    }

    /// Puts the time stamp on the first action or invocation of each branch.
    fn wrap_time(&mut self, tp: &mut TermPool, body: &ATerm, time: &ATerm, free_variables: &[ATerm]) -> ATerm {
        if process::is_choice(body) {
            let lhs = self.wrap_time(tp, &body.arg(0).clone(), time, free_variables);
            let rhs = self.wrap_time(tp, &body.arg(1).clone(), time, free_variables);
            return process::choice(tp, &lhs, &rhs);
        }

        if process::is_sum(body) {
            let sum_vars = list_elements(&body.arg(0).clone());
            let (sum_vars, renaming) =
                substitution::alpha_convert(tp, &mut self.fresh, &sum_vars, free_variables, &[]);
            let body1 = substitution::substitute_pcrl_proc(tp, &mut self.fresh, &renaming, &body.arg(1).clone());
            let time = substitution::substitute_data(tp, &renaming, time);

            let mut extended = sum_vars.clone();
            extended.extend(free_variables.iter().cloned());
            let body1 = self.wrap_time(tp, &body1, &time, &extended);
            return process::sum(tp, &sum_vars, &body1);
        }

        if process::is_cond(body) {
            let then = self.wrap_time(tp, &body.arg(1).clone(), time, free_variables);
            let delta = process::delta(tp);
            return process::cond(tp, &body.arg(0).clone(), &then, &delta);
        }

        if process::is_seq(body) {
            let first = self.wrap_time(tp, &body.arg(0).clone(), time, free_variables);
            return process::seq(tp, &first, &body.arg(1).clone());
        }

        if process::is_at_time(body) {
            // Already timed: keep the inner time by making the body a
            // process of its own, timed from the outside.
            let can_terminate = self.can_terminate_body(body);
            let proc_id = self.new_process(tp, free_variables, body, ProcessStatus::Pcrl, can_terminate);
            let parameters = self.process_parameters(&proc_id);
            let invocation = process::process_instance(tp, &proc_id, &parameters);
            return process::at_time(tp, &invocation, time);
        }

        if process::is_process(body) || process::is_multi_action(body) || process::is_delta(body) {
            return process::at_time(tp, body, time);
        }

        panic!("expected a pCRL process in wrap_time, found {body}");
    }

    /* ------------------- towards real Greibach form --------------------- */

    /// Appends a continuation behind every branch of a head-normalised body.
    fn put_behind(&mut self, tp: &mut TermPool, body1: &ATerm, body2: &ATerm) -> ATerm {
        if process::is_choice(body1) {
            let lhs = self.put_behind(tp, &body1.arg(0).clone(), body2);
            let rhs = self.put_behind(tp, &body1.arg(1).clone(), body2);
            return process::choice(tp, &lhs, &rhs);
        }

        if process::is_seq(body1) {
            let second = self.put_behind(tp, &body1.arg(1).clone(), body2);
            return process::seq(tp, &body1.arg(0).clone(), &second);
        }

        if process::is_cond(body1) {
            debug_assert!(process::is_delta(&body1.arg(2).clone()));
            let then = self.put_behind(tp, &body1.arg(1).clone(), body2);
            let delta = process::delta(tp);
            return process::cond(tp, &body1.arg(0).clone(), &then, &delta);
        }

        if process::is_sum(body1) {
            // Take care that no variables of body2 are inadvertently bound.
            let sum_vars = list_elements(&body1.arg(0).clone());
            let (sum_vars, renaming) =
                substitution::alpha_convert_process(tp, &mut self.fresh, &sum_vars, body2);
            let inner = substitution::substitute_pcrl_proc(tp, &mut self.fresh, &renaming, &body1.arg(1).clone());
            let inner = self.put_behind(tp, &inner, body2);
            return process::sum(tp, &sum_vars, &inner);
        }

        if process::is_multi_action(body1) || process::is_process(body1) || process::is_at_time(body1) {
            return process::seq(tp, body1, body2);
        }

        if process::is_delta(body1) {
            return body1.clone();
        }

        panic!("unexpected process format in put_behind: {body1}");
    }

    /// Distributes a condition over the branches of a head-normalised body.
    fn distribute_condition(&mut self, tp: &mut TermPool, body1: &ATerm, condition: &ATerm) -> ATerm {
        if process::is_choice(body1) {
            let lhs = self.distribute_condition(tp, &body1.arg(0).clone(), condition);
            let rhs = self.distribute_condition(tp, &body1.arg(1).clone(), condition);
            return process::choice(tp, &lhs, &rhs);
        }

        if process::is_cond(body1) {
            debug_assert!(process::is_delta(&body1.arg(2).clone()));
            let combined = data::and(tp, &body1.arg(0).clone(), condition);
            let delta = process::delta(tp);
            return process::cond(tp, &combined, &body1.arg(1).clone(), &delta);
        }

        if process::is_sum(body1) {
            // The condition must not mention the bound variables.
            let sum_vars = list_elements(&body1.arg(0).clone());
            let (sum_vars, renaming) = substitution::alpha_convert(
                tp,
                &mut self.fresh,
                &sum_vars,
                &[],
                std::slice::from_ref(condition),
            );
            let inner = substitution::substitute_pcrl_proc(tp, &mut self.fresh, &renaming, &body1.arg(1).clone());
            let inner = self.distribute_condition(tp, &inner, condition);
            return process::sum(tp, &sum_vars, &inner);
        }

        if process::is_seq(body1)
            || process::is_multi_action(body1)
            || process::is_process(body1)
            || process::is_tau(body1)
        {
            let delta = process::delta(tp);
            return process::cond(tp, condition, body1, &delta);
        }

        if process::is_delta(body1) {
            return body1.clone();
        }

        panic!("unexpected process format in distribute_condition: {body1}");
    }

    /// Distributes sum variables over the branches of a body.
    fn distribute_sum(&mut self, tp: &mut TermPool, sum_vars: &[ATerm], body1: &ATerm) -> ATerm {
        if process::is_choice(body1) {
            let lhs = self.distribute_sum(tp, sum_vars, &body1.arg(0).clone());
            let rhs = self.distribute_sum(tp, sum_vars, &body1.arg(1).clone());
            return process::choice(tp, &lhs, &rhs);
        }

        if process::is_seq(body1)
            || process::is_cond(body1)
            || process::is_multi_action(body1)
            || process::is_process(body1)
        {
            return process::sum(tp, sum_vars, body1);
        }

        if process::is_sum(body1) {
            let mut all = sum_vars.to_vec();
            all.extend(list_elements(&body1.arg(0).clone()));
            return process::sum(tp, &all, &body1.arg(1).clone());
        }

        if process::is_delta(body1) || process::is_tau(body1) {
            return body1.clone();
        }

        panic!("unexpected process format in distribute_sum: {body1}");
    }

    /// Distributes a time stamp over the branches of a body in real GNF. The
    /// time condition collects the equality between the outer and an inner
    /// time stamp.
    fn distribute_time(
        &mut self,
        tp: &mut TermPool,
        body: &ATerm,
        time: &ATerm,
        free_variables: &[ATerm],
        time_condition: &mut ATerm,
    ) -> ATerm {
        if process::is_choice(body) {
            let lhs = self.distribute_time(tp, &body.arg(0).clone(), time, free_variables, time_condition);
            let rhs = self.distribute_time(tp, &body.arg(1).clone(), time, free_variables, time_condition);
            return process::choice(tp, &lhs, &rhs);
        }

        if process::is_sum(body) {
            let sum_vars = list_elements(&body.arg(0).clone());
            let (sum_vars, renaming) =
                substitution::alpha_convert(tp, &mut self.fresh, &sum_vars, free_variables, &[]);
            let body1 = substitution::substitute_pcrl_proc(tp, &mut self.fresh, &renaming, &body.arg(1).clone());
            let time = substitution::substitute_data(tp, &renaming, time);

            let mut extended = sum_vars.clone();
            extended.extend(free_variables.iter().cloned());
            let body1 = self.distribute_time(tp, &body1, &time, &extended, time_condition);
            return process::sum(tp, &sum_vars, &body1);
        }

        if process::is_cond(body) {
            let mut inner_condition = data::true_term(tp);
            let then = self.distribute_time(tp, &body.arg(1).clone(), time, free_variables, &mut inner_condition);
            let combined = data::and(tp, &body.arg(0).clone(), &inner_condition);
            let delta = process::delta(tp);
            return process::cond(tp, &combined, &then, &delta);
        }

        if process::is_seq(body) {
            let first = self.distribute_time(tp, &body.arg(0).clone(), time, free_variables, time_condition);
            return process::seq(tp, &first, &body.arg(1).clone());
        }

        if process::is_at_time(body) {
            *time_condition = data::equal(tp, time, &body.arg(1).clone());
            return body.clone();
        }

        if process::is_multi_action(body) || process::is_delta(body) {
            return process::at_time(tp, body, time);
        }

        panic!("expected a pCRL process in distribute_time, found {body}");
    }

    /// Transforms all processes reachable from the given one to real
    /// Greibach normal form by substituting for head invocations.
    pub(crate) fn procs_to_real_gnf(&mut self, tp: &mut TermPool, initial: &ATerm) -> Result<(), LinError> {
        let mut todo = vec![initial.clone()];
        while let Some(proc_id) = todo.pop() {
            self.proc_to_real_gnf_rec(tp, &proc_id, VarPosition::First, &mut todo)?;
        }
        Ok(())
    }

    fn proc_to_real_gnf_rec(
        &mut self,
        tp: &mut TermPool,
        proc_id: &ATerm,
        position: VarPosition,
        todo: &mut Vec<ATerm>,
    ) -> Result<(), LinError> {
        let index = self.object_index(proc_id);
        let status = self.object(index).status;

        match status {
            ProcessStatus::Pcrl => {
                self.object_mut(index).status = ProcessStatus::GnfBusy;
                let body = self.process_body(proc_id);
                let parameters = self.object(index).parameters.clone();
                let result =
                    self.proc_to_real_gnf_body(tp, &body, VarPosition::First, todo, ProcessStatus::Pcrl, &parameters)?;

                let object = self.object_mut(index);
                debug_assert!(object.status == ProcessStatus::GnfBusy, "recursion went wrong");
                object.body = result;
                object.status = ProcessStatus::Gnf;
                Ok(())
            }
            ProcessStatus::Mcrl => {
                self.object_mut(index).status = ProcessStatus::McrlBusy;
                let body = self.process_body(proc_id);
                let parameters = self.object(index).parameters.clone();
                self.proc_to_real_gnf_body(tp, &body, VarPosition::First, todo, ProcessStatus::Mcrl, &parameters)?;
                self.object_mut(index).status = ProcessStatus::McrlDone;
                Ok(())
            }
            ProcessStatus::GnfBusy if position == VarPosition::First => Err(LinError::Syntactic(format!(
                "unguarded recursion in process {proc_id}"
            ))),
            ProcessStatus::GnfBusy
            | ProcessStatus::Gnf
            | ProcessStatus::McrlDone
            | ProcessStatus::MultiAction => Ok(()),
            ProcessStatus::McrlBusy => Err(LinError::Syntactic(
                "unguarded recursion without pCRL operators".to_string(),
            )),
            _ => panic!("strange process status {status:?} of {proc_id}"),
        }
    }

    /// Transforms a body to GNF with actions as head symbols; yields None
    /// when the body is not a pCRL process.
    fn proc_to_real_gnf_body(
        &mut self,
        tp: &mut TermPool,
        body: &ATerm,
        position: VarPosition,
        todo: &mut Vec<ATerm>,
        mode: ProcessStatus,
        free_variables: &[ATerm],
    ) -> Result<Option<ATerm>, LinError> {
        if process::is_at_time(body) {
            let inner = self
                .proc_to_real_gnf_body(tp, &body.arg(0).clone(), VarPosition::First, todo, mode, free_variables)?
                .expect("a timed body is a pCRL process");
            let mut time_condition = data::true_term(tp);
            let time = body.arg(1).clone();
            return Ok(Some(self.distribute_time(tp, &inner, &time, free_variables, &mut time_condition)));
        }

        if process::is_choice(body) {
            let lhs = self
                .proc_to_real_gnf_body(tp, &body.arg(0).clone(), VarPosition::First, todo, mode, free_variables)?
                .expect("a choice operand is a pCRL process");
            let rhs = self
                .proc_to_real_gnf_body(tp, &body.arg(1).clone(), VarPosition::First, todo, mode, free_variables)?
                .expect("a choice operand is a pCRL process");
            return Ok(Some(process::choice(tp, &lhs, &rhs)));
        }

        if process::is_seq(body) {
            let first = self
                .proc_to_real_gnf_body(tp, &body.arg(0).clone(), position, todo, mode, free_variables)?
                .expect("a sequence operand is a pCRL process");
            let second = self
                .proc_to_real_gnf_body(tp, &body.arg(1).clone(), VarPosition::Later, todo, mode, free_variables)?
                .expect("a sequence operand is a pCRL process");

            let mut result = self.put_behind(tp, &first, &second);
            if self.options.regular() && position == VarPosition::First {
                result = self.to_regular_form(tp, &result, todo, free_variables);
            }
            return Ok(Some(result));
        }

        if process::is_cond(body) {
            let inner = self
                .proc_to_real_gnf_body(tp, &body.arg(1).clone(), VarPosition::First, todo, mode, free_variables)?
                .expect("a conditional branch is a pCRL process");
            return Ok(Some(self.distribute_condition(tp, &inner, &body.arg(0).clone())));
        }

        if process::is_sum(body) {
            let sum_vars = list_elements(&body.arg(0).clone());
            let mut extended = sum_vars.clone();
            extended.extend(free_variables.iter().cloned());
            let inner = self
                .proc_to_real_gnf_body(tp, &body.arg(1).clone(), VarPosition::First, todo, mode, &extended)?
                .expect("a sum body is a pCRL process");
            return Ok(Some(self.distribute_sum(tp, &sum_vars, &inner)));
        }

        if process::is_multi_action(body) || process::is_delta(body) {
            return Ok(Some(body.clone()));
        }

        if process::is_process(body) {
            let proc_id = body.arg(0).clone();

            if position == VarPosition::Later {
                todo.push(proc_id);
                return Ok(Some(body.clone()));
            }

            let index = self.object_index(&proc_id);
            if self.object(index).status == ProcessStatus::Mcrl {
                todo.push(proc_id);
                return Ok(None);
            }

            // The invoked process is a pCRL process at the head position:
            // bring it to GNF and inline its body.
            self.proc_to_real_gnf_rec(tp, &proc_id, VarPosition::First, todo)?;

            let parameters = self.process_parameters(&proc_id);
            let arguments = list_elements(&body.arg(1).clone());
            debug_assert_eq!(parameters.len(), arguments.len(), "arity mismatch in {body}");

            let substitution: Vec<(ATerm, ATerm)> = parameters
                .iter()
                .cloned()
                .zip(arguments.iter().cloned())
                .collect();
            let inlined_body = self.process_body(&proc_id);
            let mut result =
                substitution::substitute_pcrl_proc(tp, &mut self.fresh, &substitution, &inlined_body);

            if self.options.regular() {
                result = self.to_regular_form(tp, &result, todo, free_variables);
            }
            return Ok(Some(result));
        }

        if process::is_merge(body) {
            self.proc_to_real_gnf_body(tp, &body.arg(0).clone(), VarPosition::Later, todo, mode, free_variables)?;
            self.proc_to_real_gnf_body(tp, &body.arg(1).clone(), VarPosition::Later, todo, mode, free_variables)?;
            return Ok(None);
        }

        if process::is_hide(body)
            || process::is_rename(body)
            || process::is_allow(body)
            || process::is_block(body)
            || process::is_comm(body)
        {
            self.proc_to_real_gnf_body(tp, &body.arg(1).clone(), VarPosition::Later, todo, mode, free_variables)?;
            return Ok(None);
        }

        Err(LinError::Syntactic(format!(
            "unexpected process format in the normal form transformation of {body}"
        )))
    }

    /* -------------------------- regular form ---------------------------- */

    /// Replaces every sequence of process references behind an action by a
    /// single process reference, so the continuation is expressible in one
    /// state parameter.
    fn to_regular_form(&mut self, tp: &mut TermPool, t: &ATerm, todo: &mut Vec<ATerm>, free_variables: &[ATerm]) -> ATerm {
        if process::is_choice(t) {
            let lhs = self.to_regular_form(tp, &t.arg(0).clone(), todo, free_variables);
            let rhs = self.to_regular_form(tp, &t.arg(1).clone(), todo, free_variables);
            return process::choice(tp, &lhs, &rhs);
        }

        if process::is_seq(t) {
            let first = t.arg(0).clone();
            debug_assert!(process::is_multi_action(&first) || process::is_at_time(&first));
            let continuation = self.create_regular_invocation(tp, &t.arg(1).clone(), todo, free_variables);
            return process::seq(tp, &first, &continuation);
        }

        if process::is_cond(t) {
            debug_assert!(process::is_delta(&t.arg(2).clone()));
            let then = self.to_regular_form(tp, &t.arg(1).clone(), todo, free_variables);
            let delta = process::delta(tp);
            return process::cond(tp, &t.arg(0).clone(), &then, &delta);
        }

        if process::is_sum(t) {
            let sum_vars = list_elements(&t.arg(0).clone());
            let mut extended = sum_vars.clone();
            extended.extend(free_variables.iter().cloned());
            let inner = self.to_regular_form(tp, &t.arg(1).clone(), todo, &extended);
            return process::sum(tp, &sum_vars, &inner);
        }

        if process::is_multi_action(t) || process::is_delta(t) || process::is_tau(t) || process::is_at_time(t) {
            return t.clone();
        }

        panic!("the regular form transformation expects GNF, found {t}");
    }

    /// The names of the processes of a sequence, cut off after the first
    /// process that cannot terminate.
    fn extract_names(&self, sequence: &ATerm) -> Vec<ATerm> {
        if process::is_process(sequence) {
            return vec![sequence.clone()];
        }

        if process::is_seq(sequence) {
            let first = sequence.arg(0).clone();
            if process::is_process(&first) {
                let index = self.object_index(&first.arg(0).clone());
                if self.object(index).can_terminate {
                    let mut result = vec![first];
                    result.extend(self.extract_names(&sequence.arg(1).clone()));
                    return result;
                }
                return vec![first];
            }
        }

        panic!("expected a sequence of process names: {sequence}");
    }

    /// Collects the parameters of a sequence of process references, renaming
    /// them apart, and builds the formal body invoking the sequence on those
    /// parameters. Used in regular2 mode.
    fn pars_collect(&mut self, tp: &mut TermPool, old_body: &ATerm) -> (Vec<ATerm>, ATerm) {
        if process::is_process(old_body) {
            let proc_id = old_body.arg(0).clone();
            let parameters = self.process_parameters(&proc_id);
            let new_body = process::process_instance(tp, &proc_id, &parameters);
            return (parameters, new_body);
        }

        if process::is_seq(old_body) {
            let first = old_body.arg(0).clone();
            if process::is_process(&first) {
                let proc_id = first.arg(0).clone();
                let (tail_parameters, tail_body) = self.pars_collect(tp, &old_body.arg(1).clone());

                let own_parameters = self.process_parameters(&proc_id);
                let (renamed, _) =
                    substitution::construct_renaming(tp, &mut self.fresh, &tail_parameters, &own_parameters);

                let invocation = process::process_instance(tp, &proc_id, &renamed);
                let new_body = process::seq(tp, &invocation, &tail_body);

                let mut parameters = renamed;
                parameters.extend(tail_parameters);
                return (parameters, new_body);
            }
        }

        panic!("expected a sequence of process names: {old_body}");
    }

    /// The actual arguments of a sequence of process references.
    fn args_collect(&self, t: &ATerm) -> Vec<ATerm> {
        if process::is_process(t) {
            return list_elements(&t.arg(1).clone());
        }

        if process::is_seq(t) {
            let first = t.arg(0).clone();
            debug_assert!(process::is_process(&first));
            let mut result = list_elements(&first.arg(1).clone());
            result.extend(self.args_collect(&t.arg(1).clone()));
            return result;
        }

        panic!("expected a sequence of process names: {t}");
    }

    /// Searches the synthesised processes for one that already represents
    /// this sequence.
    fn exists_process_for_sequence(&self, process_names: &[ATerm], process_body: &ATerm) -> Option<ATerm> {
        if self.options.regular2() {
            for candidate in &self.seq_process_names {
                let index = self.object_index(candidate);
                if let Some(represented) = &self.object(index).represented_processes {
                    // The names and types of the processes must match.
                    let matches = represented.len() == process_names.len()
                        && represented
                            .iter()
                            .zip(process_names)
                            .all(|(r, p)| r.arg(0) == p.arg(0));
                    if matches {
                        return Some(candidate.clone());
                    }
                }
            }
            return None;
        }

        for candidate in &self.seq_process_names {
            let index = self.object_index(candidate);
            if self.object(index).represented_process.as_ref() == Some(process_body) {
                return Some(candidate.clone());
            }
        }
        None
    }

    /// Replaces a sequence of process references by the invocation of a
    /// single process, creating that process when no equal sequence was
    /// interned before.
    fn create_regular_invocation(
        &mut self,
        tp: &mut TermPool,
        sequence: &ATerm,
        todo: &mut Vec<ATerm>,
        free_variables: &[ATerm],
    ) -> ATerm {
        let sequence = self.pcrl_rewrite(tp, sequence);
        let process_names = self.extract_names(&sequence);
        debug_assert!(!process_names.is_empty());

        if process_names.len() == 1 {
            if process::is_process(&sequence) {
                return sequence;
            }
            if process::is_seq(&sequence) {
                return sequence.arg(0).clone();
            }
            panic!("expected a sequence of process names: {sequence}");
        }

        let new_process = match self.exists_process_for_sequence(&process_names, &sequence) {
            Some(existing) => existing,
            None => {
                let new_process = if self.options.regular2() {
                    let (parameters, new_body) = self.pars_collect(tp, &sequence);
                    let can_terminate = self.can_terminate_body(&new_body);
                    let created = self.new_process(tp, &parameters, &new_body, ProcessStatus::Pcrl, can_terminate);
                    let index = self.object_index(&created);
                    self.object_mut(index).represented_processes = Some(process_names.clone());
                    created
                } else {
                    let can_terminate = self.can_terminate_body(&sequence);
                    let created =
                        self.new_process(tp, free_variables, &sequence, ProcessStatus::Pcrl, can_terminate);
                    let index = self.object_index(&created);
                    self.object_mut(index).represented_process = Some(sequence.clone());
                    created
                };
                self.seq_process_names.push(new_process.clone());
                todo.push(new_process.clone());
                new_process
            }
        };

        let arguments = if self.options.regular2() {
            self.args_collect(&sequence)
        } else {
            self.process_parameters(&new_process)
        };
        process::process_instance(tp, &new_process, &arguments)
    }

    /// Simplifies the data subexpressions of a body in GNF: conditions are
    /// rewritten, statically decided conditionals collapse and invocation
    /// arguments are normalised.
    pub(crate) fn pcrl_rewrite(&mut self, tp: &mut TermPool, t: &ATerm) -> ATerm {
        if self.options.norewrite {
            return t.clone();
        }

        if process::is_cond(t) {
            let condition = self.rewrite_term(tp, &t.arg(0).clone());
            if data::is_true(tp, &condition) {
                return self.pcrl_rewrite(tp, &t.arg(1).clone());
            }
            if data::is_false(tp, &condition) {
                return self.pcrl_rewrite(tp, &t.arg(2).clone());
            }
            let then = self.pcrl_rewrite(tp, &t.arg(1).clone());
            let otherwise = self.pcrl_rewrite(tp, &t.arg(2).clone());
            return process::cond(tp, &condition, &then, &otherwise);
        }

        if process::is_seq(t) {
            let first = self.pcrl_rewrite(tp, &t.arg(0).clone());
            let second = self.pcrl_rewrite(tp, &t.arg(1).clone());
            return process::seq(tp, &first, &second);
        }

        if process::is_at_time(t) {
            let time = self.rewrite_term(tp, &t.arg(1).clone());
            let inner = self.pcrl_rewrite(tp, &t.arg(0).clone());
            return process::at_time(tp, &inner, &time);
        }

        if process::is_process(t) {
            let arguments = self.rewrite_term_list(tp, &t.arg(1).clone());
            return process::process_instance_list(tp, &t.arg(0).clone(), &arguments);
        }

        if process::is_delta(t) || process::is_tau(t) || process::is_multi_action(t) || process::is_action(t) {
            return t.clone();
        }

        panic!("expected a pCRL term in pcrl_rewrite, found {t}");
    }
}
