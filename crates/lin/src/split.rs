//! Splitting of mCRL and pCRL processes and insertion of the distinguished
//! termination action. Every pCRL process that can terminate is wrapped so
//! that its successful end performs the Terminate action; pCRL sub-bodies of
//! parallel contexts are lifted to fresh process identifiers.

use mcrl2rust_aterm::{ATerm, TermPool, TermTable};
use mcrl2rust_mcrl2::process;

use crate::context::{Lineariser, ProcessStatus};
use crate::LinError;

impl Lineariser {
    /// Declares the Terminate action and the process performing it. Must be
    /// called after the input is stored, so the fresh names cannot clash
    /// with input names.
    pub(crate) fn initialize_terminator(&mut self, tp: &mut TermPool) -> Result<(), LinError> {
        let name = self.fresh.fresh_name(tp, "Terminate");
        let act_id = process::act_id(tp, &name, &[]);
        let action = process::action(tp, &act_id, &[]);
        let termination_action = process::multi_action(tp, &[action]);

        let terminated_id = process::proc_var_id(tp, "Terminated**", &[]);
        let delta = process::delta(tp);
        let body = process::seq(tp, &termination_action, &delta);
        self.insert_process_declaration(&terminated_id, Vec::new(), body, ProcessStatus::Pcrl, false)?;

        self.termination_action = Some(termination_action);
        self.terminated_proc_id = Some(terminated_id);
        Ok(())
    }

    pub(crate) fn termination_action(&self) -> ATerm {
        self.termination_action.clone().expect("the terminator is initialised")
    }

    pub(crate) fn terminated_proc_id(&self) -> ATerm {
        self.terminated_proc_id.clone().expect("the terminator is initialised")
    }

    /// Splits the processes reachable from the given one and adds the
    /// termination action behind every body that can terminate. Returns the
    /// identifier of the rewritten process.
    pub(crate) fn split_processes(&mut self, tp: &mut TermPool, proc_id: &ATerm) -> ATerm {
        let mut visited = TermTable::new();
        self.split_process(tp, proc_id, &mut visited)
    }

    fn split_process(&mut self, tp: &mut TermPool, proc_id: &ATerm, visited: &mut TermTable) -> ATerm {
        if let Some(result) = visited.get(proc_id) {
            return result.clone();
        }

        let index = self.object_index(proc_id);
        let status = self.object(index).status;
        let can_terminate = self.object(index).can_terminate;

        if status != ProcessStatus::Mcrl && !can_terminate {
            // No new process needs to be constructed.
            return proc_id.clone();
        }

        let name = self.fresh.fresh_name(tp, process::proc_id_name(proc_id));
        let new_proc_id = process::proc_var_id_sorts(tp, &name, &proc_id.arg(1).clone());

        if status == ProcessStatus::Mcrl {
            visited.put(proc_id, &new_proc_id);
            let parameters = self.object(index).parameters.clone();
            let body = self.process_body(proc_id);
            let new_body = self.split_body(tp, &body, visited, &parameters);
            self.insert_process_declaration(
                &new_proc_id,
                parameters,
                new_body,
                ProcessStatus::Mcrl,
                false,
            )
            .expect("a fresh process name cannot clash");
            return new_proc_id;
        }

        if can_terminate {
            visited.put(proc_id, &new_proc_id);
            let parameters = self.object(index).parameters.clone();
            let body = self.process_body(proc_id);

            let terminated = self.terminated_proc_id();
            let invocation = process::process_instance(tp, &terminated, &[]);
            let new_body = process::seq(tp, &body, &invocation);
            let body_terminates = self.can_terminate_body(&body);

            self.insert_process_declaration(
                &new_proc_id,
                parameters,
                new_body,
                ProcessStatus::Pcrl,
                body_terminates,
            )
            .expect("a fresh process name cannot clash");
            return new_proc_id;
        }

        visited.put(proc_id, proc_id);
        proc_id.clone()
    }

    fn split_body(
        &mut self,
        tp: &mut TermPool,
        body: &ATerm,
        visited: &mut TermTable,
        parameters: &[ATerm],
    ) -> ATerm {
        if let Some(result) = visited.get(body) {
            return result.clone();
        }

        let result = if process::is_merge(body) {
            let lhs = self.split_body(tp, &body.arg(0).clone(), visited, parameters);
            let rhs = self.split_body(tp, &body.arg(1).clone(), visited, parameters);
            process::merge(tp, &lhs, &rhs)
        } else if process::is_process(body) {
            let proc_id = self.split_process(tp, &body.arg(0).clone(), visited);
            process::process_instance_list(tp, &proc_id, &body.arg(1).clone())
        } else if process::is_hide(body)
            || process::is_rename(body)
            || process::is_allow(body)
            || process::is_block(body)
            || process::is_comm(body)
        {
            let inner = self.split_body(tp, &body.arg(1).clone(), visited, parameters);
            let symbol = body.head_symbol().clone();
            let spec = body.arg(0).clone();
            tp.create(&symbol, &[spec, inner])
        } else if process::is_choice(body)
            || process::is_seq(body)
            || process::is_cond(body)
            || process::is_sum(body)
            || process::is_action(body)
            || process::is_delta(body)
            || process::is_tau(body)
            || process::is_at_time(body)
            || process::is_sync(body)
        {
            // A pCRL sub-body of an mCRL context is lifted into a process of
            // its own; the termination action is appended when it can
            // terminate.
            let lifted = if self.can_terminate_body(body) {
                let terminated = self.terminated_proc_id();
                let invocation = process::process_instance(tp, &terminated, &[]);
                let wrapped = process::seq(tp, body, &invocation);
                self.new_process(tp, parameters, &wrapped, ProcessStatus::Pcrl, false)
            } else {
                self.new_process(tp, parameters, body, ProcessStatus::Pcrl, false)
            };
            let lifted_parameters = self.process_parameters(&lifted);
            process::process_instance(tp, &lifted, &lifted_parameters)
        } else {
            panic!("unexpected process format in split_body: {body}");
        };

        visited.put(body, &result);
        result
    }

    /// Declares the Terminate action in the output iff it is performed by a
    /// summand of the final result.
    pub(crate) fn add_termination_action_if_necessary(&mut self, summands: &[ATerm]) {
        let termination_action = self.termination_action();
        for summand in summands {
            if mcrl2rust_mcrl2::lps::summand_multi_action(summand) == termination_action {
                let act_id = process::multi_action_list(&termination_action)
                    .iter()
                    .next()
                    .expect("the termination action is not empty")
                    .arg(0)
                    .clone();
                self.actions.push(act_id);
                return;
            }
        }
    }
}
