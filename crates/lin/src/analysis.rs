//! Classification of processes into the parallel (mCRL) and sequential
//! (pCRL) fragments, and the fixed-point analysis determining which
//! processes can terminate successfully.

use mcrl2rust_aterm::{ATerm, ATermIndexedSet};
use mcrl2rust_mcrl2::process;

use crate::context::{list_elements, Lineariser, ProcessStatus};
use crate::LinError;

impl Lineariser {
    /// Classifies every process reachable from the initial one and returns
    /// the pCRL processes encountered. Operators may only occur in the
    /// nesting the fragments allow; violations are syntactic errors.
    pub(crate) fn determine_process_status(
        &mut self,
        initial: &ATerm,
    ) -> Result<Vec<ATerm>, LinError> {
        let mut pcrl_processes = Vec::new();
        self.determine_status_rec(initial, ProcessStatus::Mcrl, &mut pcrl_processes)?;
        Ok(pcrl_processes)
    }

    fn determine_status_rec(
        &mut self,
        proc_id: &ATerm,
        status: ProcessStatus,
        pcrl_processes: &mut Vec<ATerm>,
    ) -> Result<(), LinError> {
        let index = self.object_index(proc_id);
        let current = self.object(index).status;

        match current {
            ProcessStatus::Unknown => {
                self.object_mut(index).status = status;
                if status == ProcessStatus::Pcrl {
                    if !pcrl_processes.contains(proc_id) {
                        pcrl_processes.push(proc_id.clone());
                    }
                    let body = self.process_body(proc_id);
                    self.determine_status_term(&body, ProcessStatus::Pcrl, pcrl_processes)?;
                    return Ok(());
                }

                // status is mCRL; the body decides whether the process is
                // a pCRL process after all.
                let body = self.process_body(proc_id);
                let body_status =
                    self.determine_status_term(&body, ProcessStatus::Mcrl, pcrl_processes)?;
                if body_status != status {
                    self.object_mut(index).status = body_status;
                    if !pcrl_processes.contains(proc_id) {
                        pcrl_processes.push(proc_id.clone());
                    }
                    self.determine_status_term(&body, ProcessStatus::Pcrl, pcrl_processes)?;
                }
            }
            ProcessStatus::Mcrl => {
                if status == ProcessStatus::Pcrl {
                    self.object_mut(index).status = ProcessStatus::Pcrl;
                    if !pcrl_processes.contains(proc_id) {
                        pcrl_processes.push(proc_id.clone());
                    }
                    let body = self.process_body(proc_id);
                    self.determine_status_term(&body, ProcessStatus::Pcrl, pcrl_processes)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Determines whether a process body belongs to the mCRL fragment, the
    /// pCRL fragment or is a multi-action. pCRL processes occur strictly
    /// within mCRL processes and multi-actions strictly within pCRL
    /// processes.
    fn determine_status_term(
        &mut self,
        body: &ATerm,
        status: ProcessStatus,
        pcrl_processes: &mut Vec<ATerm>,
    ) -> Result<ProcessStatus, LinError> {
        if process::is_choice(body) || process::is_seq(body) {
            let operator = if process::is_choice(body) { "choice" } else { "sequential" };
            if status == ProcessStatus::MultiAction {
                return Err(LinError::Syntactic(format!(
                    "the {operator} operator occurs in a multi-action in {body}"
                )));
            }
            let s1 = self.determine_status_term(&body.arg(0).clone(), ProcessStatus::Pcrl, pcrl_processes)?;
            let s2 = self.determine_status_term(&body.arg(1).clone(), ProcessStatus::Pcrl, pcrl_processes)?;
            if s1 == ProcessStatus::Mcrl || s2 == ProcessStatus::Mcrl {
                return Err(LinError::Syntactic(format!(
                    "mCRL operators occur within the scope of a {operator} operator in {body}"
                )));
            }
            return Ok(ProcessStatus::Pcrl);
        }

        if process::is_cond(body) {
            if status == ProcessStatus::MultiAction {
                return Err(LinError::Syntactic(format!(
                    "if-then-else occurs in a multi-action in {body}"
                )));
            }
            let s1 = self.determine_status_term(&body.arg(1).clone(), ProcessStatus::Pcrl, pcrl_processes)?;
            let s2 = self.determine_status_term(&body.arg(2).clone(), ProcessStatus::Pcrl, pcrl_processes)?;
            if s1 == ProcessStatus::Mcrl || s2 == ProcessStatus::Mcrl {
                return Err(LinError::Syntactic(format!(
                    "mCRL operators occur in the scope of the if-then-else operator in {body}"
                )));
            }
            return Ok(ProcessStatus::Pcrl);
        }

        if process::is_sum(body) {
            if status == ProcessStatus::MultiAction {
                return Err(LinError::Syntactic(format!(
                    "the sum operator occurs within a multi-action in {body}"
                )));
            }
            // Reserve the names of the sum variables, so they are not reused
            // for generated objects later on.
            let variables = list_elements(&body.arg(0).clone());
            self.insert_variables(&variables, false)?;

            let s1 = self.determine_status_term(&body.arg(1).clone(), ProcessStatus::Pcrl, pcrl_processes)?;
            if s1 == ProcessStatus::Mcrl {
                return Err(LinError::Syntactic(format!(
                    "mCRL operators occur in the scope of the sum operator in {body}"
                )));
            }
            return Ok(ProcessStatus::Pcrl);
        }

        if process::is_merge(body) {
            if status != ProcessStatus::Mcrl {
                return Err(LinError::Syntactic(format!(
                    "the parallel operator occurs in the scope of pCRL operators in {body}"
                )));
            }
            self.determine_status_term(&body.arg(0).clone(), ProcessStatus::Mcrl, pcrl_processes)?;
            self.determine_status_term(&body.arg(1).clone(), ProcessStatus::Mcrl, pcrl_processes)?;
            return Ok(ProcessStatus::Mcrl);
        }

        if process::is_left_merge(body) {
            return Err(LinError::Syntactic(
                "cannot linearise because the specification contains a leftmerge".to_string(),
            ));
        }

        if process::is_bounded_init(body) {
            return Err(LinError::Syntactic(
                "cannot linearise a specification with the bounded initialization operator"
                    .to_string(),
            ));
        }

        if process::is_hide(body)
            || process::is_rename(body)
            || process::is_allow(body)
            || process::is_block(body)
            || process::is_comm(body)
        {
            if status != ProcessStatus::Mcrl {
                return Err(LinError::Syntactic(format!(
                    "a {} operator occurs in the scope of pCRL operators in {body}",
                    body.head_symbol().name().to_lowercase()
                )));
            }
            self.determine_status_term(&body.arg(1).clone(), ProcessStatus::Mcrl, pcrl_processes)?;
            return Ok(ProcessStatus::Mcrl);
        }

        if process::is_at_time(body) {
            self.time_used = true;
            if status == ProcessStatus::MultiAction {
                return Err(LinError::Syntactic(format!(
                    "a time operator occurs in a multi-action in {body}"
                )));
            }
            let s1 = self.determine_status_term(&body.arg(0).clone(), ProcessStatus::Pcrl, pcrl_processes)?;
            if s1 == ProcessStatus::Mcrl {
                return Err(LinError::Syntactic(format!(
                    "an mCRL operator occurs in the scope of a time operator in {body}"
                )));
            }
            return Ok(ProcessStatus::Pcrl);
        }

        if process::is_sync(body) {
            let s1 = self.determine_status_term(&body.arg(0).clone(), ProcessStatus::Pcrl, pcrl_processes)?;
            let s2 = self.determine_status_term(&body.arg(1).clone(), ProcessStatus::Pcrl, pcrl_processes)?;
            if s1 != ProcessStatus::MultiAction || s2 != ProcessStatus::MultiAction {
                return Err(LinError::Syntactic(format!(
                    "other objects than multi-actions occur in the scope of a synch operator in {body}"
                )));
            }
            return Ok(ProcessStatus::MultiAction);
        }

        if process::is_action(body) || process::is_tau(body) || process::is_multi_action(body) {
            return Ok(ProcessStatus::MultiAction);
        }

        if process::is_process(body) {
            self.determine_status_rec(&body.arg(0).clone(), status, pcrl_processes)?;
            return Ok(status);
        }

        if process::is_delta(body) {
            return Ok(ProcessStatus::Pcrl);
        }

        Err(LinError::Syntactic(format!(
            "process has an unexpected format: {body}"
        )))
    }

    /// Collects the pCRL processes reachable from the initial one.
    pub(crate) fn collect_pcrl_processes(&self, initial: &ATerm) -> Vec<ATerm> {
        let mut visited = ATermIndexedSet::new();
        let mut result = Vec::new();
        self.collect_pcrl_rec(initial, &mut visited, &mut result);
        result
    }

    fn collect_pcrl_rec(&self, proc_id: &ATerm, visited: &mut ATermIndexedSet, result: &mut Vec<ATerm>) {
        let (_, is_new) = visited.insert(proc_id.clone());
        if !is_new {
            return;
        }

        let index = self.object_index(proc_id);
        if self.object(index).status == ProcessStatus::Pcrl {
            result.push(proc_id.clone());
        }
        let body = self.process_body(proc_id);
        self.collect_pcrl_term(&body, visited, result);
    }

    fn collect_pcrl_term(&self, body: &ATerm, visited: &mut ATermIndexedSet, result: &mut Vec<ATerm>) {
        if process::is_cond(body) {
            self.collect_pcrl_term(&body.arg(1).clone(), visited, result);
            self.collect_pcrl_term(&body.arg(2).clone(), visited, result);
        } else if process::is_choice(body)
            || process::is_seq(body)
            || process::is_merge(body)
            || process::is_sync(body)
        {
            self.collect_pcrl_term(&body.arg(0).clone(), visited, result);
            self.collect_pcrl_term(&body.arg(1).clone(), visited, result);
        } else if process::is_sum(body)
            || process::is_hide(body)
            || process::is_rename(body)
            || process::is_allow(body)
            || process::is_comm(body)
            || process::is_block(body)
        {
            self.collect_pcrl_term(&body.arg(1).clone(), visited, result);
        } else if process::is_at_time(body) {
            self.collect_pcrl_term(&body.arg(0).clone(), visited, result);
        } else if process::is_process(body) {
            self.collect_pcrl_rec(&body.arg(0).clone(), visited, result);
        }
    }

    /* ---------------------- termination analysis ----------------------- */

    /// Propagates termination over the process identifiers to a fixpoint: a
    /// process can terminate iff some summand of its body reaches a
    /// successful end.
    pub(crate) fn determine_termination(&mut self, initial: &ATerm) {
        loop {
            let mut stable = true;
            let mut visited = ATermIndexedSet::new();
            self.can_terminate_rec(initial, &mut stable, &mut visited);
            if stable {
                break;
            }
        }
    }

    fn can_terminate_rec(&mut self, proc_id: &ATerm, stable: &mut bool, visited: &mut ATermIndexedSet) -> bool {
        let (_, is_new) = visited.insert(proc_id.clone());
        let index = self.object_index(proc_id);

        if is_new {
            let body = self.process_body(proc_id);
            let can_terminate = self.can_terminate_term(&body, stable, Some(visited));
            if self.object(index).can_terminate != can_terminate {
                self.object_mut(index).can_terminate = can_terminate;
                *stable = false;
            }
        }
        self.object(index).can_terminate
    }

    /// Whether a process body can reach a successful end. Actions and tau
    /// terminate, delta does not; choice and conditional are disjunctive,
    /// sequence and synchronisation conjunctive. Without a visited set the
    /// recorded results of invoked processes are used.
    pub(crate) fn can_terminate_body(&mut self, body: &ATerm) -> bool {
        let mut stable = true;
        self.can_terminate_term(body, &mut stable, None)
    }

    fn can_terminate_term(
        &mut self,
        body: &ATerm,
        stable: &mut bool,
        mut visited: Option<&mut ATermIndexedSet>,
    ) -> bool {
        if process::is_merge(body) || process::is_seq(body) || process::is_sync(body) {
            let r1 = self.can_terminate_term(&body.arg(0).clone(), stable, visited.as_deref_mut());
            let r2 = self.can_terminate_term(&body.arg(1).clone(), stable, visited.as_deref_mut());
            return r1 && r2;
        }

        if process::is_choice(body) {
            let r1 = self.can_terminate_term(&body.arg(0).clone(), stable, visited.as_deref_mut());
            let r2 = self.can_terminate_term(&body.arg(1).clone(), stable, visited.as_deref_mut());
            return r1 || r2;
        }

        if process::is_cond(body) {
            let r1 = self.can_terminate_term(&body.arg(1).clone(), stable, visited.as_deref_mut());
            let r2 = self.can_terminate_term(&body.arg(2).clone(), stable, visited.as_deref_mut());
            return r1 || r2;
        }

        if process::is_sum(body)
            || process::is_hide(body)
            || process::is_rename(body)
            || process::is_allow(body)
            || process::is_block(body)
            || process::is_comm(body)
        {
            return self.can_terminate_term(&body.arg(1).clone(), stable, visited);
        }

        if process::is_at_time(body) {
            return self.can_terminate_term(&body.arg(0).clone(), stable, visited);
        }

        if process::is_process(body) {
            let proc_id = body.arg(0).clone();
            return match visited {
                Some(visited) => self.can_terminate_rec(&proc_id, stable, visited),
                None => self.object(self.object_index(&proc_id)).can_terminate,
            };
        }

        if process::is_action(body) || process::is_multi_action(body) || process::is_tau(body) {
            return true;
        }

        if process::is_delta(body) {
            return false;
        }

        panic!("unexpected process format in the termination analysis: {body}");
    }
}
