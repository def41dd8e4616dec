//! The linearisation pipeline: ingesting the specification term, driving
//! the stages and assembling the output specification around the generated
//! linear process equation.

use log::debug;

use mcrl2rust_aterm::{ATerm, TermPool};
use mcrl2rust_mcrl2::{data, lps, process, specification as spec, substitution};

use crate::context::{list_elements, Ips, Lineariser, ProcessStatus};
use crate::{LinError, LinOptions};

/// The result of a linearisation: the output specification term with the
/// linear process equation and its initial state.
pub struct LinearisedSpec {
    pub spec: ATerm,
}

/// Linearises the specification term
/// Spec(SortSpec, ConsSpec, MapSpec, EqnSpec, ActSpec, ProcEqnSpec, Init)
/// under the given options.
pub fn linearise(tp: &mut TermPool, input: &ATerm, options: LinOptions) -> Result<LinearisedSpec, LinError> {
    let mut lineariser = Lineariser::new(options);
    lineariser.linearise_spec(tp, input)
}

impl Lineariser {
    pub fn linearise_spec(&mut self, tp: &mut TermPool, input: &ATerm) -> Result<LinearisedSpec, LinError> {
        if !spec::is_spec_v1(input) {
            return Err(LinError::Semantic(format!(
                "expected a specification, found {input}"
            )));
        }

        let initial = self.create_spec(tp, input)?;

        // This must be done after storing the input, to avoid a name
        // conflict with an action named Terminate.
        self.initialize_terminator(tp)?;

        let ips = self.transform(tp, &initial)?;
        Ok(self.assemble(tp, ips))
    }

    /* ----------------------------- ingest ------------------------------ */

    /// The builtin sorts and the boolean operators with their equations;
    /// declared before the input so conditions can always be simplified.
    fn declare_standard_data(&mut self, tp: &mut TermPool) -> Result<(), LinError> {
        for name in ["Bool", "Pos", "Nat", "Int", "Real"] {
            let sort_id = mcrl2rust_mcrl2::sort::sort_id(tp, name);
            self.insert_sort(&sort_id)?;
        }

        let bool_sort = mcrl2rust_mcrl2::sort::bool_sort(tp);
        let true_term = data::true_term(tp);
        let false_term = data::false_term(tp);
        self.insert_constructor(&true_term)?;
        self.insert_constructor(&false_term)?;

        let b = self.fresh.fresh_variable(tp, "b_std", &bool_sort);
        self.declare_equation_variables(&[b.clone()]);

        // Conjunction, disjunction and negation over true and false.
        let pairs = [
            (data::and(tp, &true_term, &b), b.clone()),
            (data::and(tp, &b, &true_term), b.clone()),
            (data::and(tp, &false_term, &b), false_term.clone()),
            (data::and(tp, &b, &false_term), false_term.clone()),
            (data::or(tp, &true_term, &b), true_term.clone()),
            (data::or(tp, &b, &true_term), true_term.clone()),
            (data::or(tp, &false_term, &b), b.clone()),
            (data::or(tp, &b, &false_term), b.clone()),
            (data::not(tp, &true_term), false_term.clone()),
            (data::not(tp, &false_term), true_term.clone()),
            (data::equal(tp, &b, &b), true_term.clone()),
            (data::equal(tp, &true_term, &false_term), false_term.clone()),
            (data::equal(tp, &false_term, &true_term), false_term.clone()),
        ];
        for (lhs, rhs) in pairs {
            self.new_equation(tp, None, &lhs, &rhs);
        }
        self.end_equation_section();
        Ok(())
    }

    /// Stores the declarations of the input specification in the descriptor
    /// table and returns the identifier of the initial process.
    fn create_spec(&mut self, tp: &mut TermPool, input: &ATerm) -> Result<ATerm, LinError> {
        self.install_rewriter(tp, &[]);
        self.declare_standard_data(tp)?;

        for declaration in spec::section_declarations(input, 0).iter() {
            self.insert_sort(&declaration)?;
        }

        // The equality on every declared sort is reflexive; the rule has a
        // non-linear pattern, so it only fires on shared operands.
        for sort_id in self.sorts.clone() {
            let x = self.fresh.fresh_variable(tp, "x_eq", &sort_id);
            self.declare_equation_variables(&[x.clone()]);
            let lhs = data::equal(tp, &x, &x);
            let true_term = data::true_term(tp);
            self.new_equation(tp, None, &lhs, &true_term);
            self.end_equation_section();
        }

        for declaration in spec::section_declarations(input, 1).iter() {
            self.insert_constructor(&declaration)?;
        }
        for declaration in spec::section_declarations(input, 2).iter() {
            self.insert_mapping(&declaration)?;
        }

        for equation in spec::section_declarations(input, 3).iter() {
            let variables = list_elements(&equation.arg(0).clone());
            self.declare_equation_variables(&variables);
            let condition = equation.arg(1).clone();
            let condition = if data::is_nil(&condition) {
                None
            } else {
                Some(condition)
            };
            let lhs = equation.arg(2).clone();
            let rhs = equation.arg(3).clone();
            self.new_equation(tp, condition.as_ref(), &lhs, &rhs);
            self.end_equation_section();
        }

        for declaration in spec::section_declarations(input, 4).iter() {
            self.insert_action(&declaration)?;
        }

        for declaration in spec::section_declarations(input, 5).iter() {
            if !process::is_proc_eqn(&declaration) {
                return Err(LinError::Semantic(format!(
                    "expected a process equation, found {declaration}"
                )));
            }
            let proc_id = declaration.arg(0).clone();
            let parameters = list_elements(&declaration.arg(1).clone());
            let body = declaration.arg(2).clone();
            self.insert_process_declaration(&proc_id, parameters, body, ProcessStatus::Unknown, false)?;
        }

        // The name init cannot occur as an identifier in the input, so it is
        // used for the initial process.
        let initial_body = spec::initial_process(input);
        for variable in spec::initial_free_variables(input).iter() {
            self.proc_data_vars.push(variable.clone());
            self.insert_variable(&variable, false)?;
        }

        let init_id = process::proc_var_id(tp, "init", &[]);
        self.insert_process_declaration(&init_id, Vec::new(), initial_body, ProcessStatus::Unknown, false)?;
        Ok(init_id)
    }

    /* ---------------------------- transform ----------------------------- */

    fn transform(&mut self, tp: &mut TermPool, initial: &ATerm) -> Result<Ips, LinError> {
        // Select the sequential processes and check that the others are
        // proper parallel processes.
        self.determine_process_status(initial)?;
        self.determine_termination(initial);
        let initial = self.split_processes(tp, initial);

        let pcrl_processes = self.collect_pcrl_processes(&initial);
        if pcrl_processes.is_empty() {
            return Err(LinError::Syntactic(
                "there are no pCRL processes to be linearised".to_string(),
            ));
        }

        // First to a form with actions at the head but possibly variables
        // behind them, then to real Greibach normal form.
        self.procs_to_var_head_gnf(tp, &pcrl_processes)?;
        self.procs_to_real_gnf(tp, &initial)?;

        let can_terminate = {
            let index = self.object_index(&initial);
            self.object(index).can_terminate
        };
        let mut ips = self.generate_lpe_mcrl(tp, &initial, can_terminate)?;

        if self.options.final_cluster {
            ips = self.cluster_final_result(tp, ips);
        }

        if !self.options.nosumelm {
            let parameters = ips.parameters.clone();
            ips.summands = self.sum_eliminate(tp, &ips.summands, &parameters);
        }

        self.add_termination_action_if_necessary(&ips.summands);
        Ok(ips)
    }

    /// Generates the linear process of a process identifier: sequential
    /// processes through the Greibach pipeline, parallel ones by expanding
    /// their operators over the recursively generated operands.
    fn generate_lpe_mcrl(&mut self, tp: &mut TermPool, proc_id: &ATerm, can_terminate: bool) -> Result<Ips, LinError> {
        let index = self.object_index(proc_id);
        let status = self.object(index).status;

        match status {
            ProcessStatus::Gnf | ProcessStatus::Pcrl | ProcessStatus::MultiAction => {
                let terminates = can_terminate && self.object(index).can_terminate;
                let ips = self.generate_lpe_pcrl(tp, proc_id, terminates)?;
                Ok(self.replace_arguments_by_assignments_ips(tp, ips))
            }
            ProcessStatus::McrlDone | ProcessStatus::McrlLin | ProcessStatus::Mcrl => {
                self.object_mut(index).status = ProcessStatus::McrlLin;
                let body = self.process_body(proc_id);
                let terminates = can_terminate && self.object(index).can_terminate;
                self.generate_lpe_mcrl_term(tp, &body, terminates)
            }
            _ => panic!("unexpected process status {status:?} of {proc_id}"),
        }
    }

    fn generate_lpe_mcrl_term(&mut self, tp: &mut TermPool, t: &ATerm, can_terminate: bool) -> Result<Ips, LinError> {
        if process::is_process(t) {
            let proc_id = t.arg(0).clone();
            let ips = self.generate_lpe_mcrl(tp, &proc_id, can_terminate)?;
            return Ok(self.name_composition(tp, &proc_id, &t.arg(1).clone(), ips));
        }

        if process::is_merge(t) {
            let lhs = self.generate_lpe_mcrl_term(tp, &t.arg(0).clone(), can_terminate)?;
            let rhs = self.generate_lpe_mcrl_term(tp, &t.arg(1).clone(), can_terminate)?;
            return Ok(self.parallel_composition(tp, lhs, rhs));
        }

        if process::is_hide(t) {
            let inner = self.generate_lpe_mcrl_term(tp, &t.arg(1).clone(), can_terminate)?;
            return Ok(self.hide_composition(tp, &t.arg(0).clone(), inner));
        }

        if process::is_allow(t) {
            let inner = self.generate_lpe_mcrl_term(tp, &t.arg(1).clone(), can_terminate)?;
            return Ok(self.allow_composition(tp, &t.arg(0).clone(), inner));
        }

        if process::is_block(t) {
            let inner = self.generate_lpe_mcrl_term(tp, &t.arg(1).clone(), can_terminate)?;
            return Ok(self.encap_composition(tp, &t.arg(0).clone(), inner));
        }

        if process::is_rename(t) {
            let inner = self.generate_lpe_mcrl_term(tp, &t.arg(1).clone(), can_terminate)?;
            return Ok(self.rename_composition(tp, &t.arg(0).clone(), inner));
        }

        if process::is_comm(t) {
            let inner = self.generate_lpe_mcrl_term(tp, &t.arg(1).clone(), can_terminate)?;
            return Ok(self.communication_composition(tp, &t.arg(0).clone(), inner));
        }

        Err(LinError::Syntactic(format!("expected an mCRL term, found {t}")))
    }

    /* ------------------------ the pCRL generator ------------------------ */

    /// The pCRL processes invoked from a body in Greibach normal form.
    fn make_pcrl_procs(&self, body: &ATerm, collected: &mut Vec<ATerm>) {
        if process::is_choice(body) || process::is_seq(body) {
            self.make_pcrl_procs(&body.arg(0).clone(), collected);
            self.make_pcrl_procs(&body.arg(1).clone(), collected);
            return;
        }

        if process::is_cond(body) || process::is_sum(body) {
            self.make_pcrl_procs(&body.arg(1).clone(), collected);
            return;
        }

        if process::is_process(body) {
            let proc_id = body.arg(0).clone();
            if !collected.contains(&proc_id) {
                collected.push(proc_id.clone());
                let inner = self.process_body(&proc_id);
                self.make_pcrl_procs(&inner, collected);
            }
            return;
        }

        if process::is_multi_action(body) || process::is_delta(body) || process::is_at_time(body) {
            return;
        }

        panic!("unexpected process format in make_pcrl_procs: {body}");
    }

    /// Joins the parameter lists of the cluster. Two variables with the same
    /// name and sort share a parameter; a name clash with a different sort
    /// renames the parameter of the joining process.
    fn collect_parameter_list(&mut self, tp: &mut TermPool, pcrl_processes: &[ATerm]) -> Result<Vec<ATerm>, LinError> {
        let mut parameters: Vec<ATerm> = Vec::new();

        for proc_id in pcrl_processes {
            let index = self.object_index(proc_id);
            let own_parameters = self.object(index).parameters.clone();

            for parameter in own_parameters {
                if parameters.contains(&parameter) {
                    continue;
                }

                if parameters.iter().any(|p| p.arg(0) == parameter.arg(0)) {
                    // Same name, different sort: rename this process's
                    // parameter to a fresh one.
                    let parameter_sort = parameter.arg(1).clone();
                    let fresh = self.fresh.fresh_variable(tp, data::name(&parameter), &parameter_sort);
                    let renaming = [(parameter.clone(), fresh.clone())];

                    let object = self.object(index);
                    let renamed_parameters: Vec<ATerm> = object
                        .parameters
                        .iter()
                        .map(|p| substitution::substitute_data(tp, &renaming, p))
                        .collect();
                    let body = self.process_body(proc_id);
                    let renamed_body =
                        substitution::substitute_pcrl_proc(tp, &mut self.fresh, &renaming, &body);

                    let object = self.object_mut(index);
                    object.parameters = renamed_parameters;
                    object.body = Some(renamed_body);

                    parameters.push(fresh);
                } else {
                    parameters.push(parameter);
                }
            }
        }
        Ok(parameters)
    }

    /// Renames the variables bound in the bodies of the cluster apart from
    /// the aggregated parameter list.
    fn alpha_conversion(&mut self, tp: &mut TermPool, pcrl_processes: &[ATerm], parameters: &[ATerm]) {
        for proc_id in pcrl_processes {
            let index = self.object_index(proc_id);
            let body = self.process_body(proc_id);
            let converted = self.alpha_convert_body(tp, &body, parameters);
            self.object_mut(index).body = Some(converted);
        }
    }

    fn alpha_convert_body(&mut self, tp: &mut TermPool, body: &ATerm, banned: &[ATerm]) -> ATerm {
        if process::is_choice(body) || process::is_seq(body) {
            let lhs = self.alpha_convert_body(tp, &body.arg(0).clone(), banned);
            let rhs = self.alpha_convert_body(tp, &body.arg(1).clone(), banned);
            let symbol = body.head_symbol().clone();
            return tp.create(&symbol, &[lhs, rhs]);
        }

        if process::is_cond(body) {
            let then = self.alpha_convert_body(tp, &body.arg(1).clone(), banned);
            let otherwise = self.alpha_convert_body(tp, &body.arg(2).clone(), banned);
            return process::cond(tp, &body.arg(0).clone(), &then, &otherwise);
        }

        if process::is_sum(body) {
            let sum_vars = list_elements(&body.arg(0).clone());
            let (sum_vars, renaming) =
                substitution::alpha_convert(tp, &mut self.fresh, &sum_vars, banned, &[]);
            let inner =
                substitution::substitute_pcrl_proc(tp, &mut self.fresh, &renaming, &body.arg(1).clone());
            let inner = self.alpha_convert_body(tp, &inner, banned);
            return process::sum(tp, &sum_vars, &inner);
        }

        if process::is_at_time(body) {
            let inner = self.alpha_convert_body(tp, &body.arg(0).clone(), banned);
            return process::at_time(tp, &inner, &body.arg(1).clone());
        }

        body.clone()
    }

    /// Generates the linear process of one cluster of sequential processes.
    fn generate_lpe_pcrl(&mut self, tp: &mut TermPool, proc_id: &ATerm, can_terminate: bool) -> Result<Ips, LinError> {
        let mut pcrl_processes = vec![proc_id.clone()];
        let body = self.process_body(proc_id);
        self.make_pcrl_procs(&body, &mut pcrl_processes);

        let single_state = pcrl_processes.len() == 1;

        let parameters = self.collect_parameter_list(tp, &pcrl_processes)?;
        self.alpha_conversion(tp, &pcrl_processes, &parameters);

        let stack = self.new_control_stack(tp, &parameters, &pcrl_processes)?;
        let initial = self.make_initial_state(tp, proc_id, &stack, &pcrl_processes, single_state);

        let mut summands = self.collect_sum_list(tp, &pcrl_processes, &stack, can_terminate, single_state)?;

        if !self.options.no_intermediate_cluster {
            let cluster_parameters = if self.options.regular() {
                if self.options.binary && !self.options.oldstate() {
                    let mut variables = stack.boolean_variables.clone();
                    if single_state {
                        variables.clear();
                    }
                    variables.extend(stack.parameters.iter().cloned());
                    variables
                } else if single_state {
                    stack.parameters.clone()
                } else {
                    let mut variables = vec![stack.variable.clone()];
                    variables.extend(stack.parameters.iter().cloned());
                    variables
                }
            } else {
                vec![stack.variable.clone()]
            };
            summands = self.cluster_actions(tp, summands, &cluster_parameters, false);
        }

        debug!(
            "generated {} summands for {}",
            summands.len(),
            process::proc_id_name(proc_id)
        );

        Ok(Ips {
            init: initial,
            parameters: self.state_parameter_list(&stack, single_state),
            summands,
        })
    }

    /// Replaces the positional argument lists of the pCRL stage by
    /// assignment lists.
    fn replace_arguments_by_assignments_ips(&mut self, tp: &mut TermPool, ips: Ips) -> Ips {
        let init_term = tp.list(&ips.init);
        let init = lps::replace_arguments_by_assignments(tp, &init_term, &ips.parameters);

        let summands = ips
            .summands
            .iter()
            .map(|summand| {
                let variables = summand.arg(0).clone();
                let condition = lps::summand_condition(summand);
                let multi_action = lps::summand_multi_action(summand);
                let time = lps::summand_time(summand);
                let next_state = lps::summand_next_state(summand);
                let assignments = lps::replace_arguments_by_assignments(tp, &next_state, &ips.parameters);
                lps::summand(tp, &variables, &condition, &multi_action, &time, &assignments)
            })
            .collect();

        Ips {
            init: list_elements(&init),
            parameters: ips.parameters,
            summands,
        }
    }

    /* ---------------------------- assembly ------------------------------ */

    /// The free process data variables that actually occur in the summands.
    fn sieve_free_variables_summands(&self, summands: &[ATerm], parameters: &[ATerm]) -> Vec<ATerm> {
        self.proc_data_vars
            .iter()
            .filter(|variable| {
                summands.iter().any(|summand| {
                    let multi_action = lps::summand_multi_action(summand);
                    let time = lps::summand_time(summand);
                    let condition = lps::summand_condition(summand);
                    let next_state = lps::summand_next_state(summand);

                    (!process::is_delta(&multi_action)
                        && substitution::occurs_in_multi_action(variable, &multi_action))
                        || (!data::is_nil(&time) && substitution::occurs_in_term(variable, &time))
                        || substitution::occurs_in_term(variable, &condition)
                        || substitution::occurs_in_assignments(variable, &next_state, parameters)
                })
            })
            .cloned()
            .collect()
    }

    fn sieve_free_variables_assignments(&self, assignments: &[ATerm]) -> Vec<ATerm> {
        self.proc_data_vars
            .iter()
            .filter(|variable| {
                assignments.iter().any(|assignment| {
                    let expression = lps::assignment_expression(assignment);
                    substitution::occurs_in_term(variable, &expression)
                })
            })
            .cloned()
            .collect()
    }

    fn assemble(&mut self, tp: &mut TermPool, ips: Ips) -> LinearisedSpec {
        let sorts = tp.list(&self.sorts.clone());
        let constructors = tp.list(&self.constructors.clone());
        let mappings = tp.list(&self.mappings.clone());
        let equations = tp.list(&self.equations.clone());
        let actions = tp.list(&self.actions.clone());

        let summand_free_variables = self.sieve_free_variables_summands(&ips.summands, &ips.parameters);
        let init_free_variables = self.sieve_free_variables_assignments(&ips.init);

        // Reverse the summands once, so they appear in the order of the
        // input if the input were already linear.
        let mut summands = ips.summands.clone();
        summands.reverse();

        let free_variable_list = tp.list(&summand_free_variables);
        let parameter_list = tp.list(&ips.parameters);
        let summand_list = tp.list(&summands);
        let lpe = lps::lpe(tp, &free_variable_list, &parameter_list, &summand_list);

        let init_free_list = tp.list(&init_free_variables);
        let init_list = tp.list(&ips.init);
        let lpe_init = lps::lpe_init(tp, &init_free_list, &init_list);

        let sort_spec = spec::sort_spec(tp, &sorts);
        let cons_spec = spec::cons_spec(tp, &constructors);
        let map_spec = spec::map_spec(tp, &mappings);
        let eqn_spec = spec::data_eqn_spec(tp, &equations);
        let act_spec = spec::act_spec(tp, &actions);

        let result = spec::spec_v1(
            tp,
            &[sort_spec, cons_spec, map_spec, eqn_spec, act_spec, lpe, lpe_init],
        );

        LinearisedSpec { spec: result }
    }
}
