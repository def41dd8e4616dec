//! The linearisation context: the object descriptor table, the catalogues of
//! generated datatypes, the declarations collected for the output
//! specification and the optional rewriter. One context serves one
//! linearisation run.

use log::trace;

use mcrl2rust_aterm::{ATerm, ATermIndexedSet, TermPool};
use mcrl2rust_mcrl2::{data, process, sort, substitution, FreshNameGenerator};
use mcrl2rust_rewrite::{
    CompactRewriter, InnermostRewriter, RewriteEngine, RewriteRule, RewriteSpecification,
};

use crate::enumtypes::EnumeratedType;
use crate::stacks::StackType;
use crate::{LinError, LinOptions, RewriteStrategy};

/// The elements of a list term.
pub(crate) fn list_elements(list: &ATerm) -> Vec<ATerm> {
    mcrl2rust_aterm::ATermList::<ATerm>::from(list.clone()).iter().collect()
}

/// The intermediate result of linearising one (composition of) process(es):
/// the initial state, the parameter list and the summands. The initial state
/// and the next states of the summands hold assignment lists, except inside
/// the sequential stage, which works with positional argument lists.
#[derive(Clone)]
pub(crate) struct Ips {
    pub init: Vec<ATerm>,
    pub parameters: Vec<ATerm>,
    pub summands: Vec<ATerm>,
}

/// What an identifier in the descriptor table stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ObjectKind {
    Sort,
    Constructor,
    Mapping,
    Action,
    Process,
    Variable,
    /// A synthesised process representing a multi-action, indexed by its
    /// action name sequence.
    MultiAction,
}

/// The processing state of a process descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ProcessStatus {
    Unknown,
    Mcrl,
    McrlDone,
    McrlBusy,
    McrlLin,
    Pcrl,
    MultiAction,
    Gnf,
    GnfBusy,
}

/// A descriptor of a declared or generated object.
pub(crate) struct Object {
    pub name: ATerm,
    pub kind: ObjectKind,
    pub parameters: Vec<ATerm>,
    pub body: Option<ATerm>,
    pub status: ProcessStatus,
    pub can_terminate: bool,
    /// For multi-action objects: the synthesised process representing it.
    pub target: Option<ATerm>,
    /// For regular mode: the process sequence this descriptor stands for.
    pub represented_process: Option<ATerm>,
    /// For regular2 mode: the sequence of process references.
    pub represented_processes: Option<Vec<ATerm>>,
}

impl Object {
    fn new(name: ATerm, kind: ObjectKind) -> Object {
        Object {
            name,
            kind,
            parameters: Vec::new(),
            body: None,
            status: ProcessStatus::Unknown,
            can_terminate: false,
            target: None,
            represented_process: None,
            represented_processes: None,
        }
    }
}

/// The lineariser. Creating one is cheap; [crate::specification] drives the
/// pipeline through it.
pub struct Lineariser {
    pub(crate) options: LinOptions,
    pub(crate) fresh: FreshNameGenerator,

    objects: Vec<Option<Object>>,
    object_index: ATermIndexedSet,

    pub(crate) enum_types: Vec<EnumeratedType>,
    pub(crate) stack_types: Vec<StackType>,

    // The declarations of the output specification.
    pub(crate) sorts: Vec<ATerm>,
    pub(crate) constructors: Vec<ATerm>,
    pub(crate) mappings: Vec<ATerm>,
    pub(crate) equations: Vec<ATerm>,
    pub(crate) actions: Vec<ATerm>,
    /// Free data variables ranging over process data, introduced for
    /// don't-care values unless `nofreevars` is set.
    pub(crate) proc_data_vars: Vec<ATerm>,

    pub(crate) rewriter: Option<Box<dyn RewriteEngine>>,
    equation_variables: Option<Vec<ATerm>>,

    pub(crate) termination_action: Option<ATerm>,
    pub(crate) terminated_proc_id: Option<ATerm>,

    pub(crate) time_used: bool,
    /// The processes synthesised for sequences of process references.
    pub(crate) seq_process_names: Vec<ATerm>,
    /// The processes synthesised for bare tau and delta continuations.
    pub(crate) tau_process: Option<ATerm>,
    pub(crate) delta_process: Option<ATerm>,
}

impl Lineariser {
    pub fn new(options: LinOptions) -> Lineariser {
        Lineariser {
            options,
            fresh: FreshNameGenerator::new(),
            objects: Vec::new(),
            object_index: ATermIndexedSet::new(),
            enum_types: Vec::new(),
            stack_types: Vec::new(),
            sorts: Vec::new(),
            constructors: Vec::new(),
            mappings: Vec::new(),
            equations: Vec::new(),
            actions: Vec::new(),
            proc_data_vars: Vec::new(),
            rewriter: None,
            equation_variables: None,
            termination_action: None,
            terminated_proc_id: None,
            time_used: false,
            seq_process_names: Vec::new(),
            tau_process: None,
            delta_process: None,
        }
    }

    /* ------------------- the object descriptor table ------------------- */

    /// Adds the identifier to the table, returning its index and whether it
    /// is new.
    pub(crate) fn add_object(&mut self, name: &ATerm) -> (usize, bool) {
        let (index, is_new) = self.object_index.insert(name.clone());
        if is_new {
            if index >= self.objects.len() {
                self.objects.resize_with(index + 1, || None);
            }
            self.objects[index] = Some(Object::new(name.clone(), ObjectKind::Sort));
        }
        (index, is_new)
    }

    pub(crate) fn exists_object(&self, name: &ATerm) -> Option<usize> {
        self.object_index.index_of(name)
    }

    /// The index of an existing object; the callers guarantee existence.
    pub(crate) fn object_index(&self, name: &ATerm) -> usize {
        self.object_index
            .index_of(name)
            .unwrap_or_else(|| panic!("object {name} does not exist"))
    }

    pub(crate) fn object(&self, index: usize) -> &Object {
        self.objects[index].as_ref().expect("a live object")
    }

    pub(crate) fn object_mut(&mut self, index: usize) -> &mut Object {
        self.objects[index].as_mut().expect("a live object")
    }

    /// Iterates over the indices of all live objects.
    pub(crate) fn object_indices(&self) -> Vec<usize> {
        self.object_index.iter().map(|(index, _)| index).collect()
    }

    /* --------------------------- declarations --------------------------- */

    /// Returns true iff the sort expression only mentions declared sorts.
    pub(crate) fn exists_sort(&self, sort_term: &ATerm) -> bool {
        if sort::is_sort_arrow(sort_term) {
            return sort::domain(sort_term).iter().all(|s| self.exists_sort(&s))
                && self.exists_sort(&sort::codomain(sort_term));
        }

        debug_assert!(sort::is_sort_id(sort_term), "Expected a sort, found {sort_term}");
        match self.exists_object(sort_term) {
            Some(index) => self.object(index).kind == ObjectKind::Sort,
            None => false,
        }
    }

    pub(crate) fn insert_sort(&mut self, sort_decl: &ATerm) -> Result<(), LinError> {
        if !sort::is_sort_id(sort_decl) {
            return Err(LinError::Semantic(format!(
                "expected a sort declaration, found {sort_decl}"
            )));
        }

        let (index, is_new) = self.add_object(sort_decl);
        if !is_new {
            return Err(LinError::Semantic(format!("sort {sort_decl} is declared twice")));
        }
        self.object_mut(index).kind = ObjectKind::Sort;
        self.sorts.push(sort_decl.clone());
        Ok(())
    }

    fn insert_operation(&mut self, declaration: &ATerm, kind: ObjectKind) -> Result<(), LinError> {
        if !data::is_op_id(declaration) {
            return Err(LinError::Semantic(format!(
                "expected an operation declaration, found {declaration}"
            )));
        }
        if !self.exists_sort(&declaration.arg(1).clone()) {
            return Err(LinError::Semantic(format!(
                "the sort of {declaration} is not declared"
            )));
        }

        let (index, is_new) = self.add_object(declaration);
        if !is_new {
            return Err(LinError::Semantic(format!(
                "operation {declaration} is declared twice"
            )));
        }
        self.object_mut(index).kind = kind;

        match kind {
            ObjectKind::Constructor => self.constructors.push(declaration.clone()),
            ObjectKind::Mapping => self.mappings.push(declaration.clone()),
            _ => unreachable!("operations are constructors or mappings"),
        }
        Ok(())
    }

    pub(crate) fn insert_constructor(&mut self, declaration: &ATerm) -> Result<(), LinError> {
        self.insert_operation(declaration, ObjectKind::Constructor)
    }

    pub(crate) fn insert_mapping(&mut self, declaration: &ATerm) -> Result<(), LinError> {
        self.insert_operation(declaration, ObjectKind::Mapping)
    }

    pub(crate) fn insert_action(&mut self, declaration: &ATerm) -> Result<(), LinError> {
        if !process::is_act_id(declaration) {
            return Err(LinError::Semantic(format!(
                "expected an action declaration, found {declaration}"
            )));
        }

        let sorts = list_elements(&declaration.arg(1).clone());
        for argument_sort in &sorts {
            if !self.exists_sort(argument_sort) {
                return Err(LinError::Semantic(format!(
                    "the sort {argument_sort} of action {declaration} is not declared"
                )));
            }
        }

        let (index, is_new) = self.add_object(declaration);
        if !is_new {
            return Err(LinError::Semantic(format!(
                "action {declaration} is declared twice"
            )));
        }
        self.object_mut(index).kind = ObjectKind::Action;
        self.actions.push(declaration.clone());
        Ok(())
    }

    pub(crate) fn insert_variable(&mut self, variable: &ATerm, must_be_new: bool) -> Result<(), LinError> {
        debug_assert!(data::is_variable(variable), "Expected a variable, found {variable}");

        let (index, is_new) = self.add_object(variable);
        if !is_new && must_be_new {
            return Err(LinError::Semantic(format!("variable {variable} already exists")));
        }
        self.object_mut(index).kind = ObjectKind::Variable;
        Ok(())
    }

    pub(crate) fn insert_variables(&mut self, variables: &[ATerm], must_be_new: bool) -> Result<(), LinError> {
        for variable in variables {
            self.insert_variable(variable, must_be_new)?;
        }
        Ok(())
    }

    pub(crate) fn insert_process_declaration(
        &mut self,
        proc_id: &ATerm,
        parameters: Vec<ATerm>,
        body: ATerm,
        status: ProcessStatus,
        can_terminate: bool,
    ) -> Result<usize, LinError> {
        if !process::is_proc_var_id(proc_id) {
            return Err(LinError::Semantic(format!(
                "expected a process declaration, found {proc_id}"
            )));
        }

        let (index, is_new) = self.add_object(proc_id);
        if !is_new {
            return Err(LinError::Semantic(format!(
                "process {proc_id} is declared twice"
            )));
        }

        self.insert_variables(&parameters, false)?;

        let object = self.object_mut(index);
        object.kind = ObjectKind::Process;
        object.parameters = parameters;
        object.body = Some(body);
        object.status = status;
        object.can_terminate = can_terminate;
        Ok(index)
    }

    /* -------------------- generated process helpers -------------------- */

    /// Declares a fresh process over the parameters that actually occur in
    /// the body and returns its identifier.
    pub(crate) fn new_process(
        &mut self,
        tp: &mut TermPool,
        parameters: &[ATerm],
        body: &ATerm,
        status: ProcessStatus,
        can_terminate: bool,
    ) -> ATerm {
        let parameters: Vec<ATerm> = parameters
            .iter()
            .filter(|parameter| substitution::occurs_in_pcrl_term(parameter, body, false))
            .cloned()
            .collect();

        let name = self.fresh.fresh_name(tp, "P");
        let parameter_sorts: Vec<ATerm> = parameters.iter().map(|p| p.arg(1).clone()).collect();
        let proc_id = process::proc_var_id(tp, &name, &parameter_sorts);

        self.insert_process_declaration(&proc_id, parameters, body.clone(), status, can_terminate)
            .expect("a fresh process name cannot clash");
        trace!("declared process {proc_id}");
        proc_id
    }

    /// The parameters of a process identifier.
    pub(crate) fn process_parameters(&self, proc_id: &ATerm) -> Vec<ATerm> {
        self.object(self.object_index(proc_id)).parameters.clone()
    }

    /// The body of a process identifier.
    pub(crate) fn process_body(&self, proc_id: &ATerm) -> ATerm {
        self.object(self.object_index(proc_id))
            .body
            .clone()
            .expect("a declared process has a body")
    }

    /* ---------------------------- equations ---------------------------- */

    /// Opens an equation section over the given variables.
    pub(crate) fn declare_equation_variables(&mut self, variables: &[ATerm]) {
        assert!(
            self.equation_variables.is_none(),
            "cannot declare variables, the previous equation section is not closed"
        );
        self.equation_variables = Some(variables.to_vec());
    }

    /// Adds an equation over the declared variables to the output and to the
    /// rewriter.
    pub(crate) fn new_equation(
        &mut self,
        tp: &mut TermPool,
        condition: Option<&ATerm>,
        lhs: &ATerm,
        rhs: &ATerm,
    ) {
        let variables = self
            .equation_variables
            .clone()
            .expect("variables must be declared before adding an equation");

        let nil = data::nil(tp);
        let condition = condition.cloned().unwrap_or(nil);
        let equation = data::data_equation(tp, &variables, &condition, lhs, rhs);
        self.equations.push(equation.clone());

        if let Some(rewriter) = &mut self.rewriter {
            rewriter.add_rule(tp, &RewriteRule::from_equation(&equation));
        }
    }

    pub(crate) fn end_equation_section(&mut self) {
        assert!(
            self.equation_variables.is_some(),
            "cannot close an equation section that is not open"
        );
        self.equation_variables = None;
    }

    /* ---------------------------- rewriting ----------------------------- */

    /// Installs the rewriter over the given equations, unless rewriting is
    /// disabled.
    pub(crate) fn install_rewriter(&mut self, tp: &mut TermPool, equations: &[ATerm]) {
        if self.options.norewrite {
            return;
        }

        let specification = RewriteSpecification::from_equations(equations);
        self.rewriter = Some(match self.options.strategy {
            RewriteStrategy::Innermost => Box::new(InnermostRewriter::new(tp, &specification)),
            RewriteStrategy::Compact => Box::new(CompactRewriter::new(tp, &specification)),
        });
    }

    /// Rewrites a data expression when a rewriter is installed.
    pub(crate) fn rewrite_term(&mut self, tp: &mut TermPool, t: &ATerm) -> ATerm {
        match &mut self.rewriter {
            Some(rewriter) => rewriter.rewrite(tp, t),
            None => t.clone(),
        }
    }

    /// Rewrites every element of a list term.
    pub(crate) fn rewrite_term_list(&mut self, tp: &mut TermPool, list: &ATerm) -> ATerm {
        let elements = tp.list_elements(list);
        let rewritten: Vec<ATerm> = elements.iter().map(|t| self.rewrite_term(tp, t)).collect();
        tp.list(&rewritten)
    }

    /* --------------------------- dummy terms ---------------------------- */

    /// Yields a term of the requested sort for a don't-care value: a fresh
    /// free variable when free variables are allowed, otherwise a constant
    /// constructor, a constant mapping, or a newly declared dummy constant.
    pub(crate) fn dummy_term(&mut self, tp: &mut TermPool, target_sort: &ATerm) -> ATerm {
        if !self.options.nofreevars {
            let variable = self.fresh.fresh_variable(tp, "freevar", target_sort);
            self.proc_data_vars.push(variable.clone());
            self.insert_variable(&variable, true)
                .expect("a fresh variable cannot clash");
            return variable;
        }

        for index in self.object_indices() {
            let object = self.object(index);
            if object.kind == ObjectKind::Constructor && object.name.arg(1) == target_sort {
                return object.name.clone();
            }
        }

        for index in self.object_indices() {
            let object = self.object(index);
            if object.kind == ObjectKind::Mapping && object.name.arg(1) == target_sort {
                return object.name.clone();
            }
        }

        let name = format!("dummy{}", sort::sort_name(target_sort));
        let fresh_name = self.fresh.fresh_name(tp, &name);
        let dummy = data::op_id(tp, &fresh_name, target_sort);
        self.insert_mapping(&dummy)
            .expect("a fresh dummy constant cannot clash");
        dummy
    }
}
