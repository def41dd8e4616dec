//! The top-level specification term: declaration sections for sorts,
//! constructors, mappings, equations, actions and process equations, plus the
//! initial process.

use mcrl2rust_aterm::{ATerm, ATermList, TermPool};

fn section(tp: &mut TermPool, name: &str, declarations: &ATerm) -> ATerm {
    debug_assert!(declarations.is_list(), "A section holds a declaration list");
    let symbol = tp.create_symbol(name, 1);
    tp.create(&symbol, &[declarations.clone()])
}

pub fn sort_spec(tp: &mut TermPool, declarations: &ATerm) -> ATerm {
    section(tp, "SortSpec", declarations)
}

pub fn cons_spec(tp: &mut TermPool, declarations: &ATerm) -> ATerm {
    section(tp, "ConsSpec", declarations)
}

pub fn map_spec(tp: &mut TermPool, declarations: &ATerm) -> ATerm {
    section(tp, "MapSpec", declarations)
}

pub fn data_eqn_spec(tp: &mut TermPool, declarations: &ATerm) -> ATerm {
    section(tp, "DataEqnSpec", declarations)
}

pub fn act_spec(tp: &mut TermPool, declarations: &ATerm) -> ATerm {
    section(tp, "ActSpec", declarations)
}

pub fn proc_eqn_spec(tp: &mut TermPool, declarations: &ATerm) -> ATerm {
    section(tp, "ProcEqnSpec", declarations)
}

/// The initial process clause: free variables and the initial process term.
pub fn init(tp: &mut TermPool, free_variables: &ATerm, process: &ATerm) -> ATerm {
    let symbol = tp.create_symbol("Init", 2);
    tp.create(&symbol, &[free_variables.clone(), process.clone()])
}

/// The specification term
/// Spec(SortSpec, ConsSpec, MapSpec, EqnSpec, ActSpec, ProcEqnSpec, Init).
pub fn spec_v1(tp: &mut TermPool, sections: &[ATerm; 7]) -> ATerm {
    let symbol = tp.create_symbol("SpecV1", 7);
    tp.create(&symbol, sections)
}

pub fn is_spec_v1(t: &ATerm) -> bool {
    t.head_symbol().name() == "SpecV1" && t.head_symbol().arity() == 7
}

/// The declarations of the section at the given position of a specification.
pub fn section_declarations(spec: &ATerm, index: usize) -> ATermList<ATerm> {
    debug_assert!(is_spec_v1(spec), "Expected a specification, found {spec}");
    debug_assert!(index < 6, "Sections 0 to 5 hold declaration lists");
    spec.arg(index).arg(0).clone().into()
}

/// The initial process term of a specification.
pub fn initial_process(spec: &ATerm) -> ATerm {
    debug_assert!(is_spec_v1(spec), "Expected a specification, found {spec}");
    spec.arg(6).arg(1).clone()
}

/// The free variables of the initial process clause.
pub fn initial_free_variables(spec: &ATerm) -> ATermList<ATerm> {
    debug_assert!(is_spec_v1(spec), "Expected a specification, found {spec}");
    spec.arg(6).arg(0).clone().into()
}
