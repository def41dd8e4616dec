//! The catalogue of generated enumerated datatypes. Each Enum_k sort has k
//! fresh constants, an equality with the identity law, and per target sort a
//! case function case_k(e, x_1, ..., x_k) selecting the argument named by e.

use mcrl2rust_aterm::{ATerm, TermPool};
use mcrl2rust_mcrl2::{data, sort};

use crate::context::Lineariser;

/// A generated enumerated sort of a given size. Size two reuses Bool with
/// the constants true and false.
pub struct EnumeratedType {
    pub size: usize,
    pub sort_id: ATerm,
    pub elements: Vec<ATerm>,
    /// The case functions generated so far, one per target sort.
    pub case_functions: Vec<ATerm>,
}

/// An enumerated type together with the sum variable used to quantify over
/// it in a clustered summand.
pub struct EnumUsage {
    pub type_index: usize,
    pub variable: ATerm,
}

impl Lineariser {
    /// Returns the index of the enumerated type of the given size, creating
    /// the sort, its constants and its equality equations on first request.
    pub(crate) fn create_enumerated_type(&mut self, tp: &mut TermPool, size: usize) -> usize {
        debug_assert!(size >= 1, "an enumerated type has at least one element");

        if let Some(index) = self.enum_types.iter().position(|e| e.size == size) {
            return index;
        }

        let entry = if size == 2 {
            EnumeratedType {
                size,
                sort_id: sort::bool_sort(tp),
                elements: vec![data::true_term(tp), data::false_term(tp)],
                case_functions: Vec::new(),
            }
        } else {
            let name = self.fresh.fresh_name(tp, &format!("Enum{size}"));
            let sort_id = sort::sort_id(tp, &name);
            self.insert_sort(&sort_id)
                .expect("a fresh enumerated sort cannot clash");

            let mut elements = Vec::with_capacity(size);
            for position in 0..size {
                let element_name = self.fresh.fresh_name(tp, &format!("e{position}_{size}"));
                let element = data::op_id(tp, &element_name, &sort_id);
                self.insert_constructor(&element)
                    .expect("a fresh enumeration constant cannot clash");
                elements.push(element);
            }

            // The equality on the new sort: v == v reduces to true and
            // distinct constants reduce to false.
            let equality = data::eq_op(tp, &sort_id);
            self.insert_mapping(&equality)
                .expect("the equality of a fresh sort cannot clash");

            let v = self.fresh.fresh_variable(tp, "v_enum", &sort_id);
            self.declare_equation_variables(&[v.clone()]);
            let lhs = data::apply(tp, &equality, &[v.clone(), v.clone()]);
            let true_term = data::true_term(tp);
            self.new_equation(tp, None, &lhs, &true_term);
            for first in &elements {
                for second in &elements {
                    if first != second {
                        let lhs = data::apply(tp, &equality, &[first.clone(), second.clone()]);
                        let false_term = data::false_term(tp);
                        self.new_equation(tp, None, &lhs, &false_term);
                    }
                }
            }
            self.end_equation_section();

            EnumeratedType {
                size,
                sort_id,
                elements,
                case_functions: Vec::new(),
            }
        };

        self.enum_types.push(entry);
        self.enum_types.len() - 1
    }

    /// The constant of the enumerated type representing the given position.
    pub(crate) fn enum_element(&self, type_index: usize, position: usize) -> ATerm {
        self.enum_types[type_index].elements[position].clone()
    }

    /// The case function of the enumerated type on the given target sort.
    /// The callers must have requested it beforehand.
    pub(crate) fn find_case_function(&self, type_index: usize, target_sort: &ATerm) -> ATerm {
        for function in &self.enum_types[type_index].case_functions {
            let function_sort = function.arg(1).clone();
            if sort::codomain(&function_sort) == *target_sort {
                return function.clone();
            }
        }
        panic!("searching for a nonexisting case function on sort {target_sort}");
    }

    /// Declares the case function of the enumerated type on the target sort,
    /// unless it exists. For the boolean enumerated type on a builtin sort
    /// the if function is used instead of a fresh one.
    pub(crate) fn create_case_function(
        &mut self,
        tp: &mut TermPool,
        type_index: usize,
        target_sort: &ATerm,
    ) {
        let exists = self.enum_types[type_index].case_functions.iter().any(|function| {
            sort::codomain(&function.arg(1).clone()) == *target_sort
        });
        if exists {
            return;
        }

        let entry = &self.enum_types[type_index];
        let enum_sort = entry.sort_id.clone();
        let size = entry.size;

        let bool_sort = sort::bool_sort(tp);
        if enum_sort == bool_sort && size == 2 {
            let builtin = ["Bool", "Pos", "Nat", "Int", "Real"]
                .iter()
                .any(|name| *target_sort == sort::sort_id(tp, name));
            if builtin {
                let if_function = data::if_op(tp, target_sort);
                self.enum_types[type_index].case_functions.push(if_function);
                return;
            }
        }

        let mut domain = vec![enum_sort.clone()];
        domain.extend(std::iter::repeat(target_sort.clone()).take(size));
        let function_sort = sort::sort_arrow(tp, &domain, target_sort);

        let base = if sort::is_sort_arrow(target_sort) {
            format!("C{size}_fun")
        } else {
            format!("C{size}_{}", sort::sort_name(target_sort))
        };
        let name = self.fresh.fresh_name(tp, &base);
        let case_function = data::op_id(tp, &name, &function_sort);
        self.insert_mapping(&case_function)
            .expect("a fresh case function cannot clash");
        self.enum_types[type_index].case_functions.push(case_function.clone());

        self.define_case_equations(tp, type_index, &case_function, target_sort);
    }

    fn define_case_equations(
        &mut self,
        tp: &mut TermPool,
        type_index: usize,
        case_function: &ATerm,
        target_sort: &ATerm,
    ) {
        let size = self.enum_types[type_index].size;
        let enum_sort = self.enum_types[type_index].sort_id.clone();

        // case(e, x, ..., x) = x for any selector e.
        let x = self.fresh.fresh_variable(tp, "x", target_sort);
        let e = self.fresh.fresh_variable(tp, "e", &enum_sort);

        let mut constant_arguments = vec![e.clone()];
        constant_arguments.extend(std::iter::repeat(x.clone()).take(size));
        let lhs = data::apply(tp, case_function, &constant_arguments);

        self.declare_equation_variables(&[e.clone(), x.clone()]);
        self.new_equation(tp, None, &lhs, &x);
        self.end_equation_section();

        // case(e_i, y_1, ..., y_k) = y_i per constant.
        let mut selectors = Vec::with_capacity(size);
        for _ in 0..size {
            selectors.push(self.fresh.fresh_variable(tp, "y", target_sort));
        }

        self.declare_equation_variables(&selectors);
        let elements = self.enum_types[type_index].elements.clone();
        for (element, selected) in elements.iter().zip(&selectors) {
            let mut arguments = vec![element.clone()];
            arguments.extend(selectors.iter().cloned());
            let lhs = data::apply(tp, case_function, &arguments);
            self.new_equation(tp, None, &lhs, selected);
        }
        self.end_equation_section();
    }

    /// Creates the enumerated type of the given size with case functions for
    /// every sort the clustered summand needs: the action argument sorts,
    /// the parameter sorts, the booleans of the condition and, when time is
    /// used, the reals of the time stamps.
    pub(crate) fn generate_enumerated_datatype(
        &mut self,
        tp: &mut TermPool,
        size: usize,
        action_sorts: &[ATerm],
        parameter_sorts: &[ATerm],
    ) -> EnumUsage {
        let type_index = self.create_enumerated_type(tp, size);

        let enum_sort = self.enum_types[type_index].sort_id.clone();
        let variable = self.fresh.fresh_variable(tp, "e", &enum_sort);
        self.insert_variable(&variable, true)
            .expect("a fresh enumeration variable cannot clash");

        for target_sort in action_sorts.iter().chain(parameter_sorts) {
            self.create_case_function(tp, type_index, target_sort);
        }

        let bool_sort = sort::bool_sort(tp);
        self.create_case_function(tp, type_index, &bool_sort);

        if self.time_used {
            let real_sort = sort::real_sort(tp);
            self.create_case_function(tp, type_index, &real_sort);
        }

        EnumUsage {
            type_index,
            variable,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::LinOptions;

    #[test]
    fn test_enumerated_type_is_cached() {
        let mut tp = TermPool::new();
        let mut lin = Lineariser::new(LinOptions::default());

        let first = lin.create_enumerated_type(&mut tp, 3);
        let second = lin.create_enumerated_type(&mut tp, 3);
        assert_eq!(first, second);
        assert_eq!(lin.enum_types[first].elements.len(), 3);

        // Size two reuses the booleans.
        let bools = lin.create_enumerated_type(&mut tp, 2);
        let expected = sort::bool_sort(&mut tp);
        assert_eq!(lin.enum_types[bools].sort_id, expected);
    }

    #[test]
    fn test_case_function_equations() {
        let mut tp = TermPool::new();
        let mut lin = Lineariser::new(LinOptions::default());

        let nat = sort::nat_sort(&mut tp);
        lin.insert_sort(&nat).unwrap();

        let equations_before = lin.equations.len();
        let type_index = lin.create_enumerated_type(&mut tp, 3);
        lin.create_case_function(&mut tp, type_index, &nat);

        let case_function = lin.find_case_function(type_index, &nat);
        assert_eq!(sort::codomain(&case_function.arg(1).clone()), nat);

        // The identity law plus one equation per constant, on top of the
        // equality equations of the new sort.
        assert!(lin.equations.len() >= equations_before + 4);
    }
}
