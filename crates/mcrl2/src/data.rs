//! Data expressions: variables, operator identifiers, applications and the
//! builtin boolean and comparison operators. Every operator identifier and
//! variable carries its sort as its second child.

use mcrl2rust_aterm::{ATerm, ATermList, TermPool};

use crate::sort;

fn name_term(tp: &mut TermPool, name: &str) -> ATerm {
    let symbol = tp.create_symbol_quoted(name, 0);
    tp.create(&symbol, &[])
}

/// A data variable with the given name and sort.
pub fn variable(tp: &mut TermPool, name: &str, sort: &ATerm) -> ATerm {
    let name_term = name_term(tp, name);
    let symbol = tp.create_symbol("DataVarId", 2);
    tp.create(&symbol, &[name_term, sort.clone()])
}

/// An operator identifier with the given name and sort.
pub fn op_id(tp: &mut TermPool, name: &str, sort: &ATerm) -> ATerm {
    let name_term = name_term(tp, name);
    let symbol = tp.create_symbol("OpId", 2);
    tp.create(&symbol, &[name_term, sort.clone()])
}

/// The application of head to the given arguments.
pub fn apply(tp: &mut TermPool, head: &ATerm, arguments: &[ATerm]) -> ATerm {
    debug_assert!(!arguments.is_empty(), "An application has arguments");
    let argument_list = tp.list(arguments);
    let symbol = tp.create_symbol("DataAppl", 2);
    tp.create(&symbol, &[head.clone(), argument_list])
}

/// The distinguished nil term used for absent time stamps.
pub fn nil(tp: &mut TermPool) -> ATerm {
    let symbol = tp.create_symbol("Nil", 0);
    tp.create(&symbol, &[])
}

/// A conditional equation; the condition is [nil] when absent.
pub fn data_equation(
    tp: &mut TermPool,
    variables: &[ATerm],
    condition: &ATerm,
    lhs: &ATerm,
    rhs: &ATerm,
) -> ATerm {
    let variable_list = tp.list(variables);
    let symbol = tp.create_symbol("DataEqn", 4);
    tp.create(
        &symbol,
        &[variable_list, condition.clone(), lhs.clone(), rhs.clone()],
    )
}

pub fn is_variable(t: &ATerm) -> bool {
    t.head_symbol().name() == "DataVarId" && t.head_symbol().arity() == 2
}

pub fn is_op_id(t: &ATerm) -> bool {
    t.head_symbol().name() == "OpId" && t.head_symbol().arity() == 2
}

pub fn is_application(t: &ATerm) -> bool {
    t.head_symbol().name() == "DataAppl" && t.head_symbol().arity() == 2
}

pub fn is_nil(t: &ATerm) -> bool {
    t.head_symbol().name() == "Nil" && t.head_symbol().arity() == 0
}

fn binder(tp: &mut TermPool, name: &str, variables: &[ATerm], body: &ATerm) -> ATerm {
    debug_assert!(!variables.is_empty(), "A binder binds at least one variable");
    let variable_list = tp.list(variables);
    let symbol = tp.create_symbol(name, 2);
    tp.create(&symbol, &[variable_list, body.clone()])
}

/// A universally quantified expression.
pub fn forall_binder(tp: &mut TermPool, variables: &[ATerm], body: &ATerm) -> ATerm {
    binder(tp, "Forall", variables, body)
}

/// An existentially quantified expression.
pub fn exists_binder(tp: &mut TermPool, variables: &[ATerm], body: &ATerm) -> ATerm {
    binder(tp, "Exists", variables, body)
}

/// A lambda abstraction.
pub fn lambda_binder(tp: &mut TermPool, variables: &[ATerm], body: &ATerm) -> ATerm {
    binder(tp, "Lambda", variables, body)
}

/// A where clause: a body with local definitions var = expression.
pub fn where_clause(tp: &mut TermPool, body: &ATerm, definitions: &[ATerm]) -> ATerm {
    let definition_list = tp.list(definitions);
    let symbol = tp.create_symbol("Whr", 2);
    tp.create(&symbol, &[body.clone(), definition_list])
}

/// A local definition of a where clause.
pub fn where_definition(tp: &mut TermPool, variable: &ATerm, expression: &ATerm) -> ATerm {
    debug_assert!(is_variable(variable), "A definition binds a variable");
    let symbol = tp.create_symbol("DataVarIdInit", 2);
    tp.create(&symbol, &[variable.clone(), expression.clone()])
}

/// Returns true iff the expression binds variables: a quantifier or lambda.
pub fn is_binder(t: &ATerm) -> bool {
    let name = t.head_symbol().name();
    (name == "Forall" || name == "Exists" || name == "Lambda") && t.head_symbol().arity() == 2
}

pub fn is_where_clause(t: &ATerm) -> bool {
    t.head_symbol().name() == "Whr" && t.head_symbol().arity() == 2
}

pub fn is_data_expression(t: &ATerm) -> bool {
    is_variable(t) || is_op_id(t) || is_application(t) || is_binder(t) || is_where_clause(t)
}

/// The name of a variable or operator identifier.
pub fn name(t: &ATerm) -> &str {
    debug_assert!(
        is_variable(t) || is_op_id(t),
        "Expected a variable or operator identifier, found {t}"
    );
    t.arg(0).head_symbol().name()
}

/// The head of an application spine; for other expressions the expression
/// itself.
pub fn head_of(t: &ATerm) -> ATerm {
    let mut current = t.clone();
    while is_application(&current) {
        current = current.arg(0).clone();
    }
    current
}

/// All arguments of an application spine, outermost last.
pub fn args_of(t: &ATerm) -> Vec<ATerm> {
    let mut spine = Vec::new();
    let mut current = t.clone();
    while is_application(&current) {
        spine.push(current.clone());
        current = current.arg(0).clone();
    }

    let mut result = Vec::new();
    for application in spine.iter().rev() {
        let arguments: ATermList<ATerm> = application.arg(1).clone().into();
        result.extend(arguments.iter());
    }
    result
}

/// The sort of a data expression.
pub fn sort_of(t: &ATerm) -> ATerm {
    if is_variable(t) || is_op_id(t) {
        return t.arg(1).clone();
    }

    debug_assert!(is_application(t), "Expected a data expression, found {t}");
    sort::codomain(&sort_of(&t.arg(0).clone()))
}

/// The builtin operators. Each call interns the same operator identifier, so
/// recognising them is a pointer comparison.
pub fn true_term(tp: &mut TermPool) -> ATerm {
    let bool_sort = sort::bool_sort(tp);
    op_id(tp, "true", &bool_sort)
}

pub fn false_term(tp: &mut TermPool) -> ATerm {
    let bool_sort = sort::bool_sort(tp);
    op_id(tp, "false", &bool_sort)
}

fn binary_bool_op(tp: &mut TermPool, name: &str) -> ATerm {
    let bool_sort = sort::bool_sort(tp);
    let sort = sort::sort_arrow(tp, &[bool_sort.clone(), bool_sort.clone()], &bool_sort);
    op_id(tp, name, &sort)
}

pub fn and(tp: &mut TermPool, lhs: &ATerm, rhs: &ATerm) -> ATerm {
    let op = binary_bool_op(tp, "&&");
    apply(tp, &op, &[lhs.clone(), rhs.clone()])
}

pub fn or(tp: &mut TermPool, lhs: &ATerm, rhs: &ATerm) -> ATerm {
    let op = binary_bool_op(tp, "||");
    apply(tp, &op, &[lhs.clone(), rhs.clone()])
}

pub fn not(tp: &mut TermPool, argument: &ATerm) -> ATerm {
    let bool_sort = sort::bool_sort(tp);
    let sort = sort::sort_arrow(tp, &[bool_sort.clone()], &bool_sort);
    let op = op_id(tp, "!", &sort);
    apply(tp, &op, &[argument.clone()])
}

/// The equality operator for the given sort.
pub fn eq_op(tp: &mut TermPool, sort: &ATerm) -> ATerm {
    let bool_sort = sort::bool_sort(tp);
    let op_sort = sort::sort_arrow(tp, &[sort.clone(), sort.clone()], &bool_sort);
    op_id(tp, "==", &op_sort)
}

pub fn equal(tp: &mut TermPool, lhs: &ATerm, rhs: &ATerm) -> ATerm {
    let op = eq_op(tp, &sort_of(lhs));
    apply(tp, &op, &[lhs.clone(), rhs.clone()])
}

/// The less-than-or-equal operator applied to two expressions of equal sort.
pub fn less_equal(tp: &mut TermPool, lhs: &ATerm, rhs: &ATerm) -> ATerm {
    let bool_sort = sort::bool_sort(tp);
    let lhs_sort = sort_of(lhs);
    let op_sort = sort::sort_arrow(tp, &[lhs_sort.clone(), lhs_sort], &bool_sort);
    let op = op_id(tp, "<=", &op_sort);
    apply(tp, &op, &[lhs.clone(), rhs.clone()])
}

/// An existential quantification marker around a boolean expression. The
/// body is typically the application of a generated predicate to the
/// variables that remain free.
pub fn exists(tp: &mut TermPool, body: &ATerm) -> ATerm {
    let bool_sort = sort::bool_sort(tp);
    let op_sort = sort::sort_arrow(tp, &[bool_sort.clone()], &bool_sort);
    let op = op_id(tp, "exists", &op_sort);
    apply(tp, &op, &[body.clone()])
}

/// if-then-else on the given sort.
pub fn if_op(tp: &mut TermPool, sort: &ATerm) -> ATerm {
    let bool_sort = sort::bool_sort(tp);
    let op_sort = sort::sort_arrow(tp, &[bool_sort, sort.clone(), sort.clone()], sort);
    op_id(tp, "if", &op_sort)
}

/// A positive number literal, represented as a constant of sort Pos.
pub fn pos_literal(tp: &mut TermPool, value: u64) -> ATerm {
    debug_assert!(value >= 1, "Pos literals start at one");
    let pos_sort = sort::pos_sort(tp);
    op_id(tp, &value.to_string(), &pos_sort)
}

pub fn is_true(tp: &mut TermPool, t: &ATerm) -> bool {
    *t == true_term(tp)
}

pub fn is_false(tp: &mut TermPool, t: &ATerm) -> bool {
    *t == false_term(tp)
}

fn is_binary_application_of(tp: &mut TermPool, t: &ATerm, op: &str) -> bool {
    if !is_application(t) {
        return false;
    }
    let head = t.arg(0).clone();
    head == binary_bool_op(tp, op)
}

pub fn is_and(tp: &mut TermPool, t: &ATerm) -> bool {
    is_binary_application_of(tp, t, "&&")
}

pub fn is_or(tp: &mut TermPool, t: &ATerm) -> bool {
    is_binary_application_of(tp, t, "||")
}

/// Returns the two operands of a conjunction or disjunction.
pub fn binary_operands(t: &ATerm) -> (ATerm, ATerm) {
    debug_assert!(is_application(t), "Expected an application, found {t}");
    let arguments: ATermList<ATerm> = t.arg(1).clone().into();
    let mut iter = arguments.iter();
    let lhs = iter.next().expect("A binary operator has two operands");
    let rhs = iter.next().expect("A binary operator has two operands");
    (lhs, rhs)
}

/// Returns (lhs, rhs) iff the term is an application of the equality operator.
pub fn match_equality(t: &ATerm) -> Option<(ATerm, ATerm)> {
    if !is_application(t) {
        return None;
    }

    let head = t.arg(0).clone();
    if !is_op_id(&head) || name(&head) != "==" {
        return None;
    }

    let (lhs, rhs) = binary_operands(t);
    Some((lhs, rhs))
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_data_constructors() {
        let mut tp = TermPool::new();

        let nat = sort::nat_sort(&mut tp);
        let x = variable(&mut tp, "x", &nat);
        assert!(is_variable(&x));
        assert_eq!(name(&x), "x");
        assert_eq!(sort_of(&x), nat);

        let bool_sort = sort::bool_sort(&mut tp);
        let f_sort = sort::sort_arrow(&mut tp, &[nat.clone()], &bool_sort);
        let f = op_id(&mut tp, "f", &f_sort);
        let fx = apply(&mut tp, &f, &[x.clone()]);

        assert!(is_application(&fx));
        assert_eq!(sort_of(&fx), bool_sort);
        assert_eq!(head_of(&fx), f);
        assert_eq!(args_of(&fx), vec![x]);
    }

    #[test]
    fn test_boolean_builtins() {
        let mut tp = TermPool::new();

        let t = true_term(&mut tp);
        let f = false_term(&mut tp);
        assert!(is_true(&mut tp, &t));
        assert!(!is_true(&mut tp, &f));

        let conjunction = and(&mut tp, &t, &f);
        assert!(is_and(&mut tp, &conjunction));
        assert!(!is_or(&mut tp, &conjunction));

        let (lhs, rhs) = binary_operands(&conjunction);
        assert_eq!(lhs, t);
        assert_eq!(rhs, f);
    }

    #[test]
    fn test_match_equality() {
        let mut tp = TermPool::new();

        let nat = sort::nat_sort(&mut tp);
        let x = variable(&mut tp, "x", &nat);
        let zero = op_id(&mut tp, "0", &nat);

        let equality = equal(&mut tp, &x, &zero);
        assert_eq!(match_equality(&equality), Some((x.clone(), zero)));

        let conjunction = {
            let t = true_term(&mut tp);
            and(&mut tp, &equality, &t)
        };
        assert_eq!(match_equality(&conjunction), None);
    }
}
