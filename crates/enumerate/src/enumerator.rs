use ahash::AHashMap;
use log::warn;
use thiserror::Error;

use mcrl2rust_aterm::{ATerm, TermPool};
use mcrl2rust_mcrl2::{data, sort, substitution, FreshNameGenerator};
use mcrl2rust_rewrite::{RewriteEngine, SubstitutionEnv};

/// The initial bound on the number of fresh variables introduced during a
/// single enumeration.
const MAX_VARS_INIT: usize = 1000;
/// The factor by which the bound grows when it is exceeded.
const MAX_VARS_FACTOR: usize = 5;

#[derive(Error, Debug)]
pub enum EnumerateError {
    #[error("cannot enumerate the function sort {0}")]
    FunctionSort(String),

    #[error("sort {0} has no constructors to enumerate")]
    NoConstructors(String),

    #[error("the condition {0} does not rewrite to true or false")]
    NotBoolean(String),
}

/// One solution: a value for every requested variable, in request order.
pub type Solution = Vec<(ATerm, ATerm)>;

/// Enumerates variable assignments that satisfy a predicate, by bounded
/// depth-first search over the constructors of each variable's sort.
pub struct Enumerator {
    /// The constructors per sort identifier.
    constructors: AHashMap<ATerm, Vec<ATerm>>,
    max_vars: usize,
}

/// An open search node: the instantiations so far, with the variables that
/// are still open and the predicate under those instantiations.
struct SearchNode {
    assignment: Vec<(ATerm, ATerm)>,
    open_variables: Vec<ATerm>,
    predicate: ATerm,
}

impl Enumerator {
    /// Creates an enumerator for the given constructor declarations, a list
    /// of OpId terms whose target sort determines the sort they construct.
    pub fn new(constructor_declarations: &[ATerm]) -> Enumerator {
        let mut constructors: AHashMap<ATerm, Vec<ATerm>> = AHashMap::new();
        for declaration in constructor_declarations {
            debug_assert!(
                data::is_op_id(declaration),
                "Constructors are operator identifiers, found {declaration}"
            );
            let target = sort::target_sort(&declaration.arg(1).clone());
            constructors.entry(target).or_default().push(declaration.clone());
        }

        Enumerator {
            constructors,
            max_vars: MAX_VARS_INIT,
        }
    }

    /// Enumerates assignments to the given variables. With `only_true` the
    /// predicate must decide every fully instantiated branch; otherwise any
    /// branch that does not rewrite to false yields its assignment.
    pub fn enumerate(
        &mut self,
        tp: &mut TermPool,
        fresh: &mut FreshNameGenerator,
        rewriter: &mut dyn RewriteEngine,
        variables: &[ATerm],
        predicate: &ATerm,
        only_true: bool,
    ) -> Result<Vec<Solution>, EnumerateError> {
        for variable in variables {
            let var_sort = variable.arg(1).clone();
            if sort::is_sort_arrow(&var_sort) {
                return Err(EnumerateError::FunctionSort(format!("{var_sort}")));
            }
        }

        let env = SubstitutionEnv::new();
        let mut solutions = Vec::new();
        let mut used_vars = 0usize;

        let initial = SearchNode {
            assignment: variables.iter().map(|v| (v.clone(), v.clone())).collect(),
            open_variables: variables.to_vec(),
            predicate: rewriter.rewrite_under(tp, &env, predicate),
        };

        let mut stack = vec![initial];
        while let Some(mut node) = stack.pop() {
            self.eliminate_equalities(tp, &mut node);

            let false_term = data::false_term(tp);
            if node.predicate == false_term {
                continue;
            }

            let true_term = data::true_term(tp);
            if node.open_variables.is_empty() {
                if node.predicate == true_term {
                    solutions.push(node.assignment);
                } else if only_true {
                    return Err(EnumerateError::NotBoolean(format!("{}", node.predicate)));
                } else {
                    solutions.push(node.assignment);
                }
                continue;
            }

            if node.predicate == true_term && !only_true {
                // No instantiation can change the outcome anymore.
                solutions.push(node.assignment);
                continue;
            }

            let variable = node.open_variables.first().expect("open variable").clone();
            let var_sort = variable.arg(1).clone();

            if sort::is_sort_arrow(&var_sort) {
                return Err(EnumerateError::FunctionSort(format!("{var_sort}")));
            }

            let constructors = self
                .constructors
                .get(&var_sort)
                .cloned()
                .ok_or_else(|| EnumerateError::NoConstructors(format!("{var_sort}")))?;

            for constructor in &constructors {
                let constructor_sort = constructor.arg(1).clone();

                // Fresh variables for the constructor arguments become open.
                let mut argument_variables = Vec::new();
                if sort::is_sort_arrow(&constructor_sort) {
                    for domain_sort in sort::domain(&constructor_sort).iter() {
                        argument_variables.push(fresh.fresh_variable(tp, "e", &domain_sort));
                    }
                }

                used_vars += argument_variables.len();
                if used_vars > self.max_vars {
                    warn!(
                        "need more than {} variables to find all valuations of {}",
                        self.max_vars, predicate
                    );
                    self.max_vars *= MAX_VARS_FACTOR;
                }

                let value = if argument_variables.is_empty() {
                    constructor.clone()
                } else {
                    data::apply(tp, constructor, &argument_variables)
                };

                let binding = [(variable.clone(), value)];
                let assignment: Vec<(ATerm, ATerm)> = node
                    .assignment
                    .iter()
                    .map(|(var, term)| {
                        (var.clone(), substitution::substitute_data(tp, &binding, term))
                    })
                    .collect();

                let mut open_variables = argument_variables;
                open_variables.extend(node.open_variables.iter().skip(1).cloned());

                let instantiated = substitution::substitute_data(tp, &binding, &node.predicate);
                let predicate = rewriter.rewrite_under(tp, &env, &instantiated);

                stack.push(SearchNode {
                    assignment,
                    open_variables,
                    predicate,
                });
            }
        }

        Ok(solutions)
    }

    /// If the predicate contains a conjunct x == t (or t == x) with x an
    /// open variable not occurring in t, bind x to t directly and drop the
    /// conjunct. This avoids enumerating the whole sort of x.
    fn eliminate_equalities(&self, tp: &mut TermPool, node: &mut SearchNode) {
        loop {
            let Some((variable, value, remainder)) = find_equality(tp, &node.predicate, &node.open_variables)
            else {
                return;
            };

            let binding = [(variable.clone(), value)];
            node.open_variables.retain(|open| *open != variable);
            node.assignment = node
                .assignment
                .iter()
                .map(|(var, term)| (var.clone(), substitution::substitute_data(tp, &binding, term)))
                .collect();
            node.predicate = substitution::substitute_data(tp, &binding, &remainder);
        }
    }
}

/// Searches the conjunction for an equality that binds an open variable.
/// Returns the variable, its value and the predicate without that conjunct.
fn find_equality(tp: &mut TermPool, predicate: &ATerm, open_variables: &[ATerm]) -> Option<(ATerm, ATerm, ATerm)> {
    if data::is_and(tp, predicate) {
        let (lhs, rhs) = data::binary_operands(predicate);
        if let Some((variable, value, remainder)) = find_equality(tp, &lhs, open_variables) {
            let rest = data::and(tp, &remainder, &rhs);
            return Some((variable, value, rest));
        }
        if let Some((variable, value, remainder)) = find_equality(tp, &rhs, open_variables) {
            let rest = data::and(tp, &lhs, &remainder);
            return Some((variable, value, rest));
        }
        return None;
    }

    let (lhs, rhs) = data::match_equality(predicate)?;

    let binds = |variable: &ATerm, value: &ATerm| {
        open_variables.contains(variable) && !substitution::occurs_in_term(variable, value)
    };

    if data::is_variable(&lhs) && binds(&lhs, &rhs) {
        return Some((lhs, rhs, data::true_term(tp)));
    }
    if data::is_variable(&rhs) && binds(&rhs, &lhs) {
        return Some((rhs, lhs, data::true_term(tp)));
    }
    None
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use mcrl2rust_rewrite::{InnermostRewriter, RewriteRule, RewriteSpecification};

    /// Peano naturals with zero and s, and a less-than operator on them.
    fn peano_enumerator(
        tp: &mut TermPool,
    ) -> (Enumerator, RewriteSpecification, ATerm, ATerm, ATerm, ATerm) {
        let peano = sort::sort_id(tp, "Peano");
        let bool_sort = sort::bool_sort(tp);
        let zero = data::op_id(tp, "zero", &peano);
        let s_sort = sort::sort_arrow(tp, &[peano.clone()], &peano);
        let s = data::op_id(tp, "s", &s_sort);
        let lt_sort = sort::sort_arrow(tp, &[peano.clone(), peano.clone()], &bool_sort);
        let lt = data::op_id(tp, "lt", &lt_sort);

        let enumerator = Enumerator::new(&[zero.clone(), s.clone()]);

        // lt(x, zero) = false, lt(zero, s(x)) = true, lt(s(x), s(y)) = lt(x, y)
        let x = data::variable(tp, "x", &peano);
        let y = data::variable(tp, "y", &peano);
        let nil = data::nil(tp);
        let true_term = data::true_term(tp);
        let false_term = data::false_term(tp);

        let mut specification = RewriteSpecification::new();

        let lhs = data::apply(tp, &lt, &[x.clone(), zero.clone()]);
        specification.add_rule(RewriteRule {
            variables: vec![x.clone()],
            condition: nil.clone(),
            lhs,
            rhs: false_term.clone(),
        });

        let s_x = data::apply(tp, &s, &[x.clone()]);
        let s_y = data::apply(tp, &s, &[y.clone()]);
        let lhs = data::apply(tp, &lt, &[zero.clone(), s_x.clone()]);
        specification.add_rule(RewriteRule {
            variables: vec![x.clone()],
            condition: nil.clone(),
            lhs,
            rhs: true_term.clone(),
        });
        let lhs = data::apply(tp, &lt, &[s_x.clone(), s_y.clone()]);
        let rhs = data::apply(tp, &lt, &[x.clone(), y.clone()]);
        specification.add_rule(RewriteRule {
            variables: vec![x.clone(), y.clone()],
            condition: nil,
            lhs,
            rhs,
        });

        (enumerator, specification, peano, zero, s, lt)
    }

    #[test]
    fn test_enumerate_equality() {
        let mut tp = TermPool::new();
        let (mut enumerator, specification, peano, zero, s, _) = peano_enumerator(&mut tp);
        let mut rewriter = InnermostRewriter::new(&mut tp, &specification);
        let mut fresh = FreshNameGenerator::new();

        // v == s(zero) has exactly one solution, found by equality
        // elimination without search.
        let v = data::variable(&mut tp, "v", &peano);
        let one = data::apply(&mut tp, &s, &[zero.clone()]);
        let predicate = data::equal(&mut tp, &v, &one);

        let solutions = enumerator
            .enumerate(&mut tp, &mut fresh, &mut rewriter, &[v.clone()], &predicate, true)
            .unwrap();

        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0][0].0, v);
        assert_eq!(solutions[0][0].1, one);
    }

    #[test]
    fn test_enumerate_by_narrowing() {
        let mut tp = TermPool::new();
        let (mut enumerator, specification, peano, zero, s, lt) = peano_enumerator(&mut tp);
        let mut rewriter = InnermostRewriter::new(&mut tp, &specification);
        let mut fresh = FreshNameGenerator::new();

        // lt(v, s(s(zero))) has the solutions zero and s(zero); the search
        // instantiates v with zero and s(e1) before deciding.
        let v = data::variable(&mut tp, "v", &peano);
        let one = data::apply(&mut tp, &s, &[zero.clone()]);
        let two = data::apply(&mut tp, &s, &[one.clone()]);
        let predicate = data::apply(&mut tp, &lt, &[v.clone(), two.clone()]);

        let solutions = enumerator
            .enumerate(&mut tp, &mut fresh, &mut rewriter, &[v.clone()], &predicate, true)
            .unwrap();

        let mut values: Vec<String> = solutions.iter().map(|s| format!("{}", s[0].1)).collect();
        values.sort();
        assert_eq!(values.len(), 2);
        assert_eq!(solutions.iter().filter(|s| s[0].1 == zero).count(), 1);
        assert_eq!(solutions.iter().filter(|s| s[0].1 == one).count(), 1);
    }

    #[test]
    fn test_enumerate_function_sort_fails() {
        let mut tp = TermPool::new();
        let (mut enumerator, specification, peano, _, _, _) = peano_enumerator(&mut tp);
        let mut rewriter = InnermostRewriter::new(&mut tp, &specification);
        let mut fresh = FreshNameGenerator::new();

        let arrow = sort::sort_arrow(&mut tp, &[peano.clone()], &peano);
        let f = data::variable(&mut tp, "f", &arrow);
        let predicate = data::true_term(&mut tp);

        let result = enumerator.enumerate(&mut tp, &mut fresh, &mut rewriter, &[f], &predicate, true);
        assert!(matches!(result, Err(EnumerateError::FunctionSort(_))));
    }
}
