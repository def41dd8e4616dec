//! The innermost rewrite strategy over a list-shaped internal term form.
//!
//! Every application f(t1, ..., tn) is converted to the cons-list
//! [f, t1', ..., tn']; variables and operator identifiers represent
//! themselves. Rewriting normalises the arguments of a redex before trying
//! the rules for its head symbol.

use log::trace;
use mcrl2rust_aterm::{ATerm, ATermList, TermPool};
use mcrl2rust_mcrl2::data;
use rustc_hash::FxHashMap;

use crate::matching::{instantiate, match_term, Bindings};
use crate::{RewriteEngine, RewriteSpecification, RewritingStatistics, SubstitutionEnv};

/// A rule with its terms converted to the internal form.
struct InternalRule {
    condition: Option<ATerm>,
    lhs: ATerm,
    rhs: ATerm,
}

pub struct InnermostRewriter {
    /// The rules per head symbol, in installation order.
    rules: FxHashMap<ATerm, Vec<InternalRule>>,
    /// Cache of conversions of closed terms to the internal form.
    conversion_cache: FxHashMap<ATerm, ATerm>,
    pub stats: RewritingStatistics,
}

impl RewriteEngine for InnermostRewriter {
    fn rewrite_under(&mut self, tp: &mut TermPool, env: &SubstitutionEnv, term: &ATerm) -> ATerm {
        let internal = self.to_internal(tp, term);
        let normal = self.rewrite_aux(tp, env, &internal);
        self.from_internal(tp, &normal)
    }

    fn add_rule(&mut self, tp: &mut TermPool, rule: &crate::RewriteRule) {
        let head = rule.head();
        let internal = InternalRule {
            condition: if data::is_nil(&rule.condition) {
                None
            } else {
                Some(self.to_internal(tp, &rule.condition))
            },
            lhs: self.to_internal(tp, &rule.lhs),
            rhs: self.to_internal(tp, &rule.rhs),
        };
        self.rules.entry(head).or_default().push(internal);
    }
}

impl InnermostRewriter {
    pub fn new(tp: &mut TermPool, specification: &RewriteSpecification) -> InnermostRewriter {
        let mut rewriter = InnermostRewriter {
            rules: FxHashMap::default(),
            conversion_cache: FxHashMap::default(),
            stats: RewritingStatistics::default(),
        };

        for rule in &specification.rules {
            let head = rule.head();
            let internal = InternalRule {
                condition: if data::is_nil(&rule.condition) {
                    None
                } else {
                    Some(rewriter.to_internal(tp, &rule.condition))
                },
                lhs: rewriter.to_internal(tp, &rule.lhs),
                rhs: rewriter.to_internal(tp, &rule.rhs),
            };
            rewriter.rules.entry(head).or_default().push(internal);
        }

        rewriter
    }

    /// Converts a data expression to the internal list form. Conversions of
    /// closed terms are cached; converting twice yields the shared result.
    pub fn to_internal(&mut self, tp: &mut TermPool, t: &ATerm) -> ATerm {
        if let Some(cached) = self.conversion_cache.get(t) {
            return cached.clone();
        }

        let result = if data::is_application(t) {
            let head = data::head_of(t);
            let arguments = data::args_of(t);

            let mut elements = Vec::with_capacity(arguments.len() + 1);
            elements.push(self.to_internal(tp, &head));
            for argument in &arguments {
                elements.push(self.to_internal(tp, argument));
            }
            tp.list(&elements)
        } else {
            t.clone()
        };

        if is_closed(t) {
            self.conversion_cache.insert(t.clone(), result.clone());
        }
        result
    }

    /// Converts an internal term back to a data expression.
    pub fn from_internal(&mut self, tp: &mut TermPool, t: &ATerm) -> ATerm {
        if !t.is_list() {
            return t.clone();
        }

        let elements: Vec<ATerm> = ATermList::<ATerm>::from(t.clone()).iter().collect();
        debug_assert!(elements.len() >= 2, "An internal application has arguments");

        let head = self.from_internal(tp, &elements[0]);
        let arguments: Vec<ATerm> = elements[1..]
            .iter()
            .map(|argument| self.from_internal(tp, argument))
            .collect();
        data::apply(tp, &head, &arguments)
    }

    fn rewrite_aux(&mut self, tp: &mut TermPool, env: &SubstitutionEnv, t: &ATerm) -> ATerm {
        self.stats.recursions += 1;

        if data::is_variable(t) {
            return match env.get(t) {
                Some(bound) => {
                    let bound = bound.clone();
                    self.to_internal(tp, &bound)
                }
                None => t.clone(),
            };
        }

        if t.is_list() {
            // Normalise the arguments first, then the rules for the head
            // symbol apply at this position.
            let elements: Vec<ATerm> = ATermList::<ATerm>::from(t.clone()).iter().collect();

            let head = self.rewrite_aux(tp, env, &elements[0]);
            let mut normalised = Vec::with_capacity(elements.len());
            normalised.push(head.clone());
            for argument in &elements[1..] {
                normalised.push(self.rewrite_aux(tp, env, argument));
            }

            let subject = tp.list(&normalised);
            return self.apply_rules(tp, env, &head, &subject);
        }

        // A constant: rules for the bare symbol may still apply.
        self.apply_rules(tp, env, t, &t.clone())
    }

    /// Tries the rules for the head symbol in installation order; fires the
    /// first whose condition holds and normalises the instantiated right
    /// hand side.
    fn apply_rules(&mut self, tp: &mut TermPool, env: &SubstitutionEnv, head: &ATerm, subject: &ATerm) -> ATerm {
        let count = match self.rules.get(head) {
            Some(rules) => rules.len(),
            None => return subject.clone(),
        };

        // The candidate rules are picked by index to appease the borrow
        // checker; rule vectors are never mutated after construction.
        for index in 0..count {
            let mut bindings = Bindings::default();
            let (matched, condition, rhs) = {
                let rule = &self.rules[head][index];
                (
                    match_term(&rule.lhs, subject, &mut bindings),
                    rule.condition.clone(),
                    rule.rhs.clone(),
                )
            };

            if !matched {
                continue;
            }

            if let Some(condition) = condition {
                let instantiated = instantiate(tp, &bindings, &condition);
                let normalised = self.rewrite_aux(tp, env, &instantiated);
                if normalised != data::true_term(tp) {
                    continue;
                }
            }

            trace!("rewriting {} with rule {}", subject, index);
            self.stats.rewrite_steps += 1;
            let result = instantiate(tp, &bindings, &rhs);
            return self.rewrite_aux(tp, env, &result);
        }

        subject.clone()
    }
}

/// Returns true iff the term contains no data variables.
pub(crate) fn is_closed(t: &ATerm) -> bool {
    !t.iter().any(|subterm| data::is_variable(&subterm))
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::test_specification::peano_specification;
    use mcrl2rust_mcrl2::sort;

    #[test]
    fn test_innermost_no_rules() {
        let mut tp = TermPool::new();
        let specification = RewriteSpecification::new();
        let mut rewriter = InnermostRewriter::new(&mut tp, &specification);

        let nat = sort::nat_sort(&mut tp);
        let f_sort = sort::sort_arrow(&mut tp, &[nat.clone()], &nat);
        let f = data::op_id(&mut tp, "f", &f_sort);
        let zero = data::op_id(&mut tp, "zero", &nat);
        let term = data::apply(&mut tp, &f, &[zero]);

        assert_eq!(
            rewriter.rewrite(&mut tp, &term),
            term,
            "Should be in normal form for no rewrite rules"
        );
    }

    #[test]
    fn test_innermost_peano_addition() {
        let mut tp = TermPool::new();
        let (specification, terms) = peano_specification(&mut tp);
        let mut rewriter = InnermostRewriter::new(&mut tp, &specification);

        // plus(s(zero), s(zero)) reduces to s(s(zero)).
        let result = rewriter.rewrite(&mut tp, &terms.one_plus_one);
        assert_eq!(result, terms.two);

        // Rewriting is idempotent.
        assert_eq!(rewriter.rewrite(&mut tp, &result), terms.two);
    }

    #[test]
    fn test_innermost_conditional_rule() {
        let mut tp = TermPool::new();
        let (specification, terms) = peano_specification(&mut tp);
        let mut rewriter = InnermostRewriter::new(&mut tp, &specification);

        // even(s(s(zero))) holds by the conditional rule.
        let result = rewriter.rewrite(&mut tp, &terms.even_two);
        let expected = data::true_term(&mut tp);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_innermost_open_term() {
        let mut tp = TermPool::new();
        let (specification, terms) = peano_specification(&mut tp);
        let mut rewriter = InnermostRewriter::new(&mut tp, &specification);

        // plus(zero, x) reduces to the variable x itself.
        let result = rewriter.rewrite(&mut tp, &terms.zero_plus_x);
        assert_eq!(result, terms.x);

        // Under a substitution binding x, the bound value is used.
        let mut env = SubstitutionEnv::new();
        env.set(&terms.x, &terms.two);
        let result = rewriter.rewrite_under(&mut tp, &env, &terms.zero_plus_x);
        assert_eq!(result, terms.two);
    }
}
