//! The compact rewrite strategy. The internal form keeps the vector-shaped
//! application nodes of the external representation, which avoids the
//! cons-cell overhead on deeply nested data expressions, and results of
//! closed subterms are cached across calls.

use log::trace;
use mcrl2rust_aterm::{ATerm, ATermList, TermPool};
use mcrl2rust_mcrl2::data;
use rustc_hash::FxHashMap;

use crate::innermost_rewriter::is_closed;
use crate::matching::{instantiate, match_term, Bindings};
use crate::{RewriteEngine, RewriteSpecification, RewritingStatistics, SubstitutionEnv};

struct CompactRule {
    condition: Option<ATerm>,
    lhs: ATerm,
    rhs: ATerm,
}

pub struct CompactRewriter {
    /// The rules per head symbol, in installation order.
    rules: FxHashMap<ATerm, Vec<CompactRule>>,
    /// Normal forms of closed terms, valid independently of the
    /// substitution context.
    normal_forms: FxHashMap<ATerm, ATerm>,
    pub stats: RewritingStatistics,
}

impl RewriteEngine for CompactRewriter {
    fn rewrite_under(&mut self, tp: &mut TermPool, env: &SubstitutionEnv, term: &ATerm) -> ATerm {
        self.rewrite_aux(tp, env, term)
    }

    fn add_rule(&mut self, _tp: &mut TermPool, rule: &crate::RewriteRule) {
        self.rules.entry(rule.head()).or_default().push(CompactRule {
            condition: if data::is_nil(&rule.condition) {
                None
            } else {
                Some(rule.condition.clone())
            },
            lhs: rule.lhs.clone(),
            rhs: rule.rhs.clone(),
        });
        // Cached normal forms may be invalidated by the new rule.
        self.normal_forms.clear();
    }
}

impl CompactRewriter {
    pub fn new(_tp: &mut TermPool, specification: &RewriteSpecification) -> CompactRewriter {
        let mut rules: FxHashMap<ATerm, Vec<CompactRule>> = FxHashMap::default();

        for rule in &specification.rules {
            rules.entry(rule.head()).or_default().push(CompactRule {
                condition: if data::is_nil(&rule.condition) {
                    None
                } else {
                    Some(rule.condition.clone())
                },
                lhs: rule.lhs.clone(),
                rhs: rule.rhs.clone(),
            });
        }

        CompactRewriter {
            rules,
            normal_forms: FxHashMap::default(),
            stats: RewritingStatistics::default(),
        }
    }

    fn rewrite_aux(&mut self, tp: &mut TermPool, env: &SubstitutionEnv, t: &ATerm) -> ATerm {
        self.stats.recursions += 1;

        if let Some(normal) = self.normal_forms.get(t) {
            return normal.clone();
        }

        if data::is_variable(t) {
            return env.get(t).cloned().unwrap_or_else(|| t.clone());
        }

        let result = if data::is_application(t) {
            let head_expr = self.rewrite_aux(tp, env, &t.arg(0).clone());

            let arguments: Vec<ATerm> = ATermList::<ATerm>::from(t.arg(1).clone())
                .iter()
                .collect();
            let normalised: Vec<ATerm> = arguments
                .iter()
                .map(|argument| self.rewrite_aux(tp, env, argument))
                .collect();

            let subject = data::apply(tp, &head_expr, &normalised);
            let head = data::head_of(&subject);
            self.apply_rules(tp, env, &head, &subject)
        } else {
            self.apply_rules(tp, env, &t.clone(), &t.clone())
        };

        if is_closed(t) {
            self.normal_forms.insert(t.clone(), result.clone());
        }
        result
    }

    fn apply_rules(&mut self, tp: &mut TermPool, env: &SubstitutionEnv, head: &ATerm, subject: &ATerm) -> ATerm {
        let count = match self.rules.get(head) {
            Some(rules) => rules.len(),
            None => return subject.clone(),
        };

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

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::test_specification::peano_specification;
    use crate::InnermostRewriter;

    #[test]
    fn test_compact_peano_addition() {
        let mut tp = TermPool::new();
        let (specification, terms) = peano_specification(&mut tp);
        let mut rewriter = CompactRewriter::new(&mut tp, &specification);

        let result = rewriter.rewrite(&mut tp, &terms.one_plus_one);
        assert_eq!(result, terms.two);

        // The closed-term cache serves the second request.
        let again = rewriter.rewrite(&mut tp, &terms.one_plus_one);
        assert_eq!(again, terms.two);
    }

    #[test]
    fn test_strategies_agree() {
        let mut tp = TermPool::new();
        let (specification, terms) = peano_specification(&mut tp);
        let mut compact = CompactRewriter::new(&mut tp, &specification);
        let mut innermost = InnermostRewriter::new(&mut tp, &specification);

        for term in [&terms.one_plus_one, &terms.even_two, &terms.zero_plus_x] {
            let compact_normal = compact.rewrite(&mut tp, term);
            let innermost_normal = innermost.rewrite(&mut tp, term);
            assert_eq!(
                compact_normal, innermost_normal,
                "Both strategies yield the same normal form for {term}"
            );
        }
    }
}
