use std::fmt;

use mcrl2rust_aterm::{ATerm, ATermList};
use mcrl2rust_mcrl2::data;

/// A single conditional rewrite rule: forall variables. lhs = rhs if
/// condition. An absent condition is represented by nil.
#[derive(Clone, PartialEq, Eq)]
pub struct RewriteRule {
    pub variables: Vec<ATerm>,
    pub condition: ATerm,
    pub lhs: ATerm,
    pub rhs: ATerm,
}

impl RewriteRule {
    /// Reads a rule from a DataEqn term.
    pub fn from_equation(equation: &ATerm) -> RewriteRule {
        debug_assert!(
            equation.head_symbol().name() == "DataEqn",
            "Expected an equation, found {equation}"
        );

        let variables: ATermList<ATerm> = equation.arg(0).clone().into();
        RewriteRule {
            variables: variables.iter().collect(),
            condition: equation.arg(1).clone(),
            lhs: equation.arg(2).clone(),
            rhs: equation.arg(3).clone(),
        }
    }

    /// The head operator identifier of the left hand side.
    pub fn head(&self) -> ATerm {
        data::head_of(&self.lhs)
    }
}

impl fmt::Display for RewriteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if data::is_nil(&self.condition) {
            write!(f, "{} = {}", self.lhs, self.rhs)
        } else {
            write!(f, "{} = {} if {}", self.lhs, self.rhs, self.condition)
        }
    }
}

/// The rewrite rules extracted from a data specification. Rules keep their
/// input order; for a given head symbol they are tried in that order.
#[derive(Clone, Default)]
pub struct RewriteSpecification {
    pub rules: Vec<RewriteRule>,
}

impl RewriteSpecification {
    pub fn new() -> RewriteSpecification {
        RewriteSpecification::default()
    }

    /// Reads the rules from a list of DataEqn terms.
    pub fn from_equations<'a>(equations: impl IntoIterator<Item = &'a ATerm>) -> RewriteSpecification {
        RewriteSpecification {
            rules: equations.into_iter().map(RewriteRule::from_equation).collect(),
        }
    }

    pub fn add_rule(&mut self, rule: RewriteRule) {
        self.rules.push(rule);
    }
}

impl fmt::Display for RewriteSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rewrite rules:")?;
        for rule in &self.rules {
            writeln!(f, "{}", rule)?;
        }
        Ok(())
    }
}
