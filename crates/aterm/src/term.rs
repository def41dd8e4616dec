use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::symbol::Symbol;
use crate::{EMPTY_LIST, LIST_CONS};

/// A handle to a maximally shared term. Cloning a handle is cheap and keeps
/// the term alive; structural equality coincides with sharing, so `==` is a
/// pointer comparison.
pub struct ATerm {
    pub(crate) node: Rc<TermNode>,
}

pub(crate) struct TermNode {
    pub(crate) symbol: Symbol,
    pub(crate) args: Box<[ATerm]>,
    /// The value of an integer term; integer terms have a reserved nullary
    /// head symbol.
    pub(crate) value: Option<i64>,
}

impl ATerm {
    /// Returns the head function symbol of the term.
    pub fn head_symbol(&self) -> &Symbol {
        &self.node.symbol
    }

    /// Returns the indexed argument of the term.
    pub fn arg(&self, index: usize) -> &ATerm {
        debug_assert!(
            index < self.node.symbol.arity(),
            "arg({index}) is not defined for term {:?}",
            self
        );
        &self.node.args[index]
    }

    /// Returns the arguments of the term.
    pub fn arguments(&self) -> &[ATerm] {
        &self.node.args
    }

    /// Returns true iff this is an integer term.
    pub fn is_int(&self) -> bool {
        self.node.value.is_some()
    }

    /// Returns the value of an integer term.
    pub fn int_value(&self) -> Option<i64> {
        self.node.value
    }

    /// Returns true iff this is a list term, i.e. a cons cell or the empty
    /// list.
    pub fn is_list(&self) -> bool {
        let name = self.node.symbol.name();
        (name == LIST_CONS && self.node.symbol.arity() == 2)
            || (name == EMPTY_LIST && self.node.symbol.arity() == 0)
    }

    /// Returns true iff this is the empty list.
    pub fn is_empty_list(&self) -> bool {
        self.node.symbol.name() == EMPTY_LIST && self.node.symbol.arity() == 0
    }

    /// Returns an iterator over all subterms in preorder traversal, i.e. for
    /// f(g(a), b) we visit f(g(a), b), g(a), a, b.
    pub fn iter(&self) -> TermIterator {
        TermIterator { stack: vec![self.clone()] }
    }

    /// The address of the shared node, used for hashing.
    pub(crate) fn address(&self) -> usize {
        Rc::as_ptr(&self.node) as usize
    }
}

impl Clone for ATerm {
    fn clone(&self) -> Self {
        ATerm {
            node: Rc::clone(&self.node),
        }
    }
}

impl PartialEq for ATerm {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }
}

impl Eq for ATerm {}

impl Hash for ATerm {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

/// An iterator over all subterms of an [ATerm] in preorder traversal.
pub struct TermIterator {
    stack: Vec<ATerm>,
}

impl Iterator for TermIterator {
    type Item = ATerm;

    fn next(&mut self) -> Option<Self::Item> {
        let term = self.stack.pop()?;
        for argument in term.arguments().iter().rev() {
            self.stack.push(argument.clone());
        }
        Some(term)
    }
}

impl fmt::Debug for ATerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use crate::TermPool;

    #[test]
    fn test_term_sharing() {
        let mut tp = TermPool::new();

        let t1 = tp.from_string("f(g(a),b)").unwrap();
        let t2 = tp.from_string("f(g(a),b)").unwrap();
        assert_eq!(t1, t2);

        // Subterms are shared as well.
        let g = tp.from_string("g(a)").unwrap();
        assert_eq!(t1.arg(0), &g);
    }

    #[test]
    fn test_term_iterator() {
        let mut tp = TermPool::new();
        let t = tp.from_string("f(g(a),b)").unwrap();

        let mut result = t.iter();
        assert_eq!(result.next().unwrap(), tp.from_string("f(g(a),b)").unwrap());
        assert_eq!(result.next().unwrap(), tp.from_string("g(a)").unwrap());
        assert_eq!(result.next().unwrap(), tp.from_string("a").unwrap());
        assert_eq!(result.next().unwrap(), tp.from_string("b").unwrap());
        assert!(result.next().is_none());
    }

    #[test]
    fn test_term_arguments() {
        let mut tp = TermPool::new();
        let t = tp.from_string("f(a,b,c)").unwrap();

        assert_eq!(t.head_symbol().arity(), 3);
        assert_eq!(t.arguments().len(), 3);
        assert_eq!(t.arg(2), &tp.from_string("c").unwrap());
    }
}
