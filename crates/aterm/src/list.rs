use std::marker::PhantomData;

use crate::{ATerm, TermPool};

/// A typed view on a list term, i.e. a sequence of cons cells ending in the
/// empty list.
pub struct ATermList<T> {
    term: ATerm,
    _marker: PhantomData<T>,
}

impl<T: From<ATerm>> ATermList<T> {
    /// Obtain the head, i.e. the first element, of the list.
    pub fn head(&self) -> T {
        self.term.arg(0).clone().into()
    }
}

impl<T> ATermList<T> {
    /// Returns true iff the list is empty.
    pub fn is_empty(&self) -> bool {
        self.term.is_empty_list()
    }

    /// Obtain the tail, i.e. the remainder, of the list.
    pub fn tail(&self) -> ATermList<T> {
        debug_assert!(!self.is_empty(), "The empty list has no tail");
        self.term.arg(1).clone().into()
    }

    /// Returns the number of elements, which takes time linear in the length.
    pub fn len(&self) -> usize {
        self.iter_terms().count()
    }

    /// Returns the element at the given position.
    pub fn get(&self, index: usize) -> Option<ATerm> {
        self.iter_terms().nth(index)
    }

    /// Returns an iterator over the underlying terms of the list.
    pub fn iter_terms(&self) -> ATermListTermIter {
        ATermListTermIter {
            current: self.term.clone(),
        }
    }

    /// Returns an iterator over all elements in the list.
    pub fn iter(&self) -> ATermListIter<T> {
        ATermListIter {
            current: self.clone(),
        }
    }
}

impl<T> Clone for ATermList<T> {
    fn clone(&self) -> Self {
        ATermList {
            term: self.term.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> From<ATermList<T>> for ATerm {
    fn from(value: ATermList<T>) -> Self {
        value.term
    }
}

impl<T> From<ATerm> for ATermList<T> {
    fn from(value: ATerm) -> Self {
        debug_assert!(value.is_list(), "Can only view a list term as a list");
        ATermList {
            term: value,
            _marker: PhantomData,
        }
    }
}

pub struct ATermListIter<T> {
    current: ATermList<T>,
}

impl<T: From<ATerm>> Iterator for ATermListIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_empty() {
            None
        } else {
            let head = self.current.head();
            self.current = self.current.tail();
            Some(head)
        }
    }
}

pub struct ATermListTermIter {
    current: ATerm,
}

impl Iterator for ATermListTermIter {
    type Item = ATerm;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_empty_list() {
            None
        } else {
            let head = self.current.arg(0).clone();
            self.current = self.current.arg(1).clone();
            Some(head)
        }
    }
}

impl TermPool {
    /// Returns the elements of a list term.
    pub fn list_elements(&self, list: &ATerm) -> Vec<ATerm> {
        debug_assert!(list.is_list(), "Expected a list term");
        ATermList::<ATerm>::from(list.clone()).iter().collect()
    }

    /// Returns the reversal of a list term.
    pub fn list_reverse(&mut self, list: &ATerm) -> ATerm {
        let mut result = self.empty_list();
        let mut current = list.clone();
        while !current.is_empty_list() {
            let head = current.arg(0).clone();
            result = self.cons(&head, &result);
            current = current.arg(1).clone();
        }
        result
    }

    /// Returns the concatenation of two list terms.
    pub fn list_concat(&mut self, first: &ATerm, second: &ATerm) -> ATerm {
        let elements = self.list_elements(first);
        let mut result = second.clone();
        for element in elements.iter().rev() {
            result = self.cons(element, &result);
        }
        result
    }

    /// Returns the list with the element at the given position replaced.
    pub fn list_replace(&mut self, list: &ATerm, element: &ATerm, index: usize) -> ATerm {
        let mut elements = self.list_elements(list);
        elements[index] = element.clone();
        self.list(&elements)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_aterm_list() {
        let mut tp = TermPool::new();
        let list: ATermList<ATerm> = tp.from_string("[f,g,h,i]").unwrap().into();

        assert!(!list.is_empty());
        assert_eq!(list.len(), 4);

        let values: Vec<ATerm> = list.iter().collect();
        assert_eq!(values[0], tp.from_string("f").unwrap());
        assert_eq!(values[1], tp.from_string("g").unwrap());
        assert_eq!(values[2], tp.from_string("h").unwrap());
        assert_eq!(values[3], tp.from_string("i").unwrap());
    }

    #[test]
    fn test_list_operations() {
        let mut tp = TermPool::new();
        let list = tp.from_string("[a,b,c]").unwrap();

        let reversed = tp.list_reverse(&list);
        assert_eq!(reversed, tp.from_string("[c,b,a]").unwrap());

        let tail = tp.from_string("[d]").unwrap();
        let concat = tp.list_concat(&list, &tail);
        assert_eq!(concat, tp.from_string("[a,b,c,d]").unwrap());

        let d = tp.from_string("d").unwrap();
        let replaced = tp.list_replace(&list, &d, 1);
        assert_eq!(replaced, tp.from_string("[a,d,c]").unwrap());
    }
}
