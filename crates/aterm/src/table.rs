use rustc_hash::FxHashMap;

use crate::ATerm;

/// A set of terms with stable, monotonically assigned indices.
pub type ATermIndexedSet = mcrl2rust_utilities::IndexedSet<ATerm>;

/// A mapping from terms to terms, keyed on the shared representation.
#[derive(Default)]
pub struct TermTable {
    entries: FxHashMap<ATerm, ATerm>,
}

impl TermTable {
    pub fn new() -> TermTable {
        TermTable::default()
    }

    /// Stores the value under the key, replacing an existing entry.
    pub fn put(&mut self, key: &ATerm, value: &ATerm) {
        self.entries.insert(key.clone(), value.clone());
    }

    /// Returns the value stored under the key.
    pub fn get(&self, key: &ATerm) -> Option<&ATerm> {
        self.entries.get(key)
    }

    /// Removes the entry for the key.
    pub fn remove(&mut self, key: &ATerm) -> Option<ATerm> {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ATerm> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &ATerm> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all entries.
    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::TermPool;

    #[test]
    fn test_term_indexed_set() {
        let mut tp = TermPool::new();
        let mut set = ATermIndexedSet::new();

        let a = tp.from_string("a").unwrap();
        let b = tp.from_string("f(a)").unwrap();

        let (index_a, new_a) = set.insert(a.clone());
        let (index_b, new_b) = set.insert(b.clone());
        assert!(new_a && new_b);
        assert_ne!(index_a, index_b);

        assert_eq!(set.insert(a.clone()), (index_a, false));
        assert_eq!(set.index_of(&b), Some(index_b));
        assert_eq!(set.get(index_a), Some(&a));
    }

    #[test]
    fn test_term_table() {
        let mut tp = TermPool::new();
        let mut table = TermTable::new();

        let key = tp.from_string("f(a)").unwrap();
        let value = tp.from_string("g(b)").unwrap();

        table.put(&key, &value);
        assert_eq!(table.get(&key), Some(&value));
        assert_eq!(table.len(), 1);

        table.reset();
        assert!(table.get(&key).is_none());
    }
}
