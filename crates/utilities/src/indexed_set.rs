use std::hash::Hash;

use rustc_hash::FxHashMap;

/// A set in which every element is identified by a dense index. Indices are
/// assigned monotonically and remain stable for the lifetime of the element;
/// slots of removed elements are recycled through a free list before the set
/// grows.
pub struct IndexedSet<T> {
    /// The slots either hold an element or the next entry of the free list.
    slots: Vec<Slot<T>>,
    indices: FxHashMap<T, usize>,
    free: Option<usize>,
    number_of_insertions: u64,
}

enum Slot<T> {
    Filled(T),
    /// Empty slot pointing to the next free slot, or to itself when it is the
    /// last one.
    Free(usize),
}

impl<T: Hash + Eq + Clone> IndexedSet<T> {
    pub fn new() -> Self {
        IndexedSet {
            slots: Vec::new(),
            indices: FxHashMap::default(),
            free: None,
            number_of_insertions: 0,
        }
    }

    /// Returns the number of insertions performed on this set.
    pub fn number_of_insertions(&self) -> u64 {
        self.number_of_insertions
    }

    /// Returns the number of elements currently in the set.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Inserts the element and returns its index together with whether it was
    /// newly added. Inserting an existing element returns its existing index.
    pub fn insert(&mut self, element: T) -> (usize, bool) {
        if let Some(&index) = self.indices.get(&element) {
            return (index, false);
        }

        self.number_of_insertions += 1;
        let index = match self.free {
            Some(first) => {
                if let Slot::Free(next) = self.slots[first] {
                    if next == first {
                        // The list is empty as its first element points to itself.
                        self.free = None;
                    } else {
                        self.free = Some(next);
                    }
                } else {
                    unreachable!("The free list only contains free slots");
                }

                self.slots[first] = Slot::Filled(element.clone());
                first
            }
            None => {
                self.slots.push(Slot::Filled(element.clone()));
                self.slots.len() - 1
            }
        };

        self.indices.insert(element, index);
        (index, true)
    }

    /// Returns the index of the given element, if it is in the set.
    pub fn index_of(&self, element: &T) -> Option<usize> {
        self.indices.get(element).copied()
    }

    /// Returns the element stored at the given index.
    pub fn get(&self, index: usize) -> Option<&T> {
        match self.slots.get(index) {
            Some(Slot::Filled(element)) => Some(element),
            _ => None,
        }
    }

    /// Removes the element from the set, freeing its slot for reuse.
    pub fn remove(&mut self, element: &T) -> Option<usize> {
        let index = self.indices.remove(element)?;

        self.slots[index] = match self.free {
            Some(next) => Slot::Free(next),
            None => Slot::Free(index),
        };
        self.free = Some(index);
        Some(index)
    }

    /// Iterates over all (index, element) pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| match slot {
            Slot::Filled(element) => Some((index, element)),
            Slot::Free(_) => None,
        })
    }
}

impl<T: Hash + Eq + Clone> Default for IndexedSet<T> {
    fn default() -> Self {
        IndexedSet::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::Rng;
    use test_log::test;

    #[test]
    fn test_indexed_set_stable_indices() {
        let mut set = IndexedSet::new();

        let mut rng = rand::rng();
        let elements: Vec<u32> = (0..1000).map(|_| rng.random_range(0..5000)).collect();

        let mut indices = Vec::new();
        for element in &elements {
            indices.push(set.insert(*element).0);
        }

        // Reinserting yields the same index and is_new is false.
        for (element, index) in elements.iter().zip(&indices) {
            let (found, is_new) = set.insert(*element);
            assert_eq!(found, *index);
            assert!(!is_new);
            assert_eq!(set.index_of(element), Some(*index));
            assert_eq!(set.get(*index), Some(element));
        }
    }

    #[test]
    fn test_indexed_set_remove_recycles() {
        let mut set = IndexedSet::new();

        let (a, _) = set.insert("a");
        let (b, _) = set.insert("b");
        let (c, _) = set.insert("c");

        assert_eq!(set.remove(&"b"), Some(b));
        assert_eq!(set.get(b), None);
        assert_eq!(set.len(), 2);

        // The freed slot is reused before the set grows.
        let (d, is_new) = set.insert("d");
        assert!(is_new);
        assert_eq!(d, b);

        assert_eq!(set.get(a), Some(&"a"));
        assert_eq!(set.get(c), Some(&"c"));

        let elements: Vec<&str> = set.iter().map(|(_, e)| *e).collect();
        assert_eq!(elements, vec!["a", "d", "c"]);
    }
}
