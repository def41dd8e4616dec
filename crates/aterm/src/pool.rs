use std::fmt;
use std::rc::Rc;

use log::trace;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::symbol::{Symbol, SymbolData};
use crate::term::{ATerm, TermNode};

/// The head symbol name of integer terms.
pub const INT_SYMBOL: &str = "<int>";
/// The head symbol name of list cons cells.
pub const LIST_CONS: &str = "[|]";
/// The head symbol name of the empty list.
pub const EMPTY_LIST: &str = "[]";

/// The number of term creations before garbage collection is tested again.
const TEST_GC_INTERVAL: usize = 10000;

/// The store of maximally shared terms. All terms are created through a pool
/// and remain valid as long as a handle to them (or to a term containing
/// them) exists.
pub struct TermPool {
    symbols: FxHashMap<(String, usize), Symbol>,
    unique: FxHashMap<TermKey, ATerm>,
    gc_counter: usize,

    int_symbol: Symbol,
    list_symbol: Symbol,
    empty_list: ATerm,
}

/// Shallow identity of a term: the head symbol and argument nodes by address.
/// Since children are themselves maximally shared this identifies a term
/// uniquely.
#[derive(PartialEq, Eq, Hash)]
struct TermKey {
    symbol: usize,
    args: SmallVec<[usize; 4]>,
    value: Option<i64>,
}

impl TermKey {
    fn new(symbol: &Symbol, args: &[ATerm], value: Option<i64>) -> TermKey {
        TermKey {
            symbol: symbol.address(),
            args: args.iter().map(|t| t.address()).collect(),
            value,
        }
    }
}

impl TermPool {
    pub fn new() -> TermPool {
        let mut symbols = FxHashMap::default();

        let int_symbol = Self::intern(&mut symbols, INT_SYMBOL, 0, false);
        let list_symbol = Self::intern(&mut symbols, LIST_CONS, 2, false);
        let empty_symbol = Self::intern(&mut symbols, EMPTY_LIST, 0, false);

        let empty_list = ATerm {
            node: Rc::new(TermNode {
                symbol: empty_symbol.clone(),
                args: Box::new([]),
                value: None,
            }),
        };

        let mut unique = FxHashMap::default();
        unique.insert(TermKey::new(&empty_symbol, &[], None), empty_list.clone());

        TermPool {
            symbols,
            unique,
            gc_counter: TEST_GC_INTERVAL,
            int_symbol,
            list_symbol,
            empty_list,
        }
    }

    fn intern(
        symbols: &mut FxHashMap<(String, usize), Symbol>,
        name: &str,
        arity: usize,
        quoted: bool,
    ) -> Symbol {
        symbols
            .entry((name.to_string(), arity))
            .or_insert_with(|| Symbol {
                data: Rc::new(SymbolData {
                    name: name.to_string(),
                    arity,
                    quoted,
                }),
            })
            .clone()
    }

    /// Creates a function symbol with the given name and arity. Equal inputs
    /// return the same symbol.
    pub fn create_symbol(&mut self, name: &str, arity: usize) -> Symbol {
        Self::intern(&mut self.symbols, name, arity, false)
    }

    /// Creates a quoted function symbol with the given name and arity.
    pub fn create_symbol_quoted(&mut self, name: &str, arity: usize) -> Symbol {
        Self::intern(&mut self.symbols, name, arity, true)
    }

    /// Returns true iff a symbol with the given name is interned, for any
    /// arity. The symbol table doubles as the string pool consulted by fresh
    /// name generation.
    pub fn symbol_exists(&self, name: &str) -> bool {
        self.symbols.keys().any(|(n, _)| n == name)
    }

    /// Creates a term with the given head symbol and arguments.
    pub fn create(&mut self, symbol: &Symbol, args: &[ATerm]) -> ATerm {
        debug_assert_eq!(
            symbol.arity(),
            args.len(),
            "Number of arguments does not match the arity of {symbol}"
        );

        self.create_with_value(symbol.clone(), args, None)
    }

    /// Creates an integer term.
    pub fn create_int(&mut self, value: i64) -> ATerm {
        let symbol = self.int_symbol.clone();
        self.create_with_value(symbol, &[], Some(value))
    }

    fn create_with_value(&mut self, symbol: Symbol, args: &[ATerm], value: Option<i64>) -> ATerm {
        let key = TermKey::new(&symbol, args, value);
        if let Some(term) = self.unique.get(&key) {
            return term.clone();
        }

        let term = ATerm {
            node: Rc::new(TermNode {
                symbol,
                args: args.to_vec().into_boxed_slice(),
                value,
            }),
        };
        self.unique.insert(key, term.clone());

        self.gc_counter = self.gc_counter.saturating_sub(1);
        if self.gc_counter == 0 {
            self.collect();
            self.gc_counter = TEST_GC_INTERVAL;
        }

        term
    }

    /// Returns the number of unique terms in the pool.
    pub fn len(&self) -> usize {
        self.unique.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unique.is_empty()
    }

    /// Reclaims all terms that are no longer reachable from any handle. A
    /// term is alive iff a handle to it exists outside of the pool, or it is
    /// an argument of a live term.
    pub fn collect(&mut self) {
        let before = self.unique.len();

        // A term only referenced by the hash-cons table is garbage. Dropping
        // it releases its arguments, which can become garbage in turn. The
        // empty list is kept alive by the pool itself.
        loop {
            let mut any = false;
            self.unique.retain(|_, term| {
                if Rc::strong_count(&term.node) == 1 {
                    any = true;
                    false
                } else {
                    true
                }
            });

            if !any {
                break;
            }
        }

        trace!("collect: reclaimed {} of {} terms", before - self.unique.len(), before);
    }
}

impl Default for TermPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TermPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "term pool: {} terms, {} symbols",
            self.unique.len(),
            self.symbols.len()
        )
    }
}

impl TermPool {
    /// Returns the empty list term.
    pub fn empty_list(&self) -> ATerm {
        self.empty_list.clone()
    }

    /// Prepends an element to a list.
    pub fn cons(&mut self, head: &ATerm, tail: &ATerm) -> ATerm {
        debug_assert!(tail.is_list(), "The tail of a cons cell must be a list");
        let symbol = self.list_symbol.clone();
        self.create_with_value(symbol, &[head.clone(), tail.clone()], None)
    }

    /// Creates a list term with the given elements.
    pub fn list(&mut self, elements: &[ATerm]) -> ATerm {
        let mut result = self.empty_list();
        for element in elements.iter().rev() {
            result = self.cons(element, &result);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::random_term;

    #[test]
    fn test_symbol_sharing() {
        let mut tp = TermPool::new();

        let f1 = tp.create_symbol("f", 2);
        let f2 = tp.create_symbol("f", 2);
        let f3 = tp.create_symbol("f", 3);

        assert_eq!(f1, f2);
        assert_ne!(f1, f3, "Symbols with a different arity are distinct");
        assert_eq!(f1.name(), "f");
        assert_eq!(f3.arity(), 3);
    }

    #[test]
    fn test_create_int() {
        let mut tp = TermPool::new();

        let t1 = tp.create_int(42);
        let t2 = tp.create_int(42);
        let t3 = tp.create_int(43);

        assert_eq!(t1, t2);
        assert_ne!(t1, t3);
        assert_eq!(t1.int_value(), Some(42));
    }

    #[test]
    fn test_garbage_collection() {
        let mut tp = TermPool::new();

        let kept = tp.from_string("f(g(a),b)").unwrap();

        {
            let _scratch = tp.from_string("h(f(g(a),b),c)").unwrap();
        }
        tp.collect();

        // The scratch term is reclaimed, the kept term and its subterms are
        // not.
        assert_eq!(kept, tp.from_string("f(g(a),b)").unwrap());
        assert!(tp.len() >= 4);

        let mut rng = rand::rng();
        let terms: Vec<ATerm> = (0..100)
            .map(|_| {
                random_term(
                    &mut tp,
                    &mut rng,
                    &[("f".to_string(), 2)],
                    &["a".to_string(), "b".to_string()],
                    10,
                )
            })
            .collect();

        tp.collect();

        for term in &terms {
            for subterm in term.iter() {
                assert_eq!(
                    subterm.head_symbol().arity(),
                    subterm.arguments().len(),
                    "The arity matches the number of arguments."
                );
            }
        }
    }
}
