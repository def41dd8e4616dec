use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A function symbol, i.e. a name with an arity. Symbols are interned by the
/// [crate::TermPool]; two symbols created with the same name and arity share a
/// single representation, so symbol equality is a pointer comparison.
pub struct Symbol {
    pub(crate) data: Rc<SymbolData>,
}

pub(crate) struct SymbolData {
    pub(crate) name: String,
    pub(crate) arity: usize,
    pub(crate) quoted: bool,
}

impl Symbol {
    /// Returns the name of the function symbol.
    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// Returns the number of arguments of terms with this head symbol.
    pub fn arity(&self) -> usize {
        self.data.arity
    }

    /// Returns true iff the symbol name is printed with surrounding quotes.
    pub fn is_quoted(&self) -> bool {
        self.data.quoted
    }

    /// The address of the shared symbol data, used for hashing.
    pub(crate) fn address(&self) -> usize {
        Rc::as_ptr(&self.data) as usize
    }
}

impl Clone for Symbol {
    fn clone(&self) -> Self {
        Symbol {
            data: Rc::clone(&self.data),
        }
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_quoted() {
            write!(f, "\"{}\"", self.name())
        } else {
            write!(f, "{}", self.name())
        }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name(), self.arity())
    }
}
