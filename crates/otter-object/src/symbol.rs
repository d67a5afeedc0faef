//! JavaScript symbols
//!
//! Every symbol is unique; equality is identity. Well-known symbols are
//! shared by all realms.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use crate::string::JsString;

static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct SymbolData {
    id: u64,
    description: Option<JsString>,
}

/// A unique JavaScript symbol
#[derive(Clone)]
pub struct Symbol(Arc<SymbolData>);

impl Symbol {
    /// Create a fresh symbol
    pub fn new(description: Option<&str>) -> Self {
        Self(Arc::new(SymbolData {
            id: NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed),
            description: description.map(JsString::intern),
        }))
    }

    /// Symbol description, if any
    pub fn description(&self) -> Option<&JsString> {
        self.0.description.as_ref()
    }

    /// Unique id of this symbol
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// `Symbol.iterator`
    pub fn iterator() -> Self {
        WELL_KNOWN.iterator.clone()
    }

    /// `Symbol.asyncIterator`
    pub fn async_iterator() -> Self {
        WELL_KNOWN.async_iterator.clone()
    }

    /// `Symbol.toPrimitive`
    pub fn to_primitive() -> Self {
        WELL_KNOWN.to_primitive.clone()
    }

    /// `Symbol.toStringTag`
    pub fn to_string_tag() -> Self {
        WELL_KNOWN.to_string_tag.clone()
    }

    /// Descriptive form used in error messages (`Symbol(desc)`)
    pub fn descriptive_string(&self) -> String {
        match &self.0.description {
            Some(d) => format!("Symbol({})", d),
            None => "Symbol()".to_string(),
        }
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.id);
    }
}

impl std::fmt::Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.descriptive_string())
    }
}

struct WellKnownSymbols {
    iterator: Symbol,
    async_iterator: Symbol,
    to_primitive: Symbol,
    to_string_tag: Symbol,
}

static WELL_KNOWN: LazyLock<WellKnownSymbols> = LazyLock::new(|| WellKnownSymbols {
    iterator: Symbol::new(Some("Symbol.iterator")),
    async_iterator: Symbol::new(Some("Symbol.asyncIterator")),
    to_primitive: Symbol::new(Some("Symbol.toPrimitive")),
    to_string_tag: Symbol::new(Some("Symbol.toStringTag")),
});
