//! Interned JavaScript strings
//!
//! Strings are immutable and interned for deduplication, so property keys
//! built from the same text share one allocation and usually compare by
//! pointer.

use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

/// Global string intern table
static STRING_TABLE: LazyLock<DashMap<Arc<str>, JsString>> = LazyLock::new(DashMap::new);

/// An immutable JavaScript string
#[derive(Clone)]
pub struct JsString {
    /// The actual string data
    data: Arc<str>,
    /// Precomputed hash for fast lookup
    hash: u64,
}

impl JsString {
    /// Create or retrieve an interned string
    pub fn intern(s: &str) -> Self {
        if let Some(existing) = STRING_TABLE.get(s) {
            return existing.value().clone();
        }

        let js_str = Self::new(s);
        STRING_TABLE
            .entry(js_str.data.clone())
            .or_insert(js_str)
            .value()
            .clone()
    }

    /// Create a string without interning (for temporary strings)
    pub fn new(s: impl Into<Arc<str>>) -> Self {
        let data: Arc<str> = s.into();
        let hash = Self::compute_hash(&data);
        Self { data, hash }
    }

    /// The string contents
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.data
    }

    /// Precomputed hash
    #[inline]
    pub fn hash_value(&self) -> u64 {
        self.hash
    }

    /// Length in UTF-16 code units (the JS `length`)
    pub fn utf16_len(&self) -> usize {
        self.data.encode_utf16().count()
    }

    /// The single code unit at `index`, as a one-element string
    pub fn code_unit_at(&self, index: usize) -> Option<JsString> {
        let unit = self.data.encode_utf16().nth(index)?;
        Some(JsString::new(String::from_utf16_lossy(&[unit])))
    }

    /// Code units `[start, end)`, clamped to the string
    pub fn utf16_slice(&self, start: usize, end: usize) -> JsString {
        let units: Vec<u16> = self
            .data
            .encode_utf16()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect();
        JsString::new(String::from_utf16_lossy(&units))
    }

    /// Check whether the string is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn compute_hash(s: &str) -> u64 {
        let mut hasher = FxHasher::default();
        s.hash(&mut hasher);
        hasher.finish()
    }
}

impl PartialEq for JsString {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
            || (self.hash == other.hash && self.data == other.data)
    }
}

impl Eq for JsString {}

impl Hash for JsString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl std::fmt::Debug for JsString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl std::fmt::Display for JsString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        Self::intern(s)
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_shares_storage() {
        let a = JsString::intern("length");
        let b = JsString::intern("length");
        assert!(Arc::ptr_eq(&a.data, &b.data));
        assert_eq!(a, b);
    }

    #[test]
    fn test_uninterned_equality_by_value() {
        let a = JsString::new("foo");
        let b = JsString::intern("foo");
        assert_eq!(a, b);
        assert_ne!(a, JsString::new("bar"));
    }

    #[test]
    fn test_utf16_access() {
        let s = JsString::new("a\u{1F600}");
        assert_eq!(s.utf16_len(), 3);
        assert_eq!(s.code_unit_at(0).unwrap().as_str(), "a");
        assert!(s.code_unit_at(3).is_none());
        assert_eq!(s.utf16_slice(1, 3).as_str(), &s.as_str()[1..]);
        assert!(s.utf16_slice(2, 1).is_empty());
        assert!(s.utf16_slice(5, 9).is_empty());
    }
}
