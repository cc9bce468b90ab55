use std::collections::HashMap;

/// Ordered mapping from old prefixes to new prefixes.
///
/// The order matters: when several old prefixes match at the same position, the one that was
/// inserted first wins. Put longer, more specific prefixes (e.g. a package prefix) before
/// shorter ones (e.g. the root of the store) to use the latter as a fallback.
///
/// Identity mappings are dropped on insertion.
#[derive(Clone, Debug, Default)]
pub struct PrefixMap {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    index: HashMap<Vec<u8>, usize>,
}

impl PrefixMap {
    /// Create empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the mapping from string or byte string pairs.
    ///
    /// Strings are encoded as UTF-8, byte strings are used verbatim.
    pub fn from_strings_or_bytes<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let mut map = Self::new();
        for (old, new) in pairs {
            map.insert(old.as_ref(), new.as_ref());
        }
        map
    }

    /// Map `old` prefix to `new` prefix.
    ///
    /// Replaces the previous value but keeps the original position if `old` is already mapped.
    /// Does nothing if `old` equals `new`.
    pub fn insert(&mut self, old: impl Into<Vec<u8>>, new: impl Into<Vec<u8>>) {
        let old = old.into();
        let new = new.into();
        if old == new {
            return;
        }
        match self.index.get(&old) {
            Some(i) => self.entries[*i].1 = new,
            None => {
                self.index.insert(old.clone(), self.entries.len());
                self.entries.push((old, new));
            }
        }
    }

    /// Get the new prefix for `old` prefix.
    pub fn get(&self, old: &[u8]) -> Option<&[u8]> {
        self.index
            .get(old)
            .map(|i| self.entries[*i].1.as_slice())
    }

    /// Old prefixes in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.iter().map(|(old, _)| old.as_slice())
    }

    /// `(old, new)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries
            .iter()
            .map(|(old, new)| (old.as_slice(), new.as_slice()))
    }

    /// Find the first old prefix that `path` starts with.
    pub fn find_prefix_of(&self, path: &[u8]) -> Option<(&[u8], &[u8])> {
        self.iter().find(|(old, _)| path.starts_with(old))
    }

    /// The number of mappings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No mappings.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for PrefixMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for PrefixMap {}

impl<K: AsRef<[u8]>, V: AsRef<[u8]>> FromIterator<(K, V)> for PrefixMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_strings_or_bytes(iter)
    }
}
