//! tagmap is the map of key, value pairs that sits inside each `Metric`. Think
//! of it as a specialized hashmap. Tags distinguish identically named metrics
//! that come from different origins, and they are part of a metric's identity.

use sanitize::{sanitize_key, sanitize_value};
use std::iter::FromIterator;
use std::slice::Iter;

/// The tagmap key, value collection. Behaves similarly to
/// `std::collections::BTreeMap` but with a specialized implementation for
/// fast searching over a small collection. Entries are kept sorted by raw key
/// and keys are unique.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TagMap {
    inner: Vec<(String, String)>,
}

impl Default for TagMap {
    fn default() -> TagMap {
        TagMap {
            inner: Vec::with_capacity(8),
        }
    }
}

impl TagMap {
    /// Create a `tagmap::Iter`. Iteration happens in raw key order.
    pub fn iter(&self) -> Iter<(String, String)> {
        self.inner.iter()
    }

    /// Get a value from the tagmap, if it exists.
    pub fn get(&self, key: &str) -> Option<&str> {
        match self.inner.binary_search_by(|probe| probe.0.as_str().cmp(key)) {
            Ok(idx) => Some(&self.inner[idx].1),
            Err(_) => None,
        }
    }

    /// Remove a value from the tagmap. The value will be returned if it
    /// existed.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        match self.inner.binary_search_by(|probe| probe.0.as_str().cmp(key)) {
            Ok(idx) => Some(self.inner.remove(idx).1),
            Err(_) => None,
        }
    }

    /// Insert a key / value into self
    ///
    /// This method will return the value previously stored under the given key,
    /// if there was such a value.
    pub fn insert<K, V>(&mut self, key: K, val: V) -> Option<String>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let key = key.into();
        let val = val.into();
        match self.inner.binary_search_by(|probe| probe.0.cmp(&key)) {
            Ok(idx) => Some(::std::mem::replace(&mut self.inner[idx].1, val)),
            Err(idx) => {
                self.inner.insert(idx, (key, val));
                None
            }
        }
    }

    /// Merge two tagmaps
    ///
    /// Keys of `other` that are absent in self are inserted. Keys already
    /// present in self keep their value.
    pub fn merge(&mut self, other: &TagMap) {
        for &(ref key, ref val) in &other.inner {
            if let Err(idx) = self.inner.binary_search_by(|probe| probe.0.cmp(key)) {
                self.inner.insert(idx, (key.clone(), val.clone()));
            }
        }
    }

    /// Determine if the tagmap is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Return the length of the tagmap. This is the total number of key /
    /// values stored in the map.
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<'a> IntoIterator for &'a TagMap {
    type Item = &'a (String, String);
    type IntoIter = Iter<'a, (String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for TagMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I>(iter: I) -> TagMap
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut tags = TagMap::default();
        for (k, v) in iter {
            tags.insert(k, v);
        }
        tags
    }
}

/// Serialize a tagmap into its wire form
///
/// The result is `key1:value1,key2:value2,...` with every key passed through
/// `sanitize_key` and every value through `sanitize_value`. Entries are
/// ordered by sanitized key. Should two raw keys sanitize to the same string
/// they are ordered by raw key. An empty tagmap serializes to the empty
/// string.
///
/// # Examples
///
/// ```
/// use metricline::metric::{serialize_tags, TagMap};
///
/// let mut tags = TagMap::default();
/// tags.insert("region", "us east");
/// tags.insert("host name", "web|1");
///
/// assert_eq!(serialize_tags(&tags), "host_name:web_1,region:us east");
/// ```
pub fn serialize(tags: &TagMap) -> String {
    let mut entries: Vec<(String, &str, String)> = tags.iter()
        .map(|&(ref k, ref v)| {
            (sanitize_key(k).into_owned(), k.as_str(), sanitize_value(v).into_owned())
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    let mut s = String::new();
    for (idx, &(ref key, _, ref val)) in entries.iter().enumerate() {
        if idx > 0 {
            s.push(',');
        }
        s.push_str(key);
        s.push(':');
        s.push_str(val);
    }
    s
}
