//! A dictionary that can hold multiple values per key.
//!
//! Query strings and form bodies may repeat a key (`tag=a&tag=b`), and the
//! routing layer needs to know both the last value and the full list. Keys
//! remember their first insertion position so that iteration is stable.

use std::collections::HashMap;
use std::hash::Hash;

/// A dictionary that maps keys to lists of values.
///
/// [`get`](MultiValueDict::get) returns the **last** value for a key, while
/// [`get_list`](MultiValueDict::get_list) returns all values.
///
/// # Examples
///
/// ```
/// use portico_core::utils::MultiValueDict;
///
/// let mut d = MultiValueDict::new();
/// d.append("color".to_string(), "red");
/// d.append("color".to_string(), "blue");
///
/// assert_eq!(d.get(&"color".to_string()), Some(&"blue"));
/// assert_eq!(d.get_list(&"color".to_string()), Some(&vec!["red", "blue"]));
/// ```
#[derive(Debug, Clone)]
pub struct MultiValueDict<K: Eq + Hash + Clone, V> {
    order: Vec<K>,
    inner: HashMap<K, Vec<V>>,
}

impl<K: Eq + Hash + Clone, V> Default for MultiValueDict<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone, V> MultiValueDict<K, V> {
    /// Creates an empty `MultiValueDict`.
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            inner: HashMap::new(),
        }
    }

    /// Returns the last value associated with the key.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.inner.get(key).and_then(|v| v.last())
    }

    /// Returns all values associated with the key.
    pub fn get_list(&self, key: &K) -> Option<&Vec<V>> {
        self.inner.get(key)
    }

    /// Appends a value to the list for the given key.
    pub fn append(&mut self, key: K, value: V) {
        if !self.inner.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.inner.entry(key).or_default().push(value);
    }

    /// Returns `(key, values)` pairs in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &Vec<V>)> {
        self.order
            .iter()
            .filter_map(|k| self.inner.get(k).map(|v| (k, v)))
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the dictionary contains no keys.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
