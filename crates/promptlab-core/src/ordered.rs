//! String-keyed accumulator that keeps first-appearance order.
//!
//! Every ranked list in promptlab breaks ties by the order keys were first
//! seen, so sessions, tallies and usage tables all accumulate through this.

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct OrderedMap<V> {
    order: Vec<String>,
    values: HashMap<String, V>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            values: HashMap::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, inserted as `V::default()` on first sight
    pub fn entry(&mut self, key: &str) -> &mut V
    where
        V: Default,
    {
        if !self.values.contains_key(key) {
            self.order.push(key.to_string());
        }
        self.values.entry(key.to_string()).or_default()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in first-appearance order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.order
            .iter()
            .filter_map(move |key| self.values.get(key).map(|v| (key.as_str(), v)))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.values.values()
    }

    pub fn into_vec(mut self) -> Vec<(String, V)> {
        self.order
            .into_iter()
            .filter_map(|key| self.values.remove(&key).map(|v| (key, v)))
            .collect()
    }
}
