//! Directory-side lobby filter.
//!
//! An ordered key -> expected value map. The directory backend evaluates it as
//! exact-match predicates combined with AND; an empty filter matches all.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::keys::MetadataKey;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LobbyFilter {
    predicates: BTreeMap<String, String>,
}

impl LobbyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`LobbyFilter::insert`].
    pub fn with(mut self, key: MetadataKey, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Require `key == value`; replaces any earlier predicate on `key`.
    pub fn insert(&mut self, key: MetadataKey, value: impl Into<String>) {
        self.predicates.insert(key.as_str().to_string(), value.into());
    }

    pub fn remove(&mut self, key: MetadataKey) -> Option<String> {
        self.predicates.remove(key.as_str())
    }

    pub fn get(&self, key: MetadataKey) -> Option<&str> {
        self.predicates.get(key.as_str()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.predicates.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Evaluate against a metadata lookup. A missing field never matches.
    pub fn matches<'a>(&self, lookup: impl Fn(&str) -> Option<&'a str>) -> bool {
        self.predicates
            .iter()
            .all(|(k, expected)| lookup(k.as_str()) == Some(expected.as_str()))
    }
}
