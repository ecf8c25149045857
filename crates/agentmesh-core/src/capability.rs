//! Capability sets with canonical ordering
//!
//! Capabilities are plain labels. Sets are unordered at the API level but
//! always expose a canonical (sorted, deduplicated) form, because the
//! sorted rendering is what gets signed: delegation payloads and card
//! serializations must be byte-for-byte reproducible regardless of the
//! order capabilities were inserted in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An unordered set of capability labels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<String>);

impl CapabilitySet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a capability label
    pub fn insert(&mut self, capability: impl Into<String>) {
        self.0.insert(capability.into());
    }

    /// Check membership
    pub fn contains(&self, capability: &str) -> bool {
        self.0.contains(capability)
    }

    /// Check if every capability in this set appears in `other`
    pub fn is_subset_of(&self, other: &CapabilitySet) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Number of capabilities
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in canonical order
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    /// Canonical form as a sorted, deduplicated vector
    pub fn canonical_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }

    /// Canonical comma-joined form, e.g. `"deploy,read"`.
    ///
    /// This is the rendering embedded in delegation signing payloads.
    pub fn canonical_join(&self) -> String {
        self.canonical_vec().join(",")
    }
}

impl<S: Into<String>> FromIterator<S> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<Vec<String>> for CapabilitySet {
    fn from(capabilities: Vec<String>) -> Self {
        capabilities.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a CapabilitySet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
