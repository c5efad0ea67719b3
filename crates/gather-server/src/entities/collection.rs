use std::collections::HashMap;
use std::hash::Hash;

use super::FetchOutcome;

/// Identifier handed to a fetcher; one per concurrent fetch in a round
pub trait FetchKey: Eq + Hash + Clone + Send + Sync + 'static {}

impl<T> FetchKey for T where T: Eq + Hash + Clone + Send + Sync + 'static {}

/// Outcomes gathered in one collection round, keyed by fetch key.
///
/// Every key present carries a terminal outcome. A key that is absent did not
/// finish before the round was torn down, which is not the same thing as a
/// [`FetchOutcome::Failure`]. Use [`CollectionResult::missing`] to find those.
///
/// When a round is given the same key twice, the outcome recorded last wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionResult<K: FetchKey> {
    outcomes: HashMap<K, FetchOutcome>,
}

impl<K: FetchKey> CollectionResult<K> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            outcomes: HashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn record(&mut self, key: K, outcome: FetchOutcome) {
        self.outcomes.insert(key, outcome);
    }

    pub fn get(&self, key: &K) -> Option<&FetchOutcome> {
        self.outcomes.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.outcomes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &FetchOutcome)> {
        self.outcomes.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.outcomes.keys()
    }

    pub fn successes(&self) -> impl Iterator<Item = (&K, &[u8])> {
        self.outcomes
            .iter()
            .filter_map(|(key, outcome)| outcome.payload().map(|payload| (key, payload)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&K, &super::FetchError)> {
        self.outcomes
            .iter()
            .filter_map(|(key, outcome)| outcome.error().map(|error| (key, error)))
    }

    /// Requested keys with no outcome, in the order they were requested
    pub fn missing<'a>(&self, requested: &'a [K]) -> Vec<&'a K> {
        requested
            .iter()
            .filter(|key| !self.outcomes.contains_key(key))
            .collect()
    }

    pub fn is_complete_for(&self, requested: &[K]) -> bool {
        requested.iter().all(|key| self.outcomes.contains_key(key))
    }
}

impl<K: FetchKey> Default for CollectionResult<K> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<K: FetchKey> IntoIterator for CollectionResult<K> {
    type Item = (K, FetchOutcome);
    type IntoIter = std::collections::hash_map::IntoIter<K, FetchOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}
