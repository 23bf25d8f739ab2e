// src/model/backfill.rs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Which donor value wins when one key maps to several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The first non-null value in donor row order.
    FirstSeen,
    /// The smallest value in string order.
    #[default]
    Lexicographic,
}

/// Deterministic key -> value lookup built from donor rows, used to fill
/// missing fields (Store -> City, Brand -> Size).
#[derive(Debug, Clone)]
pub struct BackfillMap<K, V> {
    entries: BTreeMap<K, V>,
    ambiguous: BTreeSet<K>,
}

impl<K, V> BackfillMap<K, V>
where
    K: Ord + Clone,
    V: Ord + Clone,
{
    /// Null donor values never enter the map.
    pub fn build(pairs: impl IntoIterator<Item = (K, Option<V>)>, tie_break: TieBreak) -> Self {
        let mut entries: BTreeMap<K, V> = BTreeMap::new();
        let mut ambiguous = BTreeSet::new();

        for (key, value) in pairs {
            let Some(value) = value else { continue };
            match entries.get_mut(&key) {
                None => {
                    entries.insert(key, value);
                }
                Some(current) if *current != value => {
                    ambiguous.insert(key);
                    if tie_break == TieBreak::Lexicographic && value < *current {
                        *current = value;
                    }
                }
                Some(_) => {}
            }
        }

        Self { entries, ambiguous }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Keeps `current` when present, otherwise looks `key` up.
    pub fn fill(&self, key: &K, current: Option<V>) -> Option<V> {
        current.or_else(|| self.entries.get(key).cloned())
    }

    /// Number of keys whose donors disagreed.
    pub fn ambiguous_keys(&self) -> usize {
        self.ambiguous.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn donors() -> Vec<(String, Option<String>)> {
        vec![
            ("1".into(), Some("HARDERSFIELD".into())),
            ("2".into(), None),
            ("3".into(), Some("TARMSWORTH".into())),
            ("3".into(), Some("AYLESBURY".into())),
            ("2".into(), Some("ASHBORNE".into())),
        ]
    }

    #[test]
    fn lexicographic_picks_smallest_value() {
        let map = BackfillMap::build(donors(), TieBreak::Lexicographic);
        assert_eq!(map.get(&"3".to_string()).map(String::as_str), Some("AYLESBURY"));
        assert_eq!(map.ambiguous_keys(), 1);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn first_seen_keeps_earliest_non_null() {
        let map = BackfillMap::build(donors(), TieBreak::FirstSeen);
        assert_eq!(map.get(&"3".to_string()).map(String::as_str), Some("TARMSWORTH"));
        assert_eq!(map.get(&"2".to_string()).map(String::as_str), Some("ASHBORNE"));
    }

    #[test]
    fn fill_only_replaces_missing_values() {
        let map = BackfillMap::build(donors(), TieBreak::Lexicographic);
        let key = "1".to_string();
        assert_eq!(map.fill(&key, Some("KEPT".into())).as_deref(), Some("KEPT"));
        assert_eq!(map.fill(&key, None).as_deref(), Some("HARDERSFIELD"));
        assert_eq!(map.fill(&"99".to_string(), None), None);
    }
}
