//! # Vocabulary Dictionaries
//!
//! Token→index and answer→index mappings loaded from serialized JSON and
//! treated as read-only for the dataset's lifetime. Out-of-vocabulary
//! strings resolve to the explicit empty-string fallback entry, which
//! every vocabulary file must contain.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Result, VqafeedError};

/// The fallback key every vocabulary must define.
pub const FALLBACK_ENTRY: &str = "";

/// An immutable string→index mapping with a reverse view.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    forward: HashMap<String, u32>,
    reverse: HashMap<u32, String>,
    fallback_index: u32,
}

impl Vocabulary {
    /// Load a vocabulary from a JSON object file (`{"word": index, ...}`).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let forward: HashMap<String, u32> = serde_json::from_str(&raw)?;
        Self::from_map(forward).map_err(|_| VqafeedError::MissingFallbackEntry {
            path: path.display().to_string(),
        })
    }

    /// Build a vocabulary from an in-memory map. Fails if the fallback
    /// entry is absent.
    pub fn from_map(forward: HashMap<String, u32>) -> Result<Self> {
        let fallback_index =
            *forward
                .get(FALLBACK_ENTRY)
                .ok_or_else(|| VqafeedError::MissingFallbackEntry {
                    path: "<memory>".into(),
                })?;

        let reverse = forward
            .iter()
            .map(|(word, &index)| (index, word.clone()))
            .collect();

        Ok(Self {
            forward,
            reverse,
            fallback_index,
        })
    }

    /// Exact lookup, `None` when the entry is absent.
    #[must_use]
    pub fn index_of(&self, entry: &str) -> Option<u32> {
        self.forward.get(entry).copied()
    }

    /// Lookup with out-of-vocabulary strings mapped to the fallback entry.
    #[must_use]
    pub fn lookup(&self, entry: &str) -> u32 {
        self.index_of(entry).unwrap_or(self.fallback_index)
    }

    /// Index of the fallback entry.
    #[must_use]
    pub fn fallback_index(&self) -> u32 {
        self.fallback_index
    }

    /// Whether the entry exists in the vocabulary.
    #[must_use]
    pub fn contains(&self, entry: &str) -> bool {
        self.forward.contains_key(entry)
    }

    /// Reverse lookup from index to entry string.
    #[must_use]
    pub fn entry_for_index(&self, index: u32) -> Option<&str> {
        self.reverse.get(&index).map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Whether the vocabulary holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vocab() -> Vocabulary {
        let mut map = HashMap::new();
        map.insert(String::new(), 0);
        map.insert("what".to_string(), 1);
        map.insert("color".to_string(), 2);
        map.insert("yes".to_string(), 3);
        Vocabulary::from_map(map).unwrap()
    }

    #[test]
    fn test_lookup_known_entry() {
        let vocab = sample_vocab();
        assert_eq!(vocab.lookup("what"), 1);
        assert_eq!(vocab.index_of("color"), Some(2));
    }

    #[test]
    fn test_oov_maps_to_fallback() {
        let vocab = sample_vocab();
        assert_eq!(vocab.lookup("zebra"), vocab.fallback_index());
        assert_eq!(vocab.index_of("zebra"), None);
    }

    #[test]
    fn test_missing_fallback_rejected() {
        let mut map = HashMap::new();
        map.insert("what".to_string(), 1);
        assert!(Vocabulary::from_map(map).is_err());
    }

    #[test]
    fn test_reverse_lookup() {
        let vocab = sample_vocab();
        assert_eq!(vocab.entry_for_index(3), Some("yes"));
        assert_eq!(vocab.entry_for_index(99), None);
    }

    #[test]
    fn test_len() {
        let vocab = sample_vocab();
        assert_eq!(vocab.len(), 4);
        assert!(!vocab.is_empty());
    }
}
