//! # Core Data Types
//!
//! Splits, provider modes, and the namespaced question-id scheme shared
//! by the annotation store and the batch provider.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VqafeedError};

/// Separator between the split name and the raw question id in a
/// namespaced question key, e.g. `train/409380`.
pub const QID_KEY_SEPARATOR: char = '/';

/// A named partition of the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Split {
    Train,
    Val,
    TestDev,
    Test,
    Genome,
}

impl Split {
    /// Parse a split name as it appears in a split spec or config file.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "train" => Ok(Self::Train),
            "val" => Ok(Self::Val),
            "test-dev" => Ok(Self::TestDev),
            "test" => Ok(Self::Test),
            "genome" => Ok(Self::Genome),
            _ => Err(VqafeedError::UnknownSplit { split: name.into() }),
        }
    }

    /// The canonical split name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Val => "val",
            Self::TestDev => "test-dev",
            Self::Test => "test",
            Self::Genome => "genome",
        }
    }

    /// Whether annotation (answer) files exist for this split.
    /// Test partitions ship questions only.
    #[must_use]
    pub fn has_annotations(self) -> bool {
        !matches!(self, Self::TestDev | Self::Test)
    }

    /// Whether image ids are zero-filled to 12 digits in feature file
    /// names. Genome ids are used verbatim.
    #[must_use]
    pub fn zero_pads_image_ids(self) -> bool {
        !matches!(self, Self::Genome)
    }

    /// Build the namespaced question key for a raw question id.
    #[must_use]
    pub fn qid_key(self, question_id: u64) -> String {
        format!("{}{}{}", self.as_str(), QID_KEY_SEPARATOR, question_id)
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split the namespaced question key back into its split name and raw id.
#[must_use]
pub fn split_qid_key(key: &str) -> (&str, &str) {
    match key.split_once(QID_KEY_SEPARATOR) {
        Some((split, id)) => (split, id),
        None => (key, ""),
    }
}

/// Provider mode, derived from the split spec the provider was built with.
///
/// Only the exact specs `val`, `test-dev`, and `test` select evaluation
/// behavior; every other spec, including compounds such as
/// `train+genome`, runs in training mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Train,
    Val,
    TestDev,
    Test,
}

impl Mode {
    /// Derive the mode from a `+`-separated split spec.
    #[must_use]
    pub fn from_spec(spec: &str) -> Self {
        match spec {
            "val" => Self::Val,
            "test-dev" => Self::TestDev,
            "test" => Self::Test,
            _ => Self::Train,
        }
    }

    /// Evaluation modes carry one answer-class index per sample instead
    /// of a score distribution, and bypass the in-vocabulary skip filter.
    #[must_use]
    pub fn is_eval(self) -> bool {
        matches!(self, Self::Val | Self::TestDev | Self::Test)
    }

    /// Whether ground-truth answers exist at all. Test partitions return
    /// the sentinel label instead.
    #[must_use]
    pub fn has_answers(self) -> bool {
        !matches!(self, Self::TestDev | Self::Test)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Train => "train",
            Self::Val => "val",
            Self::TestDev => "test-dev",
            Self::Test => "test",
        };
        f.write_str(name)
    }
}

/// One question as loaded from an annotation file. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    /// The raw question text.
    pub question: String,
    /// Id of the image the question refers to.
    pub image_id: u64,
}

/// One free-text answer record. VQA annotations carry up to ten of these
/// per question; genome annotations carry exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAnswer {
    /// The answer string as annotated.
    pub answer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_round_trip() {
        for name in ["train", "val", "test-dev", "test", "genome"] {
            let split = Split::parse(name).unwrap();
            assert_eq!(split.as_str(), name);
        }
    }

    #[test]
    fn test_unknown_split_rejected() {
        assert!(Split::parse("train2015").is_err());
        assert!(Split::parse("").is_err());
    }

    #[test]
    fn test_qid_key_round_trip() {
        let key = Split::Train.qid_key(409380);
        assert_eq!(key, "train/409380");
        assert_eq!(split_qid_key(&key), ("train", "409380"));
    }

    #[test]
    fn test_test_splits_have_no_annotations() {
        assert!(Split::Train.has_annotations());
        assert!(Split::Val.has_annotations());
        assert!(Split::Genome.has_annotations());
        assert!(!Split::TestDev.has_annotations());
        assert!(!Split::Test.has_annotations());
    }

    #[test]
    fn test_mode_from_spec() {
        assert_eq!(Mode::from_spec("train"), Mode::Train);
        assert_eq!(Mode::from_spec("val"), Mode::Val);
        assert_eq!(Mode::from_spec("test-dev"), Mode::TestDev);
        assert_eq!(Mode::from_spec("test"), Mode::Test);
        // Compound specs always run in training mode.
        assert_eq!(Mode::from_spec("train+genome"), Mode::Train);
        assert_eq!(Mode::from_spec("train+val"), Mode::Train);
    }

    #[test]
    fn test_mode_flags() {
        assert!(!Mode::Train.is_eval());
        assert!(Mode::Train.has_answers());
        assert!(Mode::Val.is_eval());
        assert!(Mode::Val.has_answers());
        assert!(Mode::Test.is_eval());
        assert!(!Mode::Test.has_answers());
        assert!(!Mode::TestDev.has_answers());
    }
}
