//! # Data-Paths and Provider Configuration
//!
//! File locations per split plus the knobs the provider is built with.
//! The paths config is a plain JSON file so the same training data layout
//! can be shared between runs and tools.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VqafeedError};
use crate::types::Split;

/// Default batch size.
pub const DEFAULT_BATCH_SIZE: usize = 64;
/// Default maximum question length in tokens.
pub const DEFAULT_MAX_QUESTION_LEN: usize = 15;
/// Default number of answer classes in the classifier head.
pub const DEFAULT_NUM_ANSWER_CLASSES: usize = 3000;
/// Default image-feature vector width.
pub const DEFAULT_FEATURE_DIM: usize = 2048;
/// Default iteration cap reported by the dataset wrapper. Keep this above
/// the training loop's max-iterations setting.
pub const DEFAULT_MAX_ITERATIONS: usize = 150_000;

/// File locations for one data split.
///
/// VQA splits set `question_file` (and `annotation_file` unless the split
/// is a test partition); the genome split sets `genome_file` instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplitPaths {
    /// Question JSON file (`{"questions": [...]}`).
    #[serde(default)]
    pub question_file: Option<PathBuf>,

    /// Annotation JSON file (`{"annotations": [...]}`). Absent for test
    /// partitions.
    #[serde(default)]
    pub annotation_file: Option<PathBuf>,

    /// Combined question/answer JSON file for the genome split.
    #[serde(default)]
    pub genome_file: Option<PathBuf>,

    /// Path prefix completed with a formatted image id to locate the
    /// per-image feature file.
    pub features_prefix: String,
}

/// Map from split name to its file locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfig {
    /// Per-split paths, keyed by canonical split name.
    pub splits: HashMap<String, SplitPaths>,
}

impl DataConfig {
    /// Load the data-paths config from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Resolve the paths for a split, failing fast on splits the config
    /// does not know about.
    pub fn paths_for(&self, split: Split) -> Result<&SplitPaths> {
        self.splits
            .get(split.as_str())
            .ok_or_else(|| VqafeedError::UnknownSplit {
                split: split.as_str().into(),
            })
    }

    /// Register paths for a split. Mostly useful for tests and tools that
    /// assemble a config programmatically.
    pub fn insert(&mut self, split: Split, paths: SplitPaths) {
        self.splits.insert(split.as_str().to_string(), paths);
    }
}

/// Options the provider is constructed with.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Number of samples per batch.
    pub batch_size: usize,
    /// Questions are truncated or right-padded to this many tokens.
    pub max_question_len: usize,
    /// Width of the soft answer-score vector.
    pub num_answer_classes: usize,
    /// Width of the per-image feature vector.
    pub feature_dim: usize,
    /// Directory holding `vdict.json` and `adict.json`.
    pub vocab_dir: PathBuf,
    /// Seed for shuffling and answer sampling.
    pub seed: u64,
    /// Iteration cap reported by the dataset wrapper.
    pub max_iterations: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_question_len: DEFAULT_MAX_QUESTION_LEN,
            num_answer_classes: DEFAULT_NUM_ANSWER_CLASSES,
            feature_dim: DEFAULT_FEATURE_DIM,
            vocab_dir: PathBuf::from("./result"),
            seed: 0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl ProviderConfig {
    /// Create a provider configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the maximum question length.
    #[must_use]
    pub fn with_max_question_len(mut self, len: usize) -> Self {
        self.max_question_len = len;
        self
    }

    /// Set the number of answer classes.
    #[must_use]
    pub fn with_num_answer_classes(mut self, n: usize) -> Self {
        self.num_answer_classes = n;
        self
    }

    /// Set the image-feature vector width.
    #[must_use]
    pub fn with_feature_dim(mut self, dim: usize) -> Self {
        self.feature_dim = dim;
        self
    }

    /// Set the vocabulary directory.
    #[must_use]
    pub fn with_vocab_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.vocab_dir = dir.into();
        self
    }

    /// Set the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the iteration cap reported by the dataset wrapper.
    #[must_use]
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Path to the question vocabulary file.
    #[must_use]
    pub fn vdict_path(&self) -> PathBuf {
        self.vocab_dir.join("vdict.json")
    }

    /// Path to the answer vocabulary file.
    #[must_use]
    pub fn adict_path(&self) -> PathBuf {
        self.vocab_dir.join("adict.json")
    }
}
