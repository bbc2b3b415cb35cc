use thiserror::Error;

/// Errors that can occur while loading annotations or assembling batches.
#[derive(Debug, Error)]
pub enum VqafeedError {
    /// A split name that has no entry in the data-paths config.
    #[error("unknown data split: {split:?}")]
    UnknownSplit {
        /// The split name that could not be resolved.
        split: String,
    },

    /// A configured split that lacks a file the loader needs.
    #[error("config for split {split:?} is missing {field}")]
    IncompleteSplitPaths {
        /// The split whose config entry is incomplete.
        split: String,
        /// The missing field name.
        field: &'static str,
    },

    /// A question id that is not present in the loaded annotations.
    #[error("unknown question id: {qid:?}")]
    UnknownQuestionId {
        /// The namespaced question id that failed to resolve.
        qid: String,
    },

    /// A vocabulary file without the empty-string fallback entry.
    #[error("vocabulary {path:?} is missing the fallback entry")]
    MissingFallbackEntry {
        /// The vocabulary file that failed validation.
        path: String,
    },

    /// No in-vocabulary answer was available where one is required.
    #[error("no in-vocabulary answer for question {qid:?}")]
    NoInVocabAnswer {
        /// The question whose answers all fell outside the vocabulary.
        qid: String,
    },

    /// A full pass over the shuffled order produced no usable sample.
    #[error("no usable samples left in split spec {spec:?}")]
    NoUsableSamples {
        /// The split spec the provider was constructed with.
        spec: String,
    },

    /// The dataset wrapper was asked to serve an evaluation mode.
    #[error("dataset wrapper requires training mode, got {mode}")]
    NotTrainingMode {
        /// The rejected mode name.
        mode: String,
    },

    /// A regex pattern failed to compile (should not happen with the
    /// static patterns defined in this crate).
    #[error("regex compilation error: {0}")]
    Regex(#[from] regex::Error),

    /// Filesystem error while reading annotations, vocabularies, or config.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON in an annotation, vocabulary, or config file.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A per-image feature file that exists but cannot be used.
    #[error("feature file error: {0}")]
    FeatureFile(String),

    /// Tensor construction failed while assembling a batch.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
}

/// Result type alias for vqafeed operations.
pub type Result<T> = std::result::Result<T, VqafeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = VqafeedError::UnknownSplit {
            split: "train2099".into(),
        };
        assert!(err.to_string().contains("train2099"));

        let err = VqafeedError::NoInVocabAnswer {
            qid: "train/42".into(),
        };
        assert!(err.to_string().contains("train/42"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<VqafeedError>();
    }
}
