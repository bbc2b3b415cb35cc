//! # Vqafeed Core
//!
//! Mini-batch data provider for visual-question-answering training
//! pipelines. Loads question/answer JSON annotations per split,
//! tokenizes questions into fixed-length index vectors, pulls
//! precomputed image features from disk, and assembles fixed-shape
//! batches for a downstream model.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vqafeed_core::{DataConfig, ProviderConfig, VqaDataProvider};
//!
//! let data_config = DataConfig::from_file("data_paths.json").unwrap();
//! let config = ProviderConfig::new().with_batch_size(64).with_seed(1234);
//!
//! let mut provider = VqaDataProvider::new(&data_config, config, "train+genome").unwrap();
//! let out = provider.next_batch().unwrap();
//!
//! assert_eq!(out.batch.questions.dims()[0], 64);
//! ```
pub mod annotations;
pub mod batch;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod provider;
pub mod text;
pub mod types;
pub mod vocab;

// Re-export primary API
pub use annotations::AnnotationStore;
pub use batch::{AnswerLabels, Batch, BatchBuilder, RowLabel};
pub use config::{DataConfig, ProviderConfig, SplitPaths};
pub use dataset::{TrainingBatch, VqaDataset};
pub use error::{Result, VqafeedError};
pub use features::FeatureStore;
pub use provider::{BatchOutput, VqaDataProvider};
pub use text::{EncodedQuestion, QuestionTokenizer};
pub use types::{Mode, QuestionRecord, RawAnswer, Split};
pub use vocab::Vocabulary;
