//! # Training-Loop View
//!
//! Wraps the provider in the shape a training loop consumes: question
//! indices, per-row question lengths, image features, soft answer
//! scores, and the epoch counter.

use candle_core::Tensor;

use crate::batch::AnswerLabels;
use crate::config::{DataConfig, ProviderConfig};
use crate::error::{Result, VqafeedError};
use crate::provider::VqaDataProvider;

/// One training step's worth of tensors.
#[derive(Debug, Clone)]
pub struct TrainingBatch {
    /// Question vocabulary indices, `[batch, max_question_len]` u32.
    pub questions: Tensor,
    /// Real-token count per row, `[batch]` f32.
    pub question_lengths: Tensor,
    /// Image features, `[batch, feature_dim]` f32.
    pub features: Tensor,
    /// Soft answer-score distribution, `[batch, num_answer_classes]` f32.
    pub answer_scores: Tensor,
    /// Epoch counter after this batch.
    pub epoch: usize,
}

/// Dataset facade over a training-mode provider.
#[derive(Debug)]
pub struct VqaDataset {
    provider: VqaDataProvider,
}

impl VqaDataset {
    /// Wrap a provider. Evaluation-mode providers are rejected: their
    /// label shape does not fit the training loop.
    pub fn new(provider: VqaDataProvider) -> Result<Self> {
        if provider.mode().is_eval() {
            return Err(VqafeedError::NotTrainingMode {
                mode: provider.mode().to_string(),
            });
        }
        Ok(Self { provider })
    }

    /// Load annotations for a split spec and wrap the resulting provider.
    pub fn from_config(
        data_config: &DataConfig,
        config: ProviderConfig,
        spec: &str,
    ) -> Result<Self> {
        Self::new(VqaDataProvider::new(data_config, config, spec)?)
    }

    /// Pull the next training batch.
    pub fn next_batch(&mut self) -> Result<TrainingBatch> {
        let out = self.provider.next_batch()?;
        let question_lengths = out.batch.question_lengths()?;

        let AnswerLabels::Scores(answer_scores) = out.batch.labels else {
            // Training-mode providers always produce score labels.
            return Err(VqafeedError::NotTrainingMode {
                mode: self.provider.mode().to_string(),
            });
        };

        Ok(TrainingBatch {
            questions: out.batch.questions,
            question_lengths,
            features: out.batch.features,
            answer_scores,
            epoch: out.epoch,
        })
    }

    /// Iteration cap for the training loop, from the provider config.
    #[must_use]
    pub fn len(&self) -> usize {
        self.provider.config().max_iterations
    }

    /// Whether the iteration cap is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Access the wrapped provider.
    #[must_use]
    pub fn provider(&self) -> &VqaDataProvider {
        &self.provider
    }
}
