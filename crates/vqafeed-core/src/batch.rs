//! # Batch Assembly
//!
//! Fixed-shape mini-batch matrices for the downstream model. Batches are
//! transient and rebuilt per request; rows short of the configured batch
//! size stay zero-filled.

use candle_core::{Device, Tensor};

use crate::error::Result;
use crate::text::EncodedQuestion;

/// Answer labels, shaped by provider mode.
#[derive(Debug, Clone)]
pub enum AnswerLabels {
    /// Soft score distribution over answer classes,
    /// `[batch, num_answer_classes]` f32. Training mode.
    Scores(Tensor),
    /// One answer-class index per sample, `[batch]` i64, with `-1` for
    /// samples whose split carries no answers. Evaluation modes.
    Indices(Tensor),
}

/// Per-sample label handed to the batch builder.
#[derive(Debug, Clone)]
pub enum RowLabel {
    /// Soft score distribution for one sample.
    Scores(Vec<f32>),
    /// Answer-class index (or `-1` sentinel) for one sample.
    Index(i64),
}

/// One assembled mini-batch.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Question vocabulary indices, `[batch, max_question_len]` u32.
    pub questions: Tensor,
    /// Sequence-continuation mask, `[batch, max_question_len]` f32.
    pub mask: Tensor,
    /// Image features, `[batch, feature_dim]` f32.
    pub features: Tensor,
    /// Answer labels, shaped by mode.
    pub labels: AnswerLabels,
}

impl Batch {
    /// Number of rows in the batch.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.questions.dims()[0]
    }

    /// Per-row question lengths, `[batch]` f32 (mask row sums).
    pub fn question_lengths(&self) -> Result<Tensor> {
        Ok(self.mask.sum(1)?)
    }
}

/// Accumulates rows into flat buffers and reshapes them into tensors.
pub struct BatchBuilder {
    batch_size: usize,
    max_question_len: usize,
    feature_dim: usize,
    questions: Vec<u32>,
    mask: Vec<f32>,
    features: Vec<f32>,
    scores: Option<Vec<f32>>,
    indices: Option<Vec<i64>>,
    num_answer_classes: usize,
    row: usize,
}

impl BatchBuilder {
    /// Builder whose labels are soft score distributions.
    #[must_use]
    pub fn scores(
        batch_size: usize,
        max_question_len: usize,
        feature_dim: usize,
        num_answer_classes: usize,
    ) -> Self {
        Self {
            batch_size,
            max_question_len,
            feature_dim,
            questions: vec![0; batch_size * max_question_len],
            mask: vec![0.0; batch_size * max_question_len],
            features: vec![0.0; batch_size * feature_dim],
            scores: Some(vec![0.0; batch_size * num_answer_classes]),
            indices: None,
            num_answer_classes,
            row: 0,
        }
    }

    /// Builder whose labels are per-sample class indices.
    #[must_use]
    pub fn indices(batch_size: usize, max_question_len: usize, feature_dim: usize) -> Self {
        Self {
            batch_size,
            max_question_len,
            feature_dim,
            questions: vec![0; batch_size * max_question_len],
            mask: vec![0.0; batch_size * max_question_len],
            features: vec![0.0; batch_size * feature_dim],
            scores: None,
            indices: Some(vec![0; batch_size]),
            num_answer_classes: 0,
            row: 0,
        }
    }

    /// Write one sample into the next row. Rows past `batch_size` are
    /// ignored, keeping the batch shape fixed.
    pub fn push_row(&mut self, encoded: &EncodedQuestion, features: &[f32], label: RowLabel) {
        if self.row >= self.batch_size {
            return;
        }
        let i = self.row;

        let q_off = i * self.max_question_len;
        let q_len = encoded.indices.len().min(self.max_question_len);
        self.questions[q_off..q_off + q_len].copy_from_slice(&encoded.indices[..q_len]);
        self.mask[q_off..q_off + q_len].copy_from_slice(&encoded.mask[..q_len]);

        let f_off = i * self.feature_dim;
        let f_len = features.len().min(self.feature_dim);
        self.features[f_off..f_off + f_len].copy_from_slice(&features[..f_len]);

        match label {
            RowLabel::Scores(row) => {
                if let Some(scores) = self.scores.as_mut() {
                    let s_off = i * self.num_answer_classes;
                    let s_len = row.len().min(self.num_answer_classes);
                    scores[s_off..s_off + s_len].copy_from_slice(&row[..s_len]);
                }
            }
            RowLabel::Index(index) => {
                if let Some(indices) = self.indices.as_mut() {
                    indices[i] = index;
                }
            }
        }

        self.row += 1;
    }

    /// Reshape the accumulated buffers into batch tensors.
    pub fn finish(self, device: &Device) -> Result<Batch> {
        let shape = (self.batch_size, self.max_question_len);
        let questions = Tensor::from_vec(self.questions, shape, device)?;
        let mask = Tensor::from_vec(self.mask, shape, device)?;
        let features = Tensor::from_vec(
            self.features,
            (self.batch_size, self.feature_dim),
            device,
        )?;

        let labels = if let Some(scores) = self.scores {
            AnswerLabels::Scores(Tensor::from_vec(
                scores,
                (self.batch_size, self.num_answer_classes),
                device,
            )?)
        } else {
            let indices = self.indices.unwrap_or_else(|| vec![0; self.batch_size]);
            AnswerLabels::Indices(Tensor::from_vec(indices, self.batch_size, device)?)
        };

        Ok(Batch {
            questions,
            mask,
            features,
            labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(indices: Vec<u32>, mask: Vec<f32>) -> EncodedQuestion {
        EncodedQuestion { indices, mask }
    }

    #[test]
    fn test_scores_batch_shapes() {
        let mut builder = BatchBuilder::scores(2, 3, 4, 5);
        builder.push_row(
            &encoded(vec![1, 2, 0], vec![1.0, 1.0, 0.0]),
            &[0.5; 4],
            RowLabel::Scores(vec![0.0, 1.0, 0.0, 0.0, 0.0]),
        );
        builder.push_row(
            &encoded(vec![3, 0, 0], vec![1.0, 0.0, 0.0]),
            &[0.25; 4],
            RowLabel::Scores(vec![0.5, 0.5, 0.0, 0.0, 0.0]),
        );

        let batch = builder.finish(&Device::Cpu).unwrap();
        assert_eq!(batch.questions.dims(), &[2, 3]);
        assert_eq!(batch.mask.dims(), &[2, 3]);
        assert_eq!(batch.features.dims(), &[2, 4]);
        match &batch.labels {
            AnswerLabels::Scores(t) => assert_eq!(t.dims(), &[2, 5]),
            AnswerLabels::Indices(_) => panic!("expected scores"),
        }
    }

    #[test]
    fn test_indices_batch_with_sentinel() {
        let mut builder = BatchBuilder::indices(2, 3, 4);
        builder.push_row(
            &encoded(vec![1, 2, 0], vec![1.0, 1.0, 0.0]),
            &[0.5; 4],
            RowLabel::Index(-1),
        );

        let batch = builder.finish(&Device::Cpu).unwrap();
        match &batch.labels {
            AnswerLabels::Indices(t) => {
                let values = t.to_vec1::<i64>().unwrap();
                assert_eq!(values, vec![-1, 0]);
            }
            AnswerLabels::Scores(_) => panic!("expected indices"),
        }
    }

    #[test]
    fn test_unfilled_rows_stay_zero() {
        let mut builder = BatchBuilder::scores(3, 2, 2, 2);
        builder.push_row(
            &encoded(vec![7, 8], vec![1.0, 1.0]),
            &[1.0, 1.0],
            RowLabel::Scores(vec![1.0, 0.0]),
        );

        let batch = builder.finish(&Device::Cpu).unwrap();
        let questions = batch.questions.to_vec2::<u32>().unwrap();
        assert_eq!(questions[0], vec![7, 8]);
        assert_eq!(questions[1], vec![0, 0]);
        assert_eq!(questions[2], vec![0, 0]);
    }

    #[test]
    fn test_question_lengths() {
        let mut builder = BatchBuilder::indices(2, 4, 2);
        builder.push_row(
            &encoded(vec![1, 2, 3, 0], vec![1.0, 1.0, 1.0, 0.0]),
            &[0.0, 0.0],
            RowLabel::Index(4),
        );
        builder.push_row(
            &encoded(vec![1, 0, 0, 0], vec![1.0, 0.0, 0.0, 0.0]),
            &[0.0, 0.0],
            RowLabel::Index(2),
        );

        let batch = builder.finish(&Device::Cpu).unwrap();
        let lengths = batch.question_lengths().unwrap().to_vec1::<f32>().unwrap();
        assert_eq!(lengths, vec![3.0, 1.0]);
    }

    #[test]
    fn test_extra_rows_ignored() {
        let mut builder = BatchBuilder::indices(1, 2, 2);
        builder.push_row(
            &encoded(vec![1, 2], vec![1.0, 1.0]),
            &[1.0, 0.0],
            RowLabel::Index(1),
        );
        builder.push_row(
            &encoded(vec![3, 4], vec![1.0, 1.0]),
            &[0.0, 1.0],
            RowLabel::Index(2),
        );

        let batch = builder.finish(&Device::Cpu).unwrap();
        assert_eq!(batch.batch_size(), 1);
        let questions = batch.questions.to_vec2::<u32>().unwrap();
        assert_eq!(questions[0], vec![1, 2]);
    }
}
