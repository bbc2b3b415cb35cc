//! # Batch Provider
//!
//! The epoch-aware sampler at the center of the crate. Owns the loaded
//! annotations, both vocabularies, and the feature store; walks a
//! shuffled question-id order with wraparound and assembles fixed-shape
//! mini-batches on demand.
//!
//! One provider instance is exclusively owned by one training loop:
//! everything is single-threaded, synchronous, blocking I/O per sample.

use candle_core::Device;
use oorandom::Rand32;
use tracing::info;

use crate::annotations::AnnotationStore;
use crate::batch::{Batch, BatchBuilder, RowLabel};
use crate::config::{DataConfig, ProviderConfig};
use crate::error::{Result, VqafeedError};
use crate::features::FeatureStore;
use crate::text::QuestionTokenizer;
use crate::types::{split_qid_key, Mode, RawAnswer, Split};
use crate::vocab::Vocabulary;

/// A batch plus the bookkeeping the training loop consumes alongside it.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// The assembled batch.
    pub batch: Batch,
    /// Namespaced ids of the selected questions, in row order.
    pub question_ids: Vec<String>,
    /// Image ids of the selected questions, in row order.
    pub image_ids: Vec<u64>,
    /// Epoch counter after assembling this batch.
    pub epoch: usize,
}

/// Loads VQA annotations and serves shuffled mini-batches.
#[derive(Debug)]
pub struct VqaDataProvider {
    config: ProviderConfig,
    spec: String,
    mode: Mode,
    store: AnnotationStore,
    question_vocab: Vocabulary,
    answer_vocab: Vocabulary,
    tokenizer: QuestionTokenizer,
    features: FeatureStore,
    device: Device,
    rng: Rand32,
    order: Vec<String>,
    cursor: usize,
    epoch: usize,
    skipped: usize,
}

impl VqaDataProvider {
    /// Load annotations and vocabularies for a `+`-separated split spec
    /// and build a provider.
    pub fn new(data_config: &DataConfig, config: ProviderConfig, spec: &str) -> Result<Self> {
        let store = AnnotationStore::load(data_config, spec)?;
        let question_vocab = Vocabulary::from_file(config.vdict_path())?;
        let answer_vocab = Vocabulary::from_file(config.adict_path())?;
        let features = FeatureStore::new(data_config, config.feature_dim);

        Self::from_parts(store, question_vocab, answer_vocab, features, config, spec)
    }

    /// Assemble a provider from preloaded components.
    pub fn from_parts(
        store: AnnotationStore,
        question_vocab: Vocabulary,
        answer_vocab: Vocabulary,
        features: FeatureStore,
        config: ProviderConfig,
        spec: &str,
    ) -> Result<Self> {
        let tokenizer = QuestionTokenizer::new()?;
        let mut rng = Rand32::new(config.seed);

        // Deterministic base order given the seed; map order is arbitrary.
        let mut order = store.question_ids();
        order.sort_unstable();
        shuffle(&mut rng, &mut order);

        Ok(Self {
            mode: Mode::from_spec(spec),
            spec: spec.to_string(),
            config,
            store,
            question_vocab,
            answer_vocab,
            tokenizer,
            features,
            device: Device::Cpu,
            rng,
            order,
            cursor: 0,
            epoch: 0,
            skipped: 0,
        })
    }

    /// The provider mode derived from the split spec.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Epoch counter: number of completed passes over the question order.
    #[must_use]
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Number of loaded questions.
    #[must_use]
    pub fn num_questions(&self) -> usize {
        self.store.len()
    }

    /// The provider configuration.
    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// All namespaced question ids.
    #[must_use]
    pub fn question_ids(&self) -> Vec<String> {
        self.store.question_ids()
    }

    /// The raw question id without its split namespace.
    #[must_use]
    pub fn stripped_question_id<'a>(&self, qid: &'a str) -> &'a str {
        split_qid_key(qid).1
    }

    /// Image id for a question.
    pub fn image_id(&self, qid: &str) -> Result<u64> {
        self.store
            .question(qid)
            .map(|record| record.image_id)
            .ok_or_else(|| VqafeedError::UnknownQuestionId { qid: qid.into() })
    }

    /// Raw question text for a question.
    pub fn question_str(&self, qid: &str) -> Result<&str> {
        self.store
            .question(qid)
            .map(|record| record.question.as_str())
            .ok_or_else(|| VqafeedError::UnknownQuestionId { qid: qid.into() })
    }

    /// Raw answer records for a question. `None` in test modes, which
    /// carry no ground truth, and for ids without annotations.
    #[must_use]
    pub fn answers(&self, qid: &str) -> Option<&[RawAnswer]> {
        if !self.mode.has_answers() {
            return None;
        }
        self.store.answers(qid)
    }

    /// The most popular of the (up to ten) raw answers. Ties break toward
    /// the lexicographically greatest answer string.
    #[must_use]
    pub fn most_common_answer(&self, answers: &[RawAnswer]) -> String {
        let mut counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
        for record in answers.iter().take(10) {
            *counts.entry(record.answer.as_str()).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
            .map(|(answer, _)| answer.to_string())
            .unwrap_or_default()
    }

    /// Uniformly sample one in-vocabulary answer.
    ///
    /// # Errors
    ///
    /// In training mode an empty in-vocabulary set is an error; in
    /// evaluation modes the vocabulary fallback answer is returned
    /// instead.
    pub fn sample_in_vocab_answer(
        &mut self,
        qid: &str,
        answers: &[RawAnswer],
    ) -> Result<String> {
        let in_vocab: Vec<&str> = answers
            .iter()
            .map(|record| record.answer.as_str())
            .filter(|answer| self.answer_vocab.contains(answer))
            .collect();

        if in_vocab.is_empty() {
            if self.mode.is_eval() {
                return Ok(String::new());
            }
            return Err(VqafeedError::NoInVocabAnswer { qid: qid.into() });
        }

        let pick = self.rng.rand_range(0..in_vocab.len() as u32) as usize;
        Ok(in_vocab[pick].to_string())
    }

    /// Count in-vocabulary answers into a score vector over the answer
    /// classes, normalized to sum 1. All-OOV answer sets produce the
    /// zero vector.
    #[must_use]
    pub fn answer_scores(&self, answers: &[RawAnswer]) -> Vec<f32> {
        let mut scores = vec![0.0f32; self.config.num_answer_classes];
        for record in answers {
            if let Some(index) = self.answer_vocab.index_of(&record.answer) {
                if let Some(slot) = scores.get_mut(index as usize) {
                    *slot += 1.0;
                }
            }
        }

        let total: f32 = scores.iter().sum();
        if total > 0.0 {
            for score in &mut scores {
                *score /= total;
            }
        }
        scores
    }

    /// Answer-class index for an answer string, with out-of-vocabulary
    /// strings mapped to the fallback entry.
    #[must_use]
    pub fn answer_index(&self, answer: &str) -> u32 {
        self.answer_vocab.lookup(answer)
    }

    /// Answer string for an answer-class index.
    #[must_use]
    pub fn answer_for_index(&self, index: u32) -> Option<&str> {
        self.answer_vocab.entry_for_index(index)
    }

    /// Whether any raw answer is in the answer vocabulary.
    #[must_use]
    pub fn has_in_vocab_answer(&self, answers: &[RawAnswer]) -> bool {
        answers
            .iter()
            .any(|record| self.answer_vocab.contains(&record.answer))
    }

    /// Assemble a batch for an explicit list of question ids.
    ///
    /// Training mode fills soft score labels; evaluation modes fill
    /// answer-class indices (the `-1` sentinel when the split carries no
    /// ground truth). Rows short of the batch size stay zero-filled.
    pub fn create_batch(&self, qids: &[String]) -> Result<Batch> {
        let mut builder = if self.mode.is_eval() {
            BatchBuilder::indices(
                self.config.batch_size,
                self.config.max_question_len,
                self.config.feature_dim,
            )
        } else {
            BatchBuilder::scores(
                self.config.batch_size,
                self.config.max_question_len,
                self.config.feature_dim,
                self.config.num_answer_classes,
            )
        };

        for qid in qids {
            let record = self
                .store
                .question(qid)
                .ok_or_else(|| VqafeedError::UnknownQuestionId { qid: qid.clone() })?;

            let encoded = self.tokenizer.encode(
                &record.question,
                &self.question_vocab,
                self.config.max_question_len,
            );

            let split = Split::parse(split_qid_key(qid).0)?;
            let features = self.features.load(split, record.image_id);

            let label = if !self.mode.has_answers() {
                RowLabel::Index(-1)
            } else {
                let answers = self
                    .store
                    .answers(qid)
                    .ok_or_else(|| VqafeedError::UnknownQuestionId { qid: qid.clone() })?;

                if self.mode.is_eval() {
                    let answer = self.most_common_answer(answers);
                    RowLabel::Index(i64::from(self.answer_index(&answer)))
                } else {
                    RowLabel::Scores(self.answer_scores(answers))
                }
            };

            builder.push_row(&encoded, &features, label);
        }

        builder.finish(&self.device)
    }

    /// Pull the next batch from the shuffled order.
    ///
    /// Walks the order with wraparound; in training mode, samples with
    /// zero in-vocabulary answers are skipped and counted. On wraparound
    /// the order is reshuffled, the epoch counter increments, and the
    /// skip count is logged and reset.
    ///
    /// # Errors
    ///
    /// Returns `NoUsableSamples` when a full pass yields nothing, which
    /// would otherwise loop forever.
    pub fn next_batch(&mut self) -> Result<BatchOutput> {
        if self.order.is_empty() {
            return Err(VqafeedError::NoUsableSamples {
                spec: self.spec.clone(),
            });
        }

        let mut question_ids = Vec::with_capacity(self.config.batch_size);
        let mut image_ids = Vec::with_capacity(self.config.batch_size);
        let mut rejected_streak = 0usize;

        while question_ids.len() < self.config.batch_size {
            if rejected_streak >= self.order.len() {
                return Err(VqafeedError::NoUsableSamples {
                    spec: self.spec.clone(),
                });
            }

            let qid = self.order[self.cursor].clone();
            if self.is_usable(&qid) {
                image_ids.push(self.image_id(&qid)?);
                question_ids.push(qid);
                rejected_streak = 0;
            } else {
                self.skipped += 1;
                rejected_streak += 1;
            }

            if self.cursor < self.order.len() - 1 {
                self.cursor += 1;
            } else {
                self.epoch += 1;
                info!(
                    epoch = self.epoch,
                    skipped = self.skipped,
                    "questions skipped in a single epoch"
                );
                self.skipped = 0;
                shuffle(&mut self.rng, &mut self.order);
                self.cursor = 0;
            }
        }

        let batch = self.create_batch(&question_ids)?;
        Ok(BatchOutput {
            batch,
            question_ids,
            image_ids,
            epoch: self.epoch,
        })
    }

    /// Evaluation modes take every sample; training mode requires at
    /// least one in-vocabulary answer.
    fn is_usable(&self, qid: &str) -> bool {
        if self.mode.is_eval() {
            return true;
        }
        self.store
            .answers(qid)
            .is_some_and(|answers| self.has_in_vocab_answer(answers))
    }
}

/// Fisher–Yates shuffle over the provider's RNG.
fn shuffle(rng: &mut Rand32, items: &mut [String]) {
    for i in (1..items.len()).rev() {
        let j = rng.rand_range(0..(i as u32 + 1)) as usize;
        items.swap(i, j);
    }
}
