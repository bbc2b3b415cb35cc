//! # Annotation Loading
//!
//! Parses question/answer JSON files per data split and merges them into
//! a single store keyed by namespaced question id. Splits are combined by
//! straightforward key union, so a cross-split id collision silently
//! overwrites the earlier entry.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::config::{DataConfig, SplitPaths};
use crate::error::{Result, VqafeedError};
use crate::types::{QuestionRecord, RawAnswer, Split};

#[derive(Debug, Deserialize)]
struct QuestionFile {
    questions: Vec<QuestionEntry>,
}

#[derive(Debug, Deserialize)]
struct QuestionEntry {
    question_id: u64,
    question: String,
    image_id: u64,
}

#[derive(Debug, Deserialize)]
struct AnnotationFile {
    annotations: Vec<AnnotationEntry>,
}

#[derive(Debug, Deserialize)]
struct AnnotationEntry {
    question_id: u64,
    answers: Vec<RawAnswer>,
}

#[derive(Debug, Deserialize)]
struct GenomeEntry {
    id: u64,
    question: String,
    image: u64,
    answer: String,
}

/// Questions and raw answers for one or more splits. Immutable after load.
#[derive(Debug, Default)]
pub struct AnnotationStore {
    questions: HashMap<String, QuestionRecord>,
    answers: HashMap<String, Vec<RawAnswer>>,
}

impl AnnotationStore {
    /// Load and merge every split named in a `+`-separated split spec.
    pub fn load(config: &DataConfig, spec: &str) -> Result<Self> {
        let mut store = Self::default();

        for name in spec.split('+') {
            let split = Split::parse(name)?;
            let paths = config.paths_for(split)?;

            if split == Split::Genome {
                store.load_genome_split(paths)?;
            } else {
                store.load_vqa_split(split, paths)?;
            }
        }

        Ok(store)
    }

    fn load_vqa_split(&mut self, split: Split, paths: &SplitPaths) -> Result<()> {
        let question_file =
            paths
                .question_file
                .as_deref()
                .ok_or(VqafeedError::IncompleteSplitPaths {
                    split: split.as_str().into(),
                    field: "question_file",
                })?;

        let file: QuestionFile = read_json(question_file)?;
        let count = file.questions.len();
        for entry in file.questions {
            self.questions.insert(
                split.qid_key(entry.question_id),
                QuestionRecord {
                    question: entry.question,
                    image_id: entry.image_id,
                },
            );
        }

        if split.has_annotations() {
            let annotation_file = paths.annotation_file.as_deref().ok_or(
                VqafeedError::IncompleteSplitPaths {
                    split: split.as_str().into(),
                    field: "annotation_file",
                },
            )?;

            let file: AnnotationFile = read_json(annotation_file)?;
            for entry in file.annotations {
                self.answers
                    .insert(split.qid_key(entry.question_id), entry.answers);
            }
        }

        info!(split = %split, questions = count, "parsed questions");
        Ok(())
    }

    fn load_genome_split(&mut self, paths: &SplitPaths) -> Result<()> {
        let genome_file =
            paths
                .genome_file
                .as_deref()
                .ok_or(VqafeedError::IncompleteSplitPaths {
                    split: Split::Genome.as_str().into(),
                    field: "genome_file",
                })?;

        let entries: Vec<GenomeEntry> = read_json(genome_file)?;
        let count = entries.len();
        for entry in entries {
            let key = Split::Genome.qid_key(entry.id);
            self.questions.insert(
                key.clone(),
                QuestionRecord {
                    question: entry.question,
                    image_id: entry.image,
                },
            );
            self.answers.insert(
                key,
                vec![RawAnswer {
                    answer: entry.answer,
                }],
            );
        }

        info!(split = %Split::Genome, questions = count, "parsed questions");
        Ok(())
    }

    /// Look up a question record by namespaced id.
    #[must_use]
    pub fn question(&self, qid: &str) -> Option<&QuestionRecord> {
        self.questions.get(qid)
    }

    /// Look up the raw answer records for a question.
    #[must_use]
    pub fn answers(&self, qid: &str) -> Option<&[RawAnswer]> {
        self.answers.get(qid).map(Vec::as_slice)
    }

    /// All namespaced question ids, in arbitrary map order.
    #[must_use]
    pub fn question_ids(&self) -> Vec<String> {
        self.questions.keys().cloned().collect()
    }

    /// Number of loaded questions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether no questions were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
