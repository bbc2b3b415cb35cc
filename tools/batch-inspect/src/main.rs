//! Batch Inspection Tool
//!
//! Builds a provider from a data-paths config, pulls a few batches, and
//! reports shapes, epoch transitions, and image coverage. Useful for
//! validating a data layout before committing to a long training run.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use vqafeed_core::{AnswerLabels, DataConfig, ProviderConfig, VqaDataProvider};

/// CLI arguments
#[derive(Parser)]
#[command(name = "batch-inspect")]
#[command(about = "Pull and inspect mini-batches from a vqafeed data config")]
#[command(version)]
struct Cli {
    /// Data-paths config file (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Directory holding vdict.json and adict.json
    #[arg(short = 'v', long)]
    vocab_dir: PathBuf,

    /// `+`-separated split spec, e.g. "train" or "train+genome"
    #[arg(short, long, default_value = "train")]
    splits: String,

    /// Number of batches to pull
    #[arg(short, long, default_value_t = 5)]
    batches: usize,

    /// Batch size
    #[arg(long, default_value_t = 64)]
    batch_size: usize,

    /// Maximum question length in tokens
    #[arg(long, default_value_t = 15)]
    max_question_len: usize,

    /// Number of answer classes
    #[arg(long, default_value_t = 3000)]
    answer_classes: usize,

    /// Image-feature vector width
    #[arg(long, default_value_t = 2048)]
    feature_dim: usize,

    /// RNG seed for shuffling
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let data_config = DataConfig::from_file(&cli.config)
        .with_context(|| format!("cannot load data config '{}'", cli.config.display()))?;

    let provider_config = ProviderConfig::new()
        .with_batch_size(cli.batch_size)
        .with_max_question_len(cli.max_question_len)
        .with_num_answer_classes(cli.answer_classes)
        .with_feature_dim(cli.feature_dim)
        .with_vocab_dir(&cli.vocab_dir)
        .with_seed(cli.seed);

    let mut provider = VqaDataProvider::new(&data_config, provider_config, &cli.splits)
        .with_context(|| format!("cannot build provider for splits '{}'", cli.splits))?;

    info!(
        splits = %cli.splits,
        mode = %provider.mode(),
        questions = provider.num_questions(),
        "provider ready"
    );

    let mut seen_images = HashSet::new();
    let mut last_epoch = provider.epoch();

    for i in 0..cli.batches {
        let out = provider
            .next_batch()
            .with_context(|| format!("failed to pull batch {i}"))?;

        seen_images.extend(out.image_ids.iter().copied());
        if out.epoch != last_epoch {
            info!(epoch = out.epoch, "epoch boundary crossed");
            last_epoch = out.epoch;
        }

        let label_shape = match &out.batch.labels {
            AnswerLabels::Scores(t) => format!("scores {:?}", t.dims()),
            AnswerLabels::Indices(t) => format!("indices {:?}", t.dims()),
        };

        println!(
            "batch {:>3}: questions {:?}  mask {:?}  features {:?}  labels {}  epoch {}",
            i,
            out.batch.questions.dims(),
            out.batch.mask.dims(),
            out.batch.features.dims(),
            label_shape,
            out.epoch
        );
    }

    println!(
        "pulled {} batches, {} distinct images, finished at epoch {}",
        cli.batches,
        seen_images.len(),
        last_epoch
    );

    Ok(())
}
