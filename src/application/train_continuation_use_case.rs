// ============================================================
// Layer 2 — Train Continuation Use Case
// ============================================================
// Full continuation-model training pipeline in order:
//
//   Step 1: Load the verse corpus          (Layer 4 - data)
//   Step 2: Build / load word vocabulary   (Layer 6 - infra)
//   Step 3: Build the composite prompt mix (Layer 4 - data)
//   Step 4: Save run config                (Layer 6 - infra)
//   Step 5: Run the training loop          (Layer 5 - ml)

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::data::composite::CompositeDataset;
use crate::data::loader::CorpusLoader;
use crate::data::vocab::Granularity;
use crate::domain::traits::VerseSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::vocab_store::{self, WORD_VOCAB_FILE};
use crate::ml::trainer::{train_continuation, CONTINUATION_CHECKPOINT};

/// All hyperparameters of one continuation training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuationTrainConfig {
    pub corpus_path: String,
    pub checkpoint_dir: String,

    pub d_model: usize,
    pub num_heads: usize,
    pub num_layers: usize,
    pub d_ff: usize,
    pub dropout: f64,
    /// Positional capacity; prompts plus continuations must fit
    pub max_seq_len: usize,
    /// Continuation length trained and produced, in words
    pub max_output_words: usize,

    pub batch_size: usize,
    pub epochs: usize,
    pub lr: f64,
    pub lr_patience: usize,
    pub min_lr: f64,
    /// Stop once teacher-forced accuracy reaches this
    pub target_accuracy: f64,

    pub seed: u64,
    pub resume: bool,
}

impl Default for ContinuationTrainConfig {
    fn default() -> Self {
        Self {
            corpus_path: "data/quran.txt".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            d_model: 128,
            num_heads: 4,
            num_layers: 4,
            d_ff: 512,
            dropout: 0.1,
            max_seq_len: 50,
            max_output_words: 5,
            batch_size: 32,
            epochs: 500,
            lr: 1e-3,
            lr_patience: 5,
            min_lr: 1e-7,
            target_accuracy: 0.999,
            seed: 42,
            resume: false,
        }
    }
}

pub struct TrainContinuationUseCase {
    config: ContinuationTrainConfig,
}

impl TrainContinuationUseCase {
    pub fn new(config: ContinuationTrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Load the verse corpus ─────────────────────────────────────
        tracing::info!("Loading verses from '{}'", cfg.corpus_path);
        let verses = CorpusLoader::new(&cfg.corpus_path).load_verses()?;
        tracing::info!("Loaded {} verses", verses.len());

        // ── Step 2: Build or load the word vocabulary ─────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir);
        let vocab_path = ckpt.dir().join(WORD_VOCAB_FILE);
        let vocab = vocab_store::load_or_build(&vocab_path, Granularity::Word, &verses)?;

        // ── Step 3: Build the composite prompt mix ────────────────────────────
        let dataset = CompositeDataset::standard(&verses, &vocab, cfg.max_output_words);
        tracing::info!(
            "Composite mix: {} subsets, {} samples",
            dataset.subsets().len(),
            burn::data::dataset::Dataset::len(&dataset)
        );

        // ── Step 4: Save the run config for inference ─────────────────────────
        ckpt.save_config(CONTINUATION_CHECKPOINT, cfg)?;

        // ── Step 5: Train ─────────────────────────────────────────────────────
        let auto = train_continuation(cfg, dataset, vocab.size(), &ckpt, Default::default())?;
        tracing::info!("Final autoregressive accuracy: {:.2}%", auto * 100.0);
        Ok(())
    }
}
