// ============================================================
// Layer 2 — Train Matcher Use Case
// ============================================================
// Full classifier training pipeline in order:
//
//   Step 1: Load the verse corpus          (Layer 4 - data)
//   Step 2: Build / load char vocabulary   (Layer 6 - infra)
//   Step 3: Generate augmented windows     (Layer 4 - data)
//   Step 4: Save run config                (Layer 6 - infra)
//   Step 5: Run the training loop          (Layer 5 - ml)

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::data::dataset::{MatcherDataConfig, MatcherDataset};
use crate::data::loader::CorpusLoader;
use crate::data::vocab::Granularity;
use crate::domain::traits::VerseSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::vocab_store::{self, CHAR_VOCAB_FILE};
use crate::ml::trainer::{train_matcher, MATCHER_CHECKPOINT};

/// All hyperparameters of one classifier training run.
/// Serialized next to the weights so inference can rebuild the
/// exact architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherTrainConfig {
    pub corpus_path: String,
    pub checkpoint_dir: String,

    /// Fixed character-window length
    pub input_len: usize,
    /// Augmented copies per verse (first copy is clean)
    pub copies_per_verse: usize,
    /// Character-deletion rate for corrupted copies
    pub deletion_rate: f64,
    /// Probability a non-first copy is corrupted at all
    pub augment_prob: f64,
    /// Maximum window offset for long verses
    pub max_offset: usize,

    pub embed_dim: usize,
    pub hidden_size: usize,
    pub dropout: f64,

    pub batch_size: usize,
    pub epochs: usize,
    pub lr: f64,
    /// Epochs without improvement before the lr is halved
    pub lr_patience: usize,
    pub min_lr: f64,
    /// Smoothing mass spread over wrong classes, if any
    pub label_smoothing: Option<f32>,
    /// Stop as soon as this training accuracy is reached
    pub target_accuracy: f64,

    pub seed: u64,
    /// Continue from the saved checkpoint instead of scratch
    pub resume: bool,
}

impl Default for MatcherTrainConfig {
    fn default() -> Self {
        Self {
            corpus_path: "data/quran.txt".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            input_len: 60,
            copies_per_verse: 4,
            deletion_rate: 0.1,
            augment_prob: 0.7,
            max_offset: 10,
            embed_dim: 64,
            hidden_size: 512,
            dropout: 0.3,
            batch_size: 64,
            epochs: 100,
            lr: 5e-4,
            lr_patience: 3,
            min_lr: 1e-7,
            label_smoothing: None,
            target_accuracy: 0.99,
            seed: 42,
            resume: false,
        }
    }
}

pub struct TrainMatcherUseCase {
    config: MatcherTrainConfig,
}

impl TrainMatcherUseCase {
    pub fn new(config: MatcherTrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Load the verse corpus ─────────────────────────────────────
        tracing::info!("Loading verses from '{}'", cfg.corpus_path);
        let verses = CorpusLoader::new(&cfg.corpus_path).load_verses()?;
        tracing::info!("Loaded {} verses", verses.len());

        // ── Step 2: Build or load the character vocabulary ────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir);
        let vocab_path = ckpt.dir().join(CHAR_VOCAB_FILE);
        let vocab = vocab_store::load_or_build(&vocab_path, Granularity::Char, &verses)?;

        // ── Step 3: Generate the augmented training windows ───────────────────
        let data_cfg = MatcherDataConfig {
            input_len: cfg.input_len,
            copies_per_verse: cfg.copies_per_verse,
            deletion_rate: cfg.deletion_rate,
            augment_prob: cfg.augment_prob,
            max_offset: cfg.max_offset,
        };
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let dataset = MatcherDataset::generate(&verses, &vocab, &data_cfg, &mut rng);

        // ── Step 4: Save the run config for inference ─────────────────────────
        ckpt.save_config(MATCHER_CHECKPOINT, cfg)?;

        // ── Step 5: Train ─────────────────────────────────────────────────────
        let best = train_matcher(
            cfg,
            dataset,
            vocab.size(),
            verses.len(),
            &ckpt,
            Default::default(),
        )?;
        tracing::info!("Best matcher accuracy: {:.2}%", best * 100.0);
        Ok(())
    }
}
