// ============================================================
// Layer 2 — Evaluate Use Case
// ============================================================
// Reports both accuracy figures for a saved continuation
// checkpoint over the full composite prompt mix: the fast
// teacher-forced estimate and the honest autoregressive one.
// The gap between them shows how much the model depends on
// being fed the true prefix.

use anyhow::Result;

use crate::data::composite::CompositeDataset;
use crate::data::dataset::ContinuationSample;
use crate::data::loader::CorpusLoader;
use crate::domain::traits::VerseSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::vocab_store::{self, WORD_VOCAB_FILE};
use crate::ml::continuation::ContinuationModelConfig;
use crate::ml::evaluator::{autoregressive_accuracy, teacher_forced_accuracy};
use crate::ml::trainer::{EvalBackend, CONTINUATION_CHECKPOINT};

use super::train_continuation_use_case::ContinuationTrainConfig;

/// Both accuracy figures of one evaluation run.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationReport {
    pub teacher_forced: f64,
    pub autoregressive: f64,
    pub samples: usize,
}

pub struct EvaluateUseCase {
    checkpoint_dir: String,
    corpus_path: String,
}

impl EvaluateUseCase {
    pub fn new(checkpoint_dir: String, corpus_path: String) -> Self {
        Self {
            checkpoint_dir,
            corpus_path,
        }
    }

    pub fn execute(&self) -> Result<EvaluationReport> {
        let verses = CorpusLoader::new(&self.corpus_path).load_verses()?;
        let ckpt = CheckpointManager::new(&self.checkpoint_dir);
        let vocab = vocab_store::load(&ckpt.dir().join(WORD_VOCAB_FILE))?;

        let cfg: ContinuationTrainConfig = ckpt.load_config(CONTINUATION_CHECKPOINT)?;
        let meta = ckpt.load_meta(CONTINUATION_CHECKPOINT)?;
        meta.verify(vocab.size(), vocab.size())?;

        let device = Default::default();
        let model = ContinuationModelConfig::new(vocab.size(), cfg.max_seq_len)
            .with_d_model(cfg.d_model)
            .with_num_heads(cfg.num_heads)
            .with_num_layers(cfg.num_layers)
            .with_d_ff(cfg.d_ff)
            .with_dropout(cfg.dropout)
            .init::<EvalBackend>(&device);
        let model = ckpt.load_model(CONTINUATION_CHECKPOINT, model, &device)?;

        let dataset = CompositeDataset::standard(&verses, &vocab, cfg.max_output_words);
        let samples: Vec<ContinuationSample> = dataset.iter().cloned().collect();
        tracing::info!("Evaluating {} samples", samples.len());

        let teacher_forced =
            teacher_forced_accuracy(&model, &samples, cfg.batch_size, &device);
        tracing::info!("Teacher-forced accuracy: {:.2}%", teacher_forced * 100.0);

        let autoregressive = autoregressive_accuracy(&model, &samples, &device);
        tracing::info!("Autoregressive accuracy: {:.2}%", autoregressive * 100.0);

        Ok(EvaluationReport {
            teacher_forced,
            autoregressive,
            samples: samples.len(),
        })
    }
}
