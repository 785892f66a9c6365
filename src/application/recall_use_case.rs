// ============================================================
// Layer 2 — Recall Use Cases
// ============================================================
// Inference entry points over saved checkpoints. Both follow
// the same shape: load corpus + vocabulary, read the run config
// and checkpoint metadata, VERIFY the metadata against the live
// corpus, and only then rebuild the model and load weights. A
// checkpoint trained on a different corpus is rejected up front
// with a typed integrity error.

use anyhow::Result;

use crate::data::loader::CorpusLoader;
use crate::domain::traits::VerseSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::vocab_store::{self, CHAR_VOCAB_FILE, WORD_VOCAB_FILE};
use crate::ml::continuation::ContinuationModelConfig;
use crate::ml::matcher::VerseMatcherConfig;
use crate::ml::predictor::{ContinuationPredictor, MatcherPredictor, VerseMatch};
use crate::ml::trainer::{EvalBackend, CONTINUATION_CHECKPOINT, MATCHER_CHECKPOINT};

use super::train_continuation_use_case::ContinuationTrainConfig;
use super::train_matcher_use_case::MatcherTrainConfig;

/// Identify a verse from a corrupted spoken fragment.
pub struct FindVerseUseCase {
    predictor: MatcherPredictor<EvalBackend>,
}

impl FindVerseUseCase {
    pub fn new(checkpoint_dir: &str, corpus_path: &str) -> Result<Self> {
        let verses = CorpusLoader::new(corpus_path).load_verses()?;
        let ckpt = CheckpointManager::new(checkpoint_dir);
        let vocab = vocab_store::load(&ckpt.dir().join(CHAR_VOCAB_FILE))?;

        let cfg: MatcherTrainConfig = ckpt.load_config(MATCHER_CHECKPOINT)?;
        let meta = ckpt.load_meta(MATCHER_CHECKPOINT)?;
        meta.verify(vocab.size(), verses.len())?;

        let device = Default::default();
        let model = VerseMatcherConfig::new(vocab.size(), cfg.input_len, verses.len())
            .with_embed_dim(cfg.embed_dim)
            .with_hidden_size(cfg.hidden_size)
            .with_dropout(cfg.dropout)
            .init::<EvalBackend>(&device);
        let model = ckpt.load_model(MATCHER_CHECKPOINT, model, &device)?;

        tracing::info!(
            "Matcher checkpoint loaded (epoch {}, accuracy {:.2}%)",
            meta.epoch,
            meta.accuracy * 100.0
        );
        Ok(Self {
            predictor: MatcherPredictor::new(model, vocab, verses, cfg.input_len, device),
        })
    }

    pub fn find(&self, text: &str, k: usize) -> Vec<VerseMatch> {
        self.predictor.find(text, k)
    }
}

/// Continue a verse from its opening words.
pub struct ContinueVerseUseCase {
    predictor: ContinuationPredictor<EvalBackend>,
    max_output_words: usize,
}

impl ContinueVerseUseCase {
    pub fn new(checkpoint_dir: &str) -> Result<Self> {
        let ckpt = CheckpointManager::new(checkpoint_dir);
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

        tracing::info!(
            "Continuation checkpoint loaded (epoch {}, loss {:.4})",
            meta.epoch,
            meta.loss
        );
        Ok(Self {
            predictor: ContinuationPredictor::new(model, vocab, device),
            max_output_words: cfg.max_output_words,
        })
    }

    /// Continue `text`; `max_new_words` of `None` uses the
    /// length the model was trained to produce.
    pub fn continue_verse(&self, text: &str, max_new_words: Option<usize>) -> String {
        self.predictor
            .continue_verse(text, max_new_words.unwrap_or(self.max_output_words))
    }
}
