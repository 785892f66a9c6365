// ============================================================
// Layer 5 — Training Loops
// ============================================================
// One loop per model family, both on the CPU NdArray backend:
//
//   matcher      — DataLoader batches, cross-entropy, top-1
//                  accuracy per epoch, best-ACCURACY checkpoint
//   continuation — manual batch loop over the composite mix
//                  (reshuffled each epoch), masked loss averaged
//                  per supervised token, teacher-forced accuracy
//                  per epoch, best-LOSS checkpoint, one
//                  autoregressive evaluation at the end
//
// Shared machinery: Adam with gradient-norm clipping at 1.0, a
// reduce-on-plateau learning-rate schedule with a hard floor,
// per-epoch CSV metrics, and early stopping.

use anyhow::Result;
use burn::{
    data::dataloader::{batcher::Batcher, DataLoaderBuilder},
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::application::train_continuation_use_case::ContinuationTrainConfig;
use crate::application::train_matcher_use_case::MatcherTrainConfig;
use crate::data::batcher::{ContinuationBatcher, MatcherBatcher};
use crate::data::composite::CompositeDataset;
use crate::data::dataset::{ContinuationSample, MatcherDataset};
use crate::infra::checkpoint::{CheckpointManager, CheckpointMeta};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::continuation::ContinuationModelConfig;
use crate::ml::evaluator::{autoregressive_accuracy, teacher_forced_accuracy};
use crate::ml::matcher::VerseMatcherConfig;

pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;
pub type EvalBackend = burn::backend::NdArray;
pub type TrainDevice = burn::backend::ndarray::NdArrayDevice;

/// Checkpoint names shared between training and inference.
pub const MATCHER_CHECKPOINT: &str = "matcher";
pub const CONTINUATION_CHECKPOINT: &str = "continuation";

// ─── Plateau LR schedule ──────────────────────────────────────────────────────

/// Reduce-on-plateau: halve the learning rate after `patience`
/// epochs without a loss improvement, never below `min_lr`.
pub struct PlateauScheduler {
    lr: f64,
    factor: f64,
    patience: usize,
    min_lr: f64,
    best_loss: f64,
    stale: usize,
}

impl PlateauScheduler {
    pub fn new(lr: f64, factor: f64, patience: usize, min_lr: f64) -> Self {
        Self {
            lr,
            factor,
            patience,
            min_lr,
            best_loss: f64::INFINITY,
            stale: 0,
        }
    }

    /// Feed one epoch's average loss, get the lr for the next.
    pub fn step(&mut self, loss: f64) -> f64 {
        if loss < self.best_loss {
            self.best_loss = loss;
            self.stale = 0;
        } else {
            self.stale += 1;
            if self.stale >= self.patience && self.lr > self.min_lr {
                self.lr = (self.lr * self.factor).max(self.min_lr);
                self.stale = 0;
                tracing::info!("Loss plateaued, learning rate reduced to {:.2e}", self.lr);
            }
        }
        self.lr
    }

    pub fn lr(&self) -> f64 {
        self.lr
    }

    /// The schedule has no further reductions to offer.
    pub fn at_floor(&self) -> bool {
        self.lr <= self.min_lr
    }

    /// Epochs since the last loss improvement.
    pub fn stale_epochs(&self) -> usize {
        self.stale
    }
}

// ─── Matcher training ─────────────────────────────────────────────────────────

/// Train the verse classifier. Returns the best accuracy seen;
/// the checkpoint on disk holds the weights that achieved it.
pub fn train_matcher(
    cfg: &MatcherTrainConfig,
    dataset: MatcherDataset,
    vocab_size: usize,
    output_size: usize,
    ckpt: &CheckpointManager,
    device: TrainDevice,
) -> Result<f64> {
    TrainBackend::seed(cfg.seed);

    let model_cfg = VerseMatcherConfig::new(vocab_size, cfg.input_len, output_size)
        .with_embed_dim(cfg.embed_dim)
        .with_hidden_size(cfg.hidden_size)
        .with_dropout(cfg.dropout);
    let mut model = model_cfg.init::<TrainBackend>(&device);

    let mut start_epoch = 1;
    let mut best_accuracy = 0.0f64;
    if cfg.resume && ckpt.exists(MATCHER_CHECKPOINT) {
        let meta = ckpt.load_meta(MATCHER_CHECKPOINT)?;
        meta.verify(vocab_size, output_size)?;
        model = ckpt.load_model(MATCHER_CHECKPOINT, model, &device)?;
        start_epoch = meta.epoch + 1;
        best_accuracy = meta.accuracy;
        tracing::info!(
            "Resuming matcher training from epoch {} (best accuracy {:.2}%)",
            meta.epoch,
            best_accuracy * 100.0
        );
    }

    let mut optim = AdamConfig::new()
        .with_grad_clipping(Some(GradientClippingConfig::Norm(1.0)))
        .init();
    let mut schedule = PlateauScheduler::new(cfg.lr, 0.5, cfg.lr_patience, cfg.min_lr);
    let logger = MetricsLogger::new(ckpt.dir().clone(), MATCHER_CHECKPOINT)?;

    let loader = DataLoaderBuilder::new(MatcherBatcher::<TrainBackend>::new(device))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(dataset);

    let mut lr = schedule.lr();
    for epoch in start_epoch..=cfg.epochs {
        let mut loss_sum = 0.0f64;
        let mut batches = 0usize;
        let mut correct = 0usize;
        let mut total = 0usize;

        for batch in loader.iter() {
            let classes = batch.classes.clone();
            let (loss, logits) = model.forward_loss(batch.tokens, batch.classes, cfg.label_smoothing);

            loss_sum += loss.clone().into_scalar().elem::<f64>();
            batches += 1;

            // argmax(1) keeps the reduced dim — flatten back to [batch]
            let predicted = logits.argmax(1).flatten::<1>(0, 1);
            total += classes.dims()[0];
            correct += predicted
                .equal(classes)
                .int()
                .sum()
                .into_scalar()
                .elem::<i64>() as usize;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(lr, model, grads);
        }

        let avg_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        let accuracy = if total > 0 { correct as f64 / total as f64 } else { 0.0 };

        tracing::info!(
            "Matcher epoch {:>3}/{} | loss={:.4} | accuracy={:.2}% | lr={:.2e}",
            epoch,
            cfg.epochs,
            avg_loss,
            accuracy * 100.0,
            lr
        );
        logger.log(&EpochMetrics::new(epoch, avg_loss, accuracy, lr))?;

        if accuracy > best_accuracy {
            best_accuracy = accuracy;
            ckpt.save_model(
                MATCHER_CHECKPOINT,
                &model,
                &CheckpointMeta {
                    epoch,
                    loss: avg_loss,
                    accuracy,
                    vocab_size,
                    output_size,
                },
            )?;
        }

        if best_accuracy >= cfg.target_accuracy {
            tracing::info!("Target accuracy reached at epoch {}, stopping", epoch);
            break;
        }
        lr = schedule.step(avg_loss);
        if schedule.at_floor() && schedule.stale_epochs() >= cfg.lr_patience {
            tracing::info!("Learning rate at floor with no improvement, stopping");
            break;
        }
    }

    tracing::info!("Matcher training done, best accuracy {:.2}%", best_accuracy * 100.0);
    Ok(best_accuracy)
}

// ─── Continuation training ────────────────────────────────────────────────────

/// Train the continuation model on the composite prompt mix.
/// Returns the final autoregressive accuracy of the best
/// checkpoint.
pub fn train_continuation(
    cfg: &ContinuationTrainConfig,
    mut dataset: CompositeDataset,
    vocab_size: usize,
    ckpt: &CheckpointManager,
    device: TrainDevice,
) -> Result<f64> {
    TrainBackend::seed(cfg.seed);
    let mut rng = StdRng::seed_from_u64(cfg.seed);

    let model_cfg = ContinuationModelConfig::new(vocab_size, cfg.max_seq_len)
        .with_d_model(cfg.d_model)
        .with_num_heads(cfg.num_heads)
        .with_num_layers(cfg.num_layers)
        .with_d_ff(cfg.d_ff)
        .with_dropout(cfg.dropout);
    let mut model = model_cfg.init::<TrainBackend>(&device);

    let mut start_epoch = 1;
    let mut best_loss = f64::INFINITY;
    if cfg.resume && ckpt.exists(CONTINUATION_CHECKPOINT) {
        let meta = ckpt.load_meta(CONTINUATION_CHECKPOINT)?;
        meta.verify(vocab_size, vocab_size)?;
        model = ckpt.load_model(CONTINUATION_CHECKPOINT, model, &device)?;
        start_epoch = meta.epoch + 1;
        best_loss = meta.loss;
        tracing::info!(
            "Resuming continuation training from epoch {} (best loss {:.4})",
            meta.epoch,
            best_loss
        );
    }

    let mut optim = AdamConfig::new()
        .with_grad_clipping(Some(GradientClippingConfig::Norm(1.0)))
        .init();
    let mut schedule = PlateauScheduler::new(cfg.lr, 0.5, cfg.lr_patience, cfg.min_lr);
    let logger = MetricsLogger::new(ckpt.dir().clone(), CONTINUATION_CHECKPOINT)?;
    let batcher = ContinuationBatcher::<TrainBackend>::new(device);

    let mut lr = schedule.lr();
    let mut final_epoch = start_epoch;
    for epoch in start_epoch..=cfg.epochs {
        final_epoch = epoch;
        dataset.reshuffle(&mut rng);
        let samples: Vec<ContinuationSample> = dataset.iter().cloned().collect();

        // Average the loss per supervised TOKEN, not per batch,
        // so short-prompt batches don't dominate the figure
        let mut loss_token_sum = 0.0f64;
        let mut token_total = 0usize;

        for chunk in samples.chunks(cfg.batch_size.max(1)) {
            let tokens: usize = chunk.iter().map(|s| s.expected_ids.len()).sum();
            let batch = batcher.batch(chunk.to_vec());
            let (loss, _) = model.forward_loss(batch);

            loss_token_sum += loss.clone().into_scalar().elem::<f64>() * tokens as f64;
            token_total += tokens;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(lr, model, grads);
        }

        let avg_loss = if token_total > 0 {
            loss_token_sum / token_total as f64
        } else {
            f64::NAN
        };

        // Per-epoch accuracy on the fast estimator only; the
        // honest autoregressive figure comes once at the end
        let accuracy =
            teacher_forced_accuracy(&model.valid(), &samples, cfg.batch_size, &device);

        tracing::info!(
            "Continuation epoch {:>3}/{} | loss={:.4} | tf_accuracy={:.2}% | lr={:.2e}",
            epoch,
            cfg.epochs,
            avg_loss,
            accuracy * 100.0,
            lr
        );
        logger.log(&EpochMetrics::new(epoch, avg_loss, accuracy, lr))?;

        if avg_loss < best_loss {
            best_loss = avg_loss;
            ckpt.save_model(
                CONTINUATION_CHECKPOINT,
                &model,
                &CheckpointMeta {
                    epoch,
                    loss: avg_loss,
                    accuracy,
                    vocab_size,
                    output_size: vocab_size,
                },
            )?;
        }

        if accuracy >= cfg.target_accuracy {
            tracing::info!("Target accuracy reached at epoch {}, stopping", epoch);
            break;
        }
        lr = schedule.step(avg_loss);
        if schedule.at_floor() && schedule.stale_epochs() >= cfg.lr_patience {
            tracing::info!("Learning rate at floor with no improvement, stopping");
            break;
        }
    }

    // Evaluate the best checkpoint the way inference will run it
    let best = ckpt.load_model(
        CONTINUATION_CHECKPOINT,
        model_cfg.init::<EvalBackend>(&device),
        &device,
    )?;
    let samples: Vec<ContinuationSample> = dataset.iter().cloned().collect();
    let auto = autoregressive_accuracy(&best, &samples, &device);
    tracing::info!(
        "Continuation training done after {} epochs: best loss {:.4}, autoregressive accuracy {:.2}%",
        final_epoch,
        best_loss,
        auto * 100.0
    );
    Ok(auto)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{ContinuationDataset, MatcherDataConfig};
    use crate::data::normalizer::normalize;
    use crate::data::vocab::Vocab;
    use crate::domain::verse::Verse;
    use crate::ml::predictor::{ContinuationPredictor, MatcherPredictor};
    use burn::data::dataset::Dataset;
    use std::fs;

    fn toy_verses() -> Vec<Verse> {
        vec![
            Verse::new(1, "بسم الله الرحمن الرحيم"),
            Verse::new(2, "الحمد لله رب العالمين"),
            Verse::new(3, "مالك يوم الدين"),
        ]
    }

    fn temp_ckpt(tag: &str) -> CheckpointManager {
        let dir = std::env::temp_dir().join(format!("ayah-match-train-{tag}-{}", std::process::id()));
        fs::remove_dir_all(&dir).ok();
        CheckpointManager::new(dir)
    }

    #[test]
    fn plateau_schedule_halves_after_patience_and_floors() {
        let mut s = PlateauScheduler::new(1e-3, 0.5, 2, 1e-4);
        assert_eq!(s.step(1.0), 1e-3); // improvement
        assert_eq!(s.step(1.0), 1e-3); // stale 1
        assert_eq!(s.step(1.0), 5e-4); // stale 2 → halve
        assert_eq!(s.step(0.5), 5e-4); // improvement resets
        s.step(0.5);
        s.step(0.5); // → 2.5e-4
        s.step(0.5);
        s.step(0.5); // → 1.25e-4
        s.step(0.5);
        s.step(0.5); // clamps at the floor
        assert_eq!(s.lr(), 1e-4);
        assert!(s.at_floor());
    }

    #[test]
    fn matcher_learns_a_tiny_clean_corpus_and_recalls_prefixes() {
        let verses = toy_verses();
        let vocab = Vocab::chars_from_verses(&verses);

        let data_cfg = MatcherDataConfig {
            input_len: 24,
            copies_per_verse: 2,
            deletion_rate: 0.0,
            augment_prob: 0.0,
            max_offset: 0,
        };
        let mut rng = StdRng::seed_from_u64(7);
        let full = MatcherDataset::generate(&verses, &vocab, &data_cfg, &mut rng);

        // add each verse's opening as its own window, the way a
        // reader recites just the first few letters
        let mut samples: Vec<_> = (0..full.len()).filter_map(|i| full.get(i)).collect();
        for v in &verses {
            let prefix: String = normalize(&v.text).chars().take(10).collect();
            samples.push(crate::data::dataset::MatcherSample {
                input_ids: vocab.encode_padded(&prefix, 24),
                verse_class: v.class_index(),
            });
        }
        let dataset = MatcherDataset::from_samples(samples);

        let cfg = MatcherTrainConfig {
            input_len: 24,
            embed_dim: 16,
            hidden_size: 32,
            dropout: 0.0,
            batch_size: 8,
            epochs: 300,
            lr: 1e-2,
            target_accuracy: 1.0,
            seed: 7,
            ..Default::default()
        };

        let ckpt = temp_ckpt("matcher");
        let device = TrainDevice::default();
        let best =
            train_matcher(&cfg, dataset, vocab.size(), verses.len(), &ckpt, device).unwrap();

        // nine distinct uncorrupted windows must be separable
        assert!(best > 0.99, "best accuracy {best} too low");
        assert!(ckpt.exists(MATCHER_CHECKPOINT));
        let meta = ckpt.load_meta(MATCHER_CHECKPOINT).unwrap();
        assert_eq!(meta.vocab_size, vocab.size());
        assert_eq!(meta.output_size, verses.len());

        // the trained checkpoint identifies each verse from its
        // first ten characters, top-1
        let model = ckpt
            .load_model(
                MATCHER_CHECKPOINT,
                VerseMatcherConfig::new(vocab.size(), 24, verses.len())
                    .with_embed_dim(16)
                    .with_hidden_size(32)
                    .with_dropout(0.0)
                    .init::<EvalBackend>(&device),
                &device,
            )
            .unwrap();
        let predictor =
            MatcherPredictor::new(model, vocab, verses.clone(), 24, device);
        for v in &verses {
            let prefix: String = normalize(&v.text).chars().take(10).collect();
            let top = predictor.find(&prefix, 1);
            assert_eq!(top[0].number, v.number, "wrong verse for prefix of {}", v.number);
        }
        fs::remove_dir_all(ckpt.dir()).ok();
    }

    #[test]
    fn continuation_memorizes_a_single_verse() {
        let verses = vec![Verse::new(1, "بسم الله الرحمن الرحيم")];
        let vocab = Vocab::words_from_verses(&verses);
        let dataset = CompositeDataset::new(vec![ContinuationDataset::from_verses(
            &verses, &vocab, 10, 5,
        )]);

        let cfg = ContinuationTrainConfig {
            d_model: 32,
            num_heads: 2,
            num_layers: 1,
            d_ff: 64,
            dropout: 0.0,
            max_seq_len: 20,
            batch_size: 4,
            epochs: 400,
            lr: 1e-2,
            target_accuracy: 1.0,
            seed: 7,
            ..Default::default()
        };

        let ckpt = temp_ckpt("continuation");
        let device = TrainDevice::default();
        let auto = train_continuation(&cfg, dataset, vocab.size(), &ckpt, device).unwrap();

        assert!(ckpt.exists(CONTINUATION_CHECKPOINT));
        // one memorized sequence decodes greedily on its own
        assert!(auto > 0.99, "autoregressive accuracy {auto} too low");

        // and the predictor reproduces the verse word for word
        let model = ckpt
            .load_model(
                CONTINUATION_CHECKPOINT,
                ContinuationModelConfig::new(vocab.size(), cfg.max_seq_len)
                    .with_d_model(cfg.d_model)
                    .with_num_heads(cfg.num_heads)
                    .with_num_layers(cfg.num_layers)
                    .with_d_ff(cfg.d_ff)
                    .with_dropout(0.0)
                    .init::<EvalBackend>(&device),
                &device,
            )
            .unwrap();
        let predictor = ContinuationPredictor::new(model, vocab, device);
        assert_eq!(
            predictor.continue_verse("بسم الله الرحمن الرحيم", 4),
            "بسم الله الرحمن الرحيم"
        );
        fs::remove_dir_all(ckpt.dir()).ok();
    }

    #[test]
    fn greedy_never_beats_teacher_forcing_on_the_same_model() {
        let verses = toy_verses();
        let vocab = Vocab::words_from_verses(&verses);
        let dataset = CompositeDataset::new(vec![ContinuationDataset::from_verses(
            &verses, &vocab, 10, 5,
        )]);

        let cfg = ContinuationTrainConfig {
            d_model: 32,
            num_heads: 2,
            num_layers: 1,
            d_ff: 64,
            dropout: 0.0,
            max_seq_len: 20,
            batch_size: 4,
            epochs: 30,
            lr: 1e-3,
            target_accuracy: 1.0,
            seed: 11,
            ..Default::default()
        };

        let ckpt = temp_ckpt("bound");
        let device = TrainDevice::default();
        train_continuation(&cfg, dataset, vocab.size(), &ckpt, device).unwrap();

        let model_cfg = ContinuationModelConfig::new(vocab.size(), cfg.max_seq_len)
            .with_d_model(cfg.d_model)
            .with_num_heads(cfg.num_heads)
            .with_num_layers(cfg.num_layers)
            .with_d_ff(cfg.d_ff)
            .with_dropout(0.0);
        let model = ckpt
            .load_model(
                CONTINUATION_CHECKPOINT,
                model_cfg.init::<EvalBackend>(&device),
                &device,
            )
            .unwrap();

        let ds = ContinuationDataset::from_verses(&verses, &vocab, 10, 5);
        let tf = teacher_forced_accuracy(&model, ds.samples(), 8, &device);
        let auto = autoregressive_accuracy(&model, ds.samples(), &device);
        assert!(
            auto <= tf + 1e-9,
            "greedy decoding ({auto}) beat teacher forcing ({tf})"
        );
        fs::remove_dir_all(ckpt.dir()).ok();
    }
}
