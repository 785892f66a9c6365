// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All burn model code lives here; other layers never touch
// tensors except through the data batchers.
//
//   matcher.rs      — feed-forward verse classifier: a fixed
//                     character window in, one logit per verse
//                     identity out
//   continuation.rs — decoder-only causal transformer that
//                     continues a verse word by word
//   trainer.rs      — both training loops: masked loss,
//                     gradient clipping, plateau LR decay,
//                     best-checkpoint selection, early stop
//   evaluator.rs    — the two sequence-accuracy estimators
//                     (teacher-forced fast, autoregressive slow)
//   predictor.rs    — inference: ranked verse lookup and greedy
//                     continuation decoding

/// Feed-forward verse identity classifier
pub mod matcher;

/// Causal transformer continuation model
pub mod continuation;

/// Training loops for both model families
pub mod trainer;

/// Teacher-forced and autoregressive accuracy
pub mod evaluator;

/// Inference-time prediction for both model families
pub mod predictor;
