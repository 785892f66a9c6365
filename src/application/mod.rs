// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// One use case per user-facing operation. Each orchestrates the
// lower layers in order and owns its configuration struct; the
// CLI never sees datasets, vocabularies or tensors.
//
//   train_matcher_use_case.rs      — corpus → char vocab →
//                                    augmented windows → classifier
//   train_continuation_use_case.rs — corpus → word vocab →
//                                    composite prompt mix → decoder
//   recall_use_case.rs             — load checkpoints, find or
//                                    continue a verse
//   evaluate_use_case.rs           — both accuracy figures for a
//                                    saved continuation checkpoint

/// Train the verse classifier
pub mod train_matcher_use_case;

/// Train the continuation model
pub mod train_continuation_use_case;

/// Inference: verse lookup and continuation
pub mod recall_use_case;

/// Accuracy evaluation of a saved checkpoint
pub mod evaluate_use_case;
