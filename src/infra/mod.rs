// ============================================================
// Layer 6 — Infrastructure
// ============================================================
// Persistence and run bookkeeping. Nothing here knows about
// verses or tensor math beyond what it stores.
//
//   checkpoint.rs  — model weights + sidecar metadata, with
//                    integrity checks against the live corpus
//   vocab_store.rs — vocabulary files, both current and legacy
//                    on-disk layouts
//   metrics.rs     — per-epoch CSV log of the training run

/// Weights, configs and checkpoint metadata
pub mod checkpoint;

/// Epoch metrics CSV
pub mod metrics;

/// Vocabulary persistence
pub mod vocab_store;
