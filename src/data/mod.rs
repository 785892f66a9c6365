// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the raw corpus file to tensor batches:
//
//   corpus file (one verse per line)
//       │
//       ▼
//   CorpusLoader      → Vec<Verse>, markers filtered out
//       │
//       ▼
//   normalizer        → diacritics stripped, hamza folded
//       │
//       ▼
//   Vocab             → atomic unit ↔ dense id mapping
//       │
//       ▼
//   augment           → corrupted training inputs (training only)
//       │
//       ▼
//   MatcherDataset / ContinuationDataset / CompositeDataset
//       │
//       ▼
//   MatcherBatcher / ContinuationBatcher → tensor batches
//
// Each module is one step, independently testable.

/// Reads the one-verse-per-line corpus file
pub mod loader;

/// Diacritic stripping and letter-variant folding
pub mod normalizer;

/// Character- and word-level vocabularies with reserved sentinels
pub mod vocab;

/// Stochastic corruption functions for training inputs
pub mod augment;

/// Training samples and burn Dataset implementations
pub mod dataset;

/// Arena-indexed composition of homogeneous sub-datasets
pub mod composite;

/// Burn Batcher implementations producing tensor batches
pub mod batcher;
