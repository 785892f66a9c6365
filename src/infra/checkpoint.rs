// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights with Burn's CompactRecorder
// (MessagePack + gzip). Each named checkpoint is a weights file
// plus a JSON metadata sidecar:
//
//   checkpoints/
//     matcher.mpk.gz           ← best weights so far
//     matcher.prev.mpk.gz      ← previous best, kept as backup
//     matcher_meta.json        ← epoch / loss / accuracy / sizes
//     matcher_config.json      ← architecture + run config
//
// The sidecar records the vocabulary size and class count the
// weights were trained with. Loading verifies both against the
// live corpus BEFORE any weights are touched — a checkpoint
// trained on a different corpus fails fast with a typed error
// instead of producing garbage predictions.
//
// Two sidecar layouts exist in the wild; both deserialize into
// the same CheckpointMeta through one untagged enum, resolved
// once at read time. Everything downstream sees only the
// current shape.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fmt, fs, path::PathBuf};

/// Metadata stored alongside each weights file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub epoch: usize,
    pub loss: f64,
    pub accuracy: f64,
    /// Vocabulary size the embedding was built with
    pub vocab_size: usize,
    /// Classifier class count; equals vocab_size for the
    /// continuation model
    pub output_size: usize,
}

/// The older sidecar layout used shortened field names. Both
/// shapes parse through this enum and normalize immediately.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawMeta {
    Current(CheckpointMeta),
    Legacy {
        epoch: usize,
        loss: f64,
        acc: f64,
        vocab: usize,
        output: usize,
    },
}

impl From<RawMeta> for CheckpointMeta {
    fn from(raw: RawMeta) -> Self {
        match raw {
            RawMeta::Current(meta) => meta,
            RawMeta::Legacy {
                epoch,
                loss,
                acc,
                vocab,
                output,
            } => CheckpointMeta {
                epoch,
                loss,
                accuracy: acc,
                vocab_size: vocab,
                output_size: output,
            },
        }
    }
}

/// A persisted checkpoint disagrees with the live corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    VocabularyMismatch { expected: usize, found: usize },
    OutputMismatch { expected: usize, found: usize },
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VocabularyMismatch { expected, found } => write!(
                f,
                "checkpoint was trained with vocabulary size {found}, live corpus has {expected}"
            ),
            Self::OutputMismatch { expected, found } => write!(
                f,
                "checkpoint was trained with {found} output classes, live corpus has {expected}"
            ),
        }
    }
}

impl std::error::Error for IntegrityError {}

impl CheckpointMeta {
    /// Check this checkpoint against the live vocabulary size
    /// and class count. Call before rebuilding the model.
    pub fn verify(&self, live_vocab: usize, live_output: usize) -> Result<(), IntegrityError> {
        if self.vocab_size != live_vocab {
            return Err(IntegrityError::VocabularyMismatch {
                expected: live_vocab,
                found: self.vocab_size,
            });
        }
        if self.output_size != live_output {
            return Err(IntegrityError::OutputMismatch {
                expected: live_output,
                found: self.output_size,
            });
        }
        Ok(())
    }
}

/// Manages named checkpoints inside one directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn weights_file(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.mpk.gz"))
    }

    fn meta_file(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}_meta.json"))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.weights_file(name).exists() && self.meta_file(name).exists()
    }

    /// Save weights and metadata under `name`, keeping the
    /// previous best weights as `{name}.prev.mpk.gz`.
    pub fn save_model<B: Backend, M: Module<B>>(
        &self,
        name: &str,
        model: &M,
        meta: &CheckpointMeta,
    ) -> Result<()> {
        let weights = self.weights_file(name);
        if weights.exists() {
            let backup = self.dir.join(format!("{name}.prev.mpk.gz"));
            fs::rename(&weights, &backup).with_context(|| {
                format!("Failed to back up previous checkpoint '{}'", weights.display())
            })?;
        }

        // The recorder appends the .mpk.gz extension itself
        let stem = self.dir.join(name);
        NamedMpkGzFileRecorder::<FullPrecisionSettings>::new()
            .record(model.clone().into_record(), stem.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", stem.display()))?;

        fs::write(self.meta_file(name), serde_json::to_string_pretty(meta)?)
            .with_context(|| "Failed to write checkpoint metadata")?;

        tracing::debug!(
            "Saved checkpoint '{}': epoch {}, loss {:.4}, accuracy {:.4}",
            name,
            meta.epoch,
            meta.loss,
            meta.accuracy
        );
        Ok(())
    }

    /// Restore weights into a freshly built model of the same
    /// architecture.
    pub fn load_model<B: Backend, M: Module<B>>(
        &self,
        name: &str,
        model: M,
        device: &B::Device,
    ) -> Result<M> {
        let stem = self.dir.join(name);
        let record = NamedMpkGzFileRecorder::<FullPrecisionSettings>::new()
            .load(stem.clone(), device)
            .with_context(|| {
                format!(
                    "Cannot load checkpoint '{}'. Have you trained the model first?",
                    stem.display()
                )
            })?;
        Ok(model.load_record(record))
    }

    /// Read and normalize the metadata sidecar, whichever of the
    /// two on-disk layouts it uses.
    pub fn load_meta(&self, name: &str) -> Result<CheckpointMeta> {
        let path = self.meta_file(name);
        let json = fs::read_to_string(&path).with_context(|| {
            format!("Cannot read checkpoint metadata '{}'", path.display())
        })?;
        let raw: RawMeta = serde_json::from_str(&json)
            .with_context(|| format!("Unrecognized checkpoint metadata in '{}'", path.display()))?;
        Ok(raw.into())
    }

    /// Persist a run configuration next to the weights so
    /// inference can rebuild the exact architecture.
    pub fn save_config<T: Serialize>(&self, name: &str, cfg: &T) -> Result<()> {
        let path = self.dir.join(format!("{name}_config.json"));
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        Ok(())
    }

    pub fn load_config<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(format!("{name}_config.json"));
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure training has been run first.",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::matcher::VerseMatcherConfig;
    use burn::backend::NdArray;

    type B = NdArray;

    fn temp_manager(tag: &str) -> CheckpointManager {
        let dir = std::env::temp_dir().join(format!("ayah-match-ckpt-{tag}-{}", std::process::id()));
        fs::remove_dir_all(&dir).ok();
        CheckpointManager::new(dir)
    }

    fn meta(epoch: usize) -> CheckpointMeta {
        CheckpointMeta {
            epoch,
            loss: 1.5,
            accuracy: 0.5,
            vocab_size: 20,
            output_size: 7,
        }
    }

    #[test]
    fn weights_round_trip_with_metadata() {
        let mgr = temp_manager("roundtrip");
        let device = Default::default();
        let model = VerseMatcherConfig::new(20, 12, 7)
            .with_embed_dim(8)
            .with_hidden_size(16)
            .init::<B>(&device);

        mgr.save_model("matcher", &model, &meta(3)).unwrap();
        assert!(mgr.exists("matcher"));

        let fresh = VerseMatcherConfig::new(20, 12, 7)
            .with_embed_dim(8)
            .with_hidden_size(16)
            .init::<B>(&device);
        let restored = mgr.load_model("matcher", fresh, &device).unwrap();

        let tokens = Tensor::<B, 1, Int>::from_ints([1i32; 12].as_slice(), &device)
            .reshape([1, 12]);
        let a: Vec<f32> = model.forward(tokens.clone()).into_data().to_vec().unwrap();
        let b: Vec<f32> = restored.forward(tokens).into_data().to_vec().unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-6);
        }

        let loaded = mgr.load_meta("matcher").unwrap();
        assert_eq!(loaded.epoch, 3);
        assert_eq!(loaded.vocab_size, 20);
    }

    #[test]
    fn saving_again_keeps_previous_best_as_backup() {
        let mgr = temp_manager("backup");
        let device = Default::default();
        let model = VerseMatcherConfig::new(20, 12, 7)
            .with_embed_dim(8)
            .with_hidden_size(16)
            .init::<B>(&device);

        mgr.save_model("matcher", &model, &meta(1)).unwrap();
        mgr.save_model("matcher", &model, &meta(2)).unwrap();
        assert!(mgr.dir().join("matcher.prev.mpk.gz").exists());
        assert_eq!(mgr.load_meta("matcher").unwrap().epoch, 2);
    }

    #[test]
    fn legacy_metadata_layout_still_reads() {
        let mgr = temp_manager("legacy");
        fs::write(
            mgr.dir().join("matcher_meta.json"),
            r#"{"epoch": 9, "loss": 0.8, "acc": 0.72, "vocab": 41, "output": 6236}"#,
        )
        .unwrap();
        let meta = mgr.load_meta("matcher").unwrap();
        assert_eq!(meta.epoch, 9);
        assert_eq!(meta.accuracy, 0.72);
        assert_eq!(meta.vocab_size, 41);
        assert_eq!(meta.output_size, 6236);
    }

    #[test]
    fn verify_rejects_corpus_drift_before_weights_load() {
        let m = meta(1);
        assert!(m.verify(20, 7).is_ok());
        assert_eq!(
            m.verify(21, 7),
            Err(IntegrityError::VocabularyMismatch {
                expected: 21,
                found: 20
            })
        );
        assert_eq!(
            m.verify(20, 8),
            Err(IntegrityError::OutputMismatch {
                expected: 8,
                found: 7
            })
        );
    }
}
