// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per training epoch, one file per model,
// e.g. checkpoints/matcher_metrics.csv:
//
//   epoch,loss,accuracy,lr
//   1,3.124500,0.123000,0.00050000
//   2,2.890100,0.184000,0.00050000
//
// Appending (rather than rewriting) keeps the history across
// resumed runs.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

/// One row of the training log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    /// Average loss over the epoch's batches
    pub loss: f64,
    /// Sequence accuracy — exact-match for the continuation
    /// model, top-1 for the matcher
    pub accuracy: f64,
    /// Learning rate in effect this epoch
    pub lr: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, loss: f64, accuracy: f64, lr: f64) -> Self {
        Self {
            epoch,
            loss,
            accuracy,
            lr,
        }
    }

    /// True if this epoch beat the best loss seen so far.
    pub fn is_improvement(&self, best_loss: f64) -> bool {
        self.loss < best_loss
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Open (or create) the log for one named training run.
    /// Writes the header only when the file is new.
    pub fn new(dir: impl Into<PathBuf>, name: &str) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let csv_path = dir.join(format!("{name}_metrics.csv"));

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,loss,accuracy,lr")?;
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{:.6},{:.6},{:.8}",
            m.epoch, m.loss, m.accuracy, m.lr
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
