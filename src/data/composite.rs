// ============================================================
// Layer 4 — Composite Dataset
// ============================================================
// The continuation model trains on several homogeneous
// sub-datasets at once — one per input-word budget (10 words
// down to 3), so the model sees both long and short prompts
// for every verse. Instead of juggling many files and ad-hoc
// interleaving, a CompositeDataset owns the sub-datasets plus
// a single shuffled index permutation, recomputed at the start
// of each epoch. A global index resolves arena-style to
// (sub-dataset, local index).

use burn::data::dataset::Dataset;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::data::dataset::{ContinuationDataset, ContinuationSample};
use crate::data::vocab::Vocab;
use crate::domain::verse::Verse;

pub struct CompositeDataset {
    subsets: Vec<ContinuationDataset>,
    /// Shuffled global ordering: position → (subset, local index)
    permutation: Vec<(usize, usize)>,
}

impl CompositeDataset {
    pub fn new(subsets: Vec<ContinuationDataset>) -> Self {
        let permutation = subsets
            .iter()
            .enumerate()
            .flat_map(|(si, ds)| (0..ds.len()).map(move |li| (si, li)))
            .collect();
        Self {
            subsets,
            permutation,
        }
    }

    /// The standard training mix: input budgets 10 down to 3
    /// words, continuation fixed at the first 5 words.
    pub fn standard(verses: &[Verse], vocab: &Vocab, max_output_words: usize) -> Self {
        let subsets = (3..=10)
            .rev()
            .map(|input_words| {
                ContinuationDataset::from_verses(verses, vocab, input_words, max_output_words)
            })
            .collect();
        Self::new(subsets)
    }

    /// Recompute the epoch ordering. Call once per epoch.
    pub fn reshuffle(&mut self, rng: &mut impl Rng) {
        self.permutation.shuffle(rng);
    }

    pub fn subsets(&self) -> &[ContinuationDataset] {
        &self.subsets
    }

    /// All samples in the current permutation order.
    pub fn iter(&self) -> impl Iterator<Item = &ContinuationSample> {
        self.permutation
            .iter()
            .map(|&(si, li)| &self.subsets[si].samples()[li])
    }
}

impl Dataset<ContinuationSample> for CompositeDataset {
    fn get(&self, index: usize) -> Option<ContinuationSample> {
        let &(si, li) = self.permutation.get(index)?;
        self.subsets[si].get(li)
    }

    fn len(&self) -> usize {
        self.permutation.len()
    }
}
