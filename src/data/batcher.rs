// ============================================================
// Layer 4 — Batchers
// ============================================================
// Convert Vecs of samples into tensor batches.
//
// Matcher samples are pre-padded to a fixed window, so the
// batcher only stacks. Continuation samples vary in length and
// are padded here to the longest sequence in the batch; the
// pad positions are excluded from attention via a boolean pad
// mask and carry a zero loss mask, so they never contribute to
// either attention or the loss.

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;

use crate::data::dataset::{ContinuationSample, MatcherSample};
use crate::data::vocab::PAD_ID;

// ─── Matcher ──────────────────────────────────────────────────────────────────

/// A batch of fixed-length classifier windows.
#[derive(Debug, Clone)]
pub struct MatcherBatch<B: Backend> {
    /// Token ids — [batch, input_len]
    pub tokens: Tensor<B, 2, Int>,
    /// Verse class per sample — [batch]
    pub classes: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct MatcherBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> MatcherBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<MatcherSample, MatcherBatch<B>> for MatcherBatcher<B> {
    fn batch(&self, items: Vec<MatcherSample>) -> MatcherBatch<B> {
        let batch_size = items.len();
        let input_len = items[0].input_ids.len();

        let tokens_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.input_ids.iter().map(|&id| id as i32))
            .collect();
        let classes: Vec<i32> = items.iter().map(|s| s.verse_class as i32).collect();

        let tokens = Tensor::<B, 1, Int>::from_ints(tokens_flat.as_slice(), &self.device)
            .reshape([batch_size, input_len]);
        let classes = Tensor::<B, 1, Int>::from_ints(classes.as_slice(), &self.device);

        MatcherBatch { tokens, classes }
    }
}

// ─── Continuation ─────────────────────────────────────────────────────────────

/// A batch of variable-length sequences padded to one length.
#[derive(Debug, Clone)]
pub struct ContinuationBatch<B: Backend> {
    /// Token ids — [batch, seq_len]
    pub tokens: Tensor<B, 2, Int>,
    /// Next-token targets — [batch, seq_len]
    pub targets: Tensor<B, 2, Int>,
    /// Supervision mask — [batch, seq_len], 1.0 at supervised positions
    pub loss_mask: Tensor<B, 2>,
    /// True at padding positions — [batch, seq_len]
    pub pad_mask: Tensor<B, 2, Bool>,
}

#[derive(Clone, Debug)]
pub struct ContinuationBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ContinuationBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<ContinuationSample, ContinuationBatch<B>> for ContinuationBatcher<B> {
    fn batch(&self, items: Vec<ContinuationSample>) -> ContinuationBatch<B> {
        let batch_size = items.len();
        let seq_len = items.iter().map(|s| s.input_ids.len()).max().unwrap_or(0);

        let mut tokens_flat = Vec::with_capacity(batch_size * seq_len);
        let mut targets_flat = Vec::with_capacity(batch_size * seq_len);
        let mut mask_flat = Vec::with_capacity(batch_size * seq_len);
        let mut pad_flat = Vec::with_capacity(batch_size * seq_len);

        for s in &items {
            let len = s.input_ids.len();
            tokens_flat.extend(s.input_ids.iter().map(|&id| id as i32));
            tokens_flat.extend(std::iter::repeat(PAD_ID as i32).take(seq_len - len));

            // Padded target positions carry the pad id; their loss
            // mask is zero so the value is never read by the loss.
            targets_flat.extend(s.target_ids.iter().map(|&id| id as i32));
            targets_flat.extend(std::iter::repeat(PAD_ID as i32).take(seq_len - len));

            mask_flat.extend(s.loss_mask.iter().copied());
            mask_flat.extend(std::iter::repeat(0.0f32).take(seq_len - len));

            pad_flat.extend(std::iter::repeat(0i32).take(len));
            pad_flat.extend(std::iter::repeat(1i32).take(seq_len - len));
        }

        let tokens = Tensor::<B, 1, Int>::from_ints(tokens_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let targets = Tensor::<B, 1, Int>::from_ints(targets_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let loss_mask = Tensor::<B, 1>::from_floats(mask_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let pad_mask = Tensor::<B, 1, Int>::from_ints(pad_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len])
            .equal_elem(1);

        ContinuationBatch {
            tokens,
            targets,
            loss_mask,
            pad_mask,
        }
    }
}
