// ============================================================
// Layer 5 — Continuation Accuracy
// ============================================================
// Two estimators of the same quantity — the fraction of
// sequences whose continuation span is reproduced exactly:
//
//   teacher-forced  — one batched forward pass per chunk; each
//                     supervised position is predicted from the
//                     TRUE prefix. Fast, optimistic: an early
//                     mistake cannot derail later positions.
//   autoregressive  — per-sample greedy decode from the prompt;
//                     each step consumes the model's own output.
//                     Slow, honest: this is how inference runs.
//
// Teacher-forced accuracy is an upper bound in expectation, so
// the training loop uses it per epoch and reports the
// autoregressive figure once at the end.

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;

use crate::data::batcher::ContinuationBatcher;
use crate::data::dataset::ContinuationSample;
use crate::data::vocab::EOS_ID;
use crate::ml::continuation::{no_padding_mask, ContinuationModel};

/// Exact-match rate with every position conditioned on the true
/// prefix. A sample counts as correct only if all supervised
/// positions take the argmax.
pub fn teacher_forced_accuracy<B: Backend>(
    model: &ContinuationModel<B>,
    samples: &[ContinuationSample],
    batch_size: usize,
    device: &B::Device,
) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let batcher = ContinuationBatcher::<B>::new(device.clone());
    let mut correct = 0usize;

    for chunk in samples.chunks(batch_size.max(1)) {
        let batch = batcher.batch(chunk.to_vec());
        let [rows, seq_len] = batch.tokens.dims();

        let logits = model.forward(batch.tokens, batch.pad_mask);
        let predicted: Vec<i64> = logits
            .argmax(2)
            .squeeze::<2>(2)
            .into_data()
            .iter::<i64>()
            .collect();

        for (row, sample) in chunk.iter().enumerate().take(rows) {
            let Some(marker) = sample.marker_position() else {
                continue;
            };
            let span = marker..marker + sample.expected_ids.len();
            let hit = span.clone().zip(&sample.expected_ids).all(|(pos, &want)| {
                predicted[row * seq_len + pos] == want as i64
            });
            if hit {
                correct += 1;
            }
        }
    }

    correct as f64 / samples.len() as f64
}

/// Exact-match rate under greedy decoding from the prompt alone.
/// Generation stops at end-of-sequence, at the expected length,
/// or at the model's positional capacity, whichever comes first.
pub fn autoregressive_accuracy<B: Backend>(
    model: &ContinuationModel<B>,
    samples: &[ContinuationSample],
    device: &B::Device,
) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut correct = 0usize;

    for sample in samples {
        let Some(marker) = sample.marker_position() else {
            continue;
        };
        let prompt = &sample.input_ids[..=marker];
        let generated = greedy_decode(model, prompt, sample.expected_ids.len(), device);
        if generated == sample.expected_ids {
            correct += 1;
        }
    }

    correct as f64 / samples.len() as f64
}

/// Greedy next-token decoding. The returned ids exclude the
/// prompt and any end-of-sequence token.
pub fn greedy_decode<B: Backend>(
    model: &ContinuationModel<B>,
    prompt: &[u32],
    max_new_tokens: usize,
    device: &B::Device,
) -> Vec<u32> {
    let mut sequence: Vec<u32> = prompt.to_vec();
    let mut generated = Vec::with_capacity(max_new_tokens);

    for _ in 0..max_new_tokens {
        // The position table caps how far we can decode
        if sequence.len() >= model.max_seq_len() {
            break;
        }
        let len = sequence.len();
        let ids: Vec<i32> = sequence.iter().map(|&id| id as i32).collect();
        let tokens =
            Tensor::<B, 1, Int>::from_ints(ids.as_slice(), device).reshape([1, len]);
        let pad_mask = no_padding_mask::<B>(1, len, device);

        let logits = model.forward(tokens, pad_mask);
        let next: i64 = logits
            .slice([0..1, len - 1..len])
            .argmax(2)
            .into_data()
            .iter::<i64>()
            .next()
            .unwrap_or(EOS_ID as i64);

        if next == EOS_ID as i64 {
            break;
        }
        sequence.push(next as u32);
        generated.push(next as u32);
    }

    generated
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::ContinuationDataset;
    use crate::data::vocab::Vocab;
    use crate::domain::verse::Verse;
    use crate::ml::continuation::ContinuationModelConfig;
    use burn::backend::NdArray;

    type B = NdArray;

    fn toy() -> (ContinuationDataset, Vocab) {
        let verses = vec![
            Verse::new(1, "بسم الله الرحمن الرحيم"),
            Verse::new(2, "الحمد لله رب العالمين"),
        ];
        let vocab = Vocab::words_from_verses(&verses);
        let ds = ContinuationDataset::from_verses(&verses, &vocab, 10, 5);
        (ds, vocab)
    }

    #[test]
    fn accuracies_stay_within_unit_interval() {
        let (ds, vocab) = toy();
        let device = Default::default();
        let model = ContinuationModelConfig::new(vocab.size(), 30)
            .with_d_model(16)
            .with_num_heads(2)
            .with_num_layers(1)
            .with_d_ff(32)
            .with_dropout(0.0)
            .init::<B>(&device);

        let tf = teacher_forced_accuracy(&model, ds.samples(), 8, &device);
        let auto = autoregressive_accuracy(&model, ds.samples(), &device);
        assert!((0.0..=1.0).contains(&tf));
        assert!((0.0..=1.0).contains(&auto));
    }

    #[test]
    fn greedy_decode_respects_length_and_capacity_caps() {
        let (ds, vocab) = toy();
        let device = Default::default();
        let model = ContinuationModelConfig::new(vocab.size(), 12)
            .with_d_model(16)
            .with_num_heads(2)
            .with_num_layers(1)
            .with_d_ff(32)
            .with_dropout(0.0)
            .init::<B>(&device);

        let sample = &ds.samples()[0];
        let marker = sample.marker_position().unwrap();
        let prompt = &sample.input_ids[..=marker];

        let out = greedy_decode(&model, prompt, 3, &device);
        assert!(out.len() <= 3);

        // a generous request still stops at the position table
        let out = greedy_decode(&model, prompt, 100, &device);
        assert!(prompt.len() + out.len() <= 12);
    }

    #[test]
    fn empty_sample_set_reports_zero() {
        let (_, vocab) = toy();
        let device = Default::default();
        let model = ContinuationModelConfig::new(vocab.size(), 30)
            .with_d_model(16)
            .with_num_heads(2)
            .with_num_layers(1)
            .with_d_ff(32)
            .with_dropout(0.0)
            .init::<B>(&device);
        assert_eq!(teacher_forced_accuracy(&model, &[], 8, &device), 0.0);
        assert_eq!(autoregressive_accuracy(&model, &[], &device), 0.0);
    }
}
