// ============================================================
// Layer 5 — Predictors
// ============================================================
// Inference wrappers over the two trained models. Both take
// raw user text, push it through the same normalization and
// encoding as training, and return plain domain values — no
// tensors escape this module.
//
// Both are forgiving at the edges: empty or unusable input
// yields an empty result, never an error, because a recitation
// aid should degrade quietly mid-session.

use burn::prelude::*;
use burn::tensor::activation::softmax;

use crate::data::normalizer::normalize;
use crate::data::vocab::{Vocab, AYAH_ID, BOS_ID, READER_ID};
use crate::domain::verse::Verse;
use crate::ml::continuation::ContinuationModel;
use crate::ml::evaluator::greedy_decode;
use crate::ml::matcher::VerseMatcherModel;

/// One ranked verse candidate.
#[derive(Debug, Clone)]
pub struct VerseMatch {
    /// 1-based verse number
    pub number: usize,
    /// Softmax confidence in [0, 1]
    pub probability: f64,
    /// The verse's original (unnormalized) text
    pub text: String,
}

/// Ranked verse lookup from a corrupted spoken fragment.
pub struct MatcherPredictor<B: Backend> {
    model: VerseMatcherModel<B>,
    vocab: Vocab,
    verses: Vec<Verse>,
    input_len: usize,
    device: B::Device,
}

impl<B: Backend> MatcherPredictor<B> {
    pub fn new(
        model: VerseMatcherModel<B>,
        vocab: Vocab,
        verses: Vec<Verse>,
        input_len: usize,
        device: B::Device,
    ) -> Self {
        Self {
            model,
            vocab,
            verses,
            input_len,
            device,
        }
    }

    /// The `k` most probable verses for `text`, best first.
    pub fn find(&self, text: &str, k: usize) -> Vec<VerseMatch> {
        let clean = normalize(text);
        if clean.is_empty() || k == 0 {
            return Vec::new();
        }

        let ids: Vec<i32> = self
            .vocab
            .encode_padded(&clean, self.input_len)
            .into_iter()
            .map(|id| id as i32)
            .collect();
        let tokens = Tensor::<B, 1, Int>::from_ints(ids.as_slice(), &self.device)
            .reshape([1, self.input_len]);

        let probs: Vec<f32> = softmax(self.model.forward(tokens), 1)
            .into_data()
            .iter::<f32>()
            .collect();

        let mut ranked: Vec<(usize, f32)> = probs.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        ranked
            .into_iter()
            .take(k)
            .filter_map(|(class, p)| {
                self.verses.get(class).map(|v| VerseMatch {
                    number: v.number,
                    probability: p as f64,
                    text: v.text.clone(),
                })
            })
            .collect()
    }
}

/// Greedy verse continuation from an opening fragment.
pub struct ContinuationPredictor<B: Backend> {
    model: ContinuationModel<B>,
    vocab: Vocab,
    device: B::Device,
}

impl<B: Backend> ContinuationPredictor<B> {
    pub fn new(model: ContinuationModel<B>, vocab: Vocab, device: B::Device) -> Self {
        Self {
            model,
            vocab,
            device,
        }
    }

    /// Continue `text` by up to `max_new_words` words. Empty
    /// input, or a prompt already at the positional capacity,
    /// yields an empty string.
    pub fn continue_verse(&self, text: &str, max_new_words: usize) -> String {
        let clean = normalize(text);
        let words: Vec<&str> = clean.split_whitespace().collect();
        if words.is_empty() || max_new_words == 0 {
            return String::new();
        }

        let mut prompt = vec![BOS_ID, READER_ID];
        prompt.extend(words.iter().map(|w| self.vocab.id_or_unk(w)));
        prompt.push(AYAH_ID);
        if prompt.len() >= self.model.max_seq_len() {
            return String::new();
        }

        let generated = greedy_decode(&self.model, &prompt, max_new_words, &self.device);
        let kept: Vec<u32> = generated
            .into_iter()
            .filter(|&id| !Vocab::is_sentinel(id))
            .collect();
        self.vocab.decode(&kept)
    }
}
