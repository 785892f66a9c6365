// ============================================================
// Layer 4 — Training Samples and Datasets
// ============================================================
// Two sample families:
//
//   MatcherSample       — a fixed-length corrupted character
//                         window labelled with the verse class
//   ContinuationSample  — a full next-token-prediction sequence
//                         with a supervision mask over the
//                         continuation span
//
// Continuation sequence layout (word ids):
//
//   [<s>] [القاريء:] input words… [الاية:] output words… [</s>]
//
// `target_ids[i]` is the id to predict from positions 0..=i,
// i.e. the sequence shifted left by one. The loss mask is
// contiguous: it starts at the الاية: marker position (which
// predicts the first output word) and covers exactly
// `expected_ids.len()` positions. The end-of-sequence token is
// deliberately NOT part of the supervised span — the mask ends
// on the position predicting the last output word.

use burn::data::dataset::Dataset;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::augment::{
    clip_word_endings, delete_random_chars, offset_window, omit_word, substitute_word,
    truncate_tail,
};
use crate::data::normalizer::normalize;
use crate::data::vocab::{Vocab, AYAH_ID, BOS_ID, EOS_ID, READER_ID};
use crate::domain::verse::Verse;

// ─── Matcher samples ──────────────────────────────────────────────────────────

/// One tokenized, padded classifier input with its verse class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherSample {
    pub input_ids: Vec<u32>,
    pub verse_class: usize,
}

/// Knobs for matcher sample construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherDataConfig {
    /// Fixed token-window length fed to the classifier
    pub input_len: usize,
    /// Augmented copies generated per verse (first copy is clean)
    pub copies_per_verse: usize,
    /// Character-deletion rate for corrupted copies
    pub deletion_rate: f64,
    /// Probability that a non-first copy is corrupted at all
    pub augment_prob: f64,
    /// Maximum window offset for verses longer than the window
    pub max_offset: usize,
}

impl Default for MatcherDataConfig {
    fn default() -> Self {
        Self {
            input_len: 60,
            copies_per_verse: 4,
            deletion_rate: 0.1,
            augment_prob: 0.7,
            max_offset: 10,
        }
    }
}

pub struct MatcherDataset {
    samples: Vec<MatcherSample>,
}

impl MatcherDataset {
    /// Build augmented windows for every verse. Verses whose
    /// normalized form is empty are excluded entirely rather
    /// than tokenized into all-padding inputs.
    pub fn generate(
        verses: &[Verse],
        vocab: &Vocab,
        cfg: &MatcherDataConfig,
        rng: &mut impl Rng,
    ) -> Self {
        let mut samples = Vec::with_capacity(verses.len() * cfg.copies_per_verse);

        // Substitution candidates for the misheard-word corruption
        let word_pool: Vec<String> = verses
            .iter()
            .flat_map(|v| {
                normalize(&v.text)
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        for verse in verses {
            let clean = normalize(&verse.text);
            if clean.is_empty() {
                tracing::warn!("Verse {} normalizes to empty text, skipped", verse.number);
                continue;
            }

            for copy in 0..cfg.copies_per_verse {
                // Long verses start at a small random offset half the time
                let windowed = if clean.chars().count() > cfg.input_len && rng.gen::<f64>() < 0.5
                {
                    offset_window(&clean, cfg.input_len, cfg.max_offset, rng)
                } else {
                    clean.clone()
                };

                // First copy stays clean; the rest corrupt with augment_prob
                let text = if copy > 0 && rng.gen::<f64>() < cfg.augment_prob {
                    corrupt(&windowed, cfg.deletion_rate, &word_pool, rng)
                } else {
                    windowed
                };

                samples.push(MatcherSample {
                    input_ids: vocab.encode_padded(&text, cfg.input_len),
                    verse_class: verse.class_index(),
                });
            }
        }

        tracing::info!("Built {} matcher samples", samples.len());
        Self { samples }
    }

    /// Wrap pre-built samples, e.g. to mix in extra windows.
    pub fn from_samples(samples: Vec<MatcherSample>) -> Self {
        Self { samples }
    }
}

/// Apply one randomly chosen corruption — the kinds of damage a
/// spoken transcription shows: dropped letters, a cut-off
/// recitation, clipped word endings, a skipped or misheard word.
fn corrupt(text: &str, deletion_rate: f64, word_pool: &[String], rng: &mut impl Rng) -> String {
    let words = text.split_whitespace().count().max(1);
    match rng.gen_range(0..5) {
        0 => delete_random_chars(text, deletion_rate, rng),
        1 => truncate_tail(text, rng.gen_range(0.1..0.3)),
        2 => clip_word_endings(text, 0.3, rng),
        3 => omit_word(text, rng.gen_range(0..words)),
        _ => substitute_word(text, rng.gen_range(0..words), word_pool, rng),
    }
}

impl Dataset<MatcherSample> for MatcherDataset {
    fn get(&self, index: usize) -> Option<MatcherSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

// ─── Continuation samples ─────────────────────────────────────────────────────

/// One causal-LM training sequence with its supervision mask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuationSample {
    /// Full sequence: bos, reader marker, input, verse marker,
    /// output, eos
    pub input_ids: Vec<u32>,
    /// `input_ids` shifted left by one, closed with eos
    pub target_ids: Vec<u32>,
    /// 1.0 at supervised positions, 0.0 elsewhere
    pub loss_mask: Vec<f32>,
    /// The clean continuation the model must produce
    pub expected_ids: Vec<u32>,
}

impl ContinuationSample {
    /// Build a sample from already-normalized verse words.
    /// Returns `None` for an empty word list.
    pub fn build(
        words: &[&str],
        max_input_words: usize,
        max_output_words: usize,
        vocab: &Vocab,
    ) -> Option<Self> {
        if words.is_empty() {
            return None;
        }
        let input_words = &words[..words.len().min(max_input_words)];
        let output_words = &words[..words.len().min(max_output_words)];

        let mut input_ids = vec![BOS_ID, READER_ID];
        input_ids.extend(input_words.iter().map(|w| vocab.id_or_unk(w)));
        let marker_pos = input_ids.len();
        input_ids.push(AYAH_ID);
        let expected_ids: Vec<u32> = output_words.iter().map(|w| vocab.id_or_unk(w)).collect();
        input_ids.extend(&expected_ids);
        input_ids.push(EOS_ID);

        let mut target_ids: Vec<u32> = input_ids[1..].to_vec();
        target_ids.push(EOS_ID);

        let mut loss_mask = vec![0.0; input_ids.len()];
        for m in &mut loss_mask[marker_pos..marker_pos + expected_ids.len()] {
            *m = 1.0;
        }

        Some(Self {
            input_ids,
            target_ids,
            loss_mask,
            expected_ids,
        })
    }

    /// Position of the الاية: marker within the sequence.
    pub fn marker_position(&self) -> Option<usize> {
        self.input_ids.iter().position(|&id| id == AYAH_ID)
    }
}

pub struct ContinuationDataset {
    samples: Vec<ContinuationSample>,
}

impl ContinuationDataset {
    /// One sample per verse for a fixed input-word budget.
    pub fn from_verses(
        verses: &[Verse],
        vocab: &Vocab,
        max_input_words: usize,
        max_output_words: usize,
    ) -> Self {
        let samples = verses
            .iter()
            .filter_map(|verse| {
                let normalized = normalize(&verse.text);
                let words: Vec<&str> = normalized.split_whitespace().collect();
                ContinuationSample::build(&words, max_input_words, max_output_words, vocab)
            })
            .collect();
        Self { samples }
    }

    pub fn samples(&self) -> &[ContinuationSample] {
        &self.samples
    }
}

impl Dataset<ContinuationSample> for ContinuationDataset {
    fn get(&self, index: usize) -> Option<ContinuationSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::vocab::PAD_ID;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn toy_verses() -> Vec<Verse> {
        vec![
            Verse::new(1, "بسم الله الرحمن الرحيم"),
            Verse::new(2, "الحمد لله رب العالمين"),
            Verse::new(3, "الرحمن الرحيم"),
        ]
    }

    #[test]
    fn matcher_samples_are_fixed_length_and_labelled() {
        let verses = toy_verses();
        let vocab = Vocab::chars_from_verses(&verses);
        let cfg = MatcherDataConfig {
            input_len: 30,
            copies_per_verse: 3,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let ds = MatcherDataset::generate(&verses, &vocab, &cfg, &mut rng);

        assert_eq!(ds.len(), 9);
        for i in 0..ds.len() {
            let s = ds.get(i).unwrap();
            assert_eq!(s.input_ids.len(), 30);
            assert!(s.verse_class < 3);
        }
    }

    #[test]
    fn continuation_sequence_layout() {
        let verses = toy_verses();
        let vocab = Vocab::words_from_verses(&verses);
        let normalized = normalize(&verses[0].text);
        let words: Vec<&str> = normalized.split_whitespace().collect();
        let s = ContinuationSample::build(&words, 10, 5, &vocab).unwrap();

        assert_eq!(s.input_ids[0], BOS_ID);
        assert_eq!(s.input_ids[1], READER_ID);
        assert_eq!(*s.input_ids.last().unwrap(), EOS_ID);
        // 4-word verse: bos + reader + 4 input + marker + 4 output + eos
        assert_eq!(s.input_ids.len(), 11);
        assert_eq!(s.marker_position(), Some(6));
        // shifted target: position i predicts input_ids[i + 1]
        assert_eq!(s.target_ids[..s.input_ids.len() - 1], s.input_ids[1..]);
    }

    #[test]
    fn mask_is_contiguous_and_sized_by_expected_output() {
        let verses = toy_verses();
        let vocab = Vocab::words_from_verses(&verses);
        let ds = ContinuationDataset::from_verses(&verses, &vocab, 10, 5);

        for s in ds.samples() {
            let total: f32 = s.loss_mask.iter().sum();
            assert_eq!(total as usize, s.expected_ids.len());

            let marker = s.marker_position().unwrap();
            for (i, &m) in s.loss_mask.iter().enumerate() {
                let supervised = i >= marker && i < marker + s.expected_ids.len();
                assert_eq!(m == 1.0, supervised, "mask wrong at position {i}");
            }
            // eos prediction is outside the supervised span
            assert_eq!(s.loss_mask[marker + s.expected_ids.len()], 0.0);
        }
    }

    #[test]
    fn supervised_targets_are_the_expected_output() {
        let verses = toy_verses();
        let vocab = Vocab::words_from_verses(&verses);
        let ds = ContinuationDataset::from_verses(&verses, &vocab, 10, 5);
        for s in ds.samples() {
            let marker = s.marker_position().unwrap();
            let supervised = &s.target_ids[marker..marker + s.expected_ids.len()];
            assert_eq!(supervised, s.expected_ids.as_slice());
        }
    }

    #[test]
    fn short_verse_supervises_its_true_length() {
        let verses = toy_verses();
        let vocab = Vocab::words_from_verses(&verses);
        let ds = ContinuationDataset::from_verses(&verses, &vocab, 10, 5);
        // verse 3 has only two words, so only two positions are supervised
        let s = &ds.samples()[2];
        assert_eq!(s.expected_ids.len(), 2);
        assert_eq!(s.loss_mask.iter().sum::<f32>() as usize, 2);
    }

    #[test]
    fn no_padding_inside_generated_sequences() {
        let verses = toy_verses();
        let vocab = Vocab::words_from_verses(&verses);
        let ds = ContinuationDataset::from_verses(&verses, &vocab, 10, 5);
        for s in ds.samples() {
            assert!(s.input_ids.iter().all(|&id| id != PAD_ID));
            assert!(s.input_ids.contains(&AYAH_ID));
        }
    }
}
