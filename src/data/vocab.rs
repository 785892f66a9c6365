// ============================================================
// Layer 4 — Vocabulary
// ============================================================
// Bidirectional atomic-unit ↔ dense-id mapping. Two
// granularities share one type: character level (matcher
// models) and word level (continuation model).
//
// Ids 0..=5 are reserved sentinels at fixed positions agreed
// between training and inference; corpus units start at id 6
// in lexicographic order, so rebuilding the vocabulary from
// the same corpus always yields the same ids. A persisted
// checkpoint whose recorded vocab size differs from the live
// vocabulary is rejected before any forward pass (see
// infra::checkpoint).

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::data::normalizer::normalize;
use crate::domain::verse::Verse;

pub const PAD_ID: u32 = 0;
pub const UNK_ID: u32 = 1;
pub const BOS_ID: u32 = 2;
pub const EOS_ID: u32 = 3;
/// Role marker introducing the reader's (possibly wrong) words.
pub const READER_ID: u32 = 4;
/// Role marker introducing the expected verse continuation.
pub const AYAH_ID: u32 = 5;

/// Sentinel spellings, in id order. The role markers keep the
/// original corpus spellings so word vocabularies stay
/// compatible with persisted datasets.
pub const SENTINELS: [&str; 6] = ["<pad>", "<unk>", "<s>", "</s>", "القاريء:", "الاية:"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Char,
    Word,
}

#[derive(Debug, Clone)]
pub struct Vocab {
    granularity: Granularity,
    /// id → unit; positions 0..=5 are the sentinels
    units: Vec<String>,
    unit_to_id: HashMap<String, u32>,
}

impl Vocab {
    /// Character vocabulary over the normalized corpus.
    pub fn chars_from_verses(verses: &[Verse]) -> Self {
        let chars: BTreeSet<char> = verses
            .iter()
            .flat_map(|v| normalize(&v.text).chars().collect::<Vec<_>>())
            .collect();
        Self::from_corpus_units(Granularity::Char, chars.into_iter().map(String::from))
    }

    /// Word vocabulary over the normalized corpus.
    pub fn words_from_verses(verses: &[Verse]) -> Self {
        let words: BTreeSet<String> = verses
            .iter()
            .flat_map(|v| {
                normalize(&v.text)
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();
        Self::from_corpus_units(Granularity::Word, words)
    }

    fn from_corpus_units(
        granularity: Granularity,
        corpus_units: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut units: Vec<String> = SENTINELS.iter().map(|s| s.to_string()).collect();
        units.extend(corpus_units.into_iter().filter(|u| !SENTINELS.contains(&u.as_str())));

        let unit_to_id = units
            .iter()
            .enumerate()
            .map(|(id, u)| (u.clone(), id as u32))
            .collect();

        Self {
            granularity,
            units,
            unit_to_id,
        }
    }

    /// Rebuild a vocabulary from a persisted id-ordered unit list.
    /// The sentinel block must sit at its fixed positions.
    pub fn from_unit_list(granularity: Granularity, units: Vec<String>) -> Result<Self> {
        if units.len() < SENTINELS.len() {
            bail!("vocabulary file holds {} units, fewer than the {} reserved sentinels",
                units.len(), SENTINELS.len());
        }
        for (pos, expected) in SENTINELS.iter().enumerate() {
            if units[pos] != *expected {
                bail!(
                    "vocabulary file has '{}' at reserved position {}, expected '{}'",
                    units[pos], pos, expected
                );
            }
        }
        let unit_to_id = units
            .iter()
            .enumerate()
            .map(|(id, u)| (u.clone(), id as u32))
            .collect();
        Ok(Self {
            granularity,
            units,
            unit_to_id,
        })
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn size(&self) -> usize {
        self.units.len()
    }

    /// id → unit; `None` for an out-of-range id.
    pub fn unit_of(&self, id: u32) -> Option<&str> {
        self.units.get(id as usize).map(String::as_str)
    }

    pub fn id_of(&self, unit: &str) -> Option<u32> {
        self.unit_to_id.get(unit).copied()
    }

    /// Out-of-vocabulary units degrade to `<unk>`, never an error.
    pub fn id_or_unk(&self, unit: &str) -> u32 {
        self.id_of(unit).unwrap_or(UNK_ID)
    }

    /// Id-ordered unit list, for persistence.
    pub fn units(&self) -> &[String] {
        &self.units
    }

    pub fn is_sentinel(id: u32) -> bool {
        (id as usize) < SENTINELS.len()
    }

    /// Split `text` into this vocabulary's atomic units.
    fn split_units(&self, text: &str) -> Vec<String> {
        match self.granularity {
            Granularity::Char => text.chars().map(String::from).collect(),
            Granularity::Word => text.split_whitespace().map(str::to_string).collect(),
        }
    }

    /// Encode without padding. Unknown units map to `<unk>`.
    pub fn encode(&self, text: &str) -> Vec<u32> {
        self.split_units(text)
            .iter()
            .map(|u| self.id_or_unk(u))
            .collect()
    }

    /// Encode, then pad with `<pad>` or truncate to exactly `max_len`.
    pub fn encode_padded(&self, text: &str, max_len: usize) -> Vec<u32> {
        let mut ids = self.encode(text);
        ids.truncate(max_len);
        ids.resize(max_len, PAD_ID);
        ids
    }

    /// Inverse lookup, skipping `<pad>`. Unknown ids render as `<unk>`.
    pub fn decode(&self, ids: &[u32]) -> String {
        let units: Vec<&str> = ids
            .iter()
            .filter(|&&id| id != PAD_ID)
            .map(|&id| self.unit_of(id).unwrap_or(SENTINELS[UNK_ID as usize]))
            .collect();
        match self.granularity {
            Granularity::Char => units.concat(),
            Granularity::Word => units.join(" "),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn toy_verses() -> Vec<Verse> {
        vec![
            Verse::new(1, "بسم الله الرحمن الرحيم"),
            Verse::new(2, "الحمد لله رب العالمين"),
        ]
    }

    #[test]
    fn sentinels_sit_at_fixed_positions() {
        let v = Vocab::chars_from_verses(&toy_verses());
        assert_eq!(v.id_of("<pad>"), Some(PAD_ID));
        assert_eq!(v.id_of("<unk>"), Some(UNK_ID));
        assert_eq!(v.id_of("<s>"), Some(BOS_ID));
        assert_eq!(v.id_of("</s>"), Some(EOS_ID));
        assert_eq!(v.id_of("القاريء:"), Some(READER_ID));
        assert_eq!(v.id_of("الاية:"), Some(AYAH_ID));
    }

    #[test]
    fn ids_are_dense_and_unique() {
        let v = Vocab::words_from_verses(&toy_verses());
        for (id, unit) in v.units().iter().enumerate() {
            assert_eq!(v.id_of(unit), Some(id as u32));
        }
        assert_eq!(v.size(), v.units().len());
    }

    #[test]
    fn char_round_trip_within_max_len() {
        let v = Vocab::chars_from_verses(&toy_verses());
        let text = "بسم الله";
        let ids = v.encode_padded(text, 40);
        assert_eq!(ids.len(), 40);
        assert_eq!(v.decode(&ids), text);
    }

    #[test]
    fn word_round_trip() {
        let v = Vocab::words_from_verses(&toy_verses());
        let text = "الحمد لله رب العالمين";
        assert_eq!(v.decode(&v.encode(text)), text);
    }

    #[test]
    fn out_of_vocabulary_degrades_to_unk() {
        let v = Vocab::words_from_verses(&toy_verses());
        let ids = v.encode("الحمد zzz");
        assert_eq!(ids[1], UNK_ID);
    }

    #[test]
    fn truncates_to_exact_length() {
        let v = Vocab::chars_from_verses(&toy_verses());
        assert_eq!(v.encode_padded("بسم الله الرحمن الرحيم", 5).len(), 5);
    }

    #[test]
    fn unit_list_round_trip_preserves_ids() {
        let v = Vocab::words_from_verses(&toy_verses());
        let rebuilt =
            Vocab::from_unit_list(Granularity::Word, v.units().to_vec()).unwrap();
        assert_eq!(rebuilt.id_of("الحمد"), v.id_of("الحمد"));
    }

    #[test]
    fn unit_list_with_displaced_sentinels_is_rejected() {
        let units = vec!["<unk>".to_string(), "<pad>".to_string()];
        assert!(Vocab::from_unit_list(Granularity::Word, units).is_err());
    }
}
