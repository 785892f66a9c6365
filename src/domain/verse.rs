// ============================================================
// Layer 3 — Verse Domain Type
// ============================================================
// One verse (ayah) of the corpus. Verses are created once at
// corpus load and never mutated; a verse's identity is its
// 1-based position in the corpus file, which is also the
// class index (minus one) the matcher model predicts.

use serde::{Deserialize, Serialize};

/// A single verse of the source corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verse {
    /// 1-based position in the corpus — the verse's identity
    pub number: usize,

    /// The verse text exactly as it appears in the corpus file
    /// (diacritics included; normalization happens downstream)
    pub text: String,
}

impl Verse {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }

    /// 0-based class index used by the matcher model.
    pub fn class_index(&self) -> usize {
        self.number - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_index_is_zero_based() {
        let v = Verse::new(1, "بسم الله الرحمن الرحيم");
        assert_eq!(v.class_index(), 0);
    }
}
