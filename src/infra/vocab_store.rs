// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Persists the unit ↔ id mapping next to the checkpoints, so a
// saved model is always decoded with the exact vocabulary it
// was trained on.
//
// Two on-disk layouts exist:
//
//   char map  — {"unit_to_id": {"ا": 6, …}, "vocab_size": 41}
//   word list — ["<pad>", "<unk>", "<s>", …]  (id order)
//
// Character vocabularies were historically stored as maps and
// word vocabularies as id-ordered lists; both still load. An
// untagged enum resolves the layout once at read time, and the
// granularity follows from the layout.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};

use crate::data::vocab::{Granularity, Vocab};
use crate::domain::verse::Verse;

/// File names under the checkpoint directory, one per granularity.
pub const CHAR_VOCAB_FILE: &str = "char_vocab.json";
pub const WORD_VOCAB_FILE: &str = "word_vocab.json";

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum VocabFile {
    CharMap {
        unit_to_id: BTreeMap<String, u32>,
        vocab_size: usize,
    },
    WordList(Vec<String>),
}

/// Write a vocabulary in the layout matching its granularity.
pub fn save(vocab: &Vocab, path: &Path) -> Result<()> {
    let file = match vocab.granularity() {
        Granularity::Char => VocabFile::CharMap {
            unit_to_id: vocab
                .units()
                .iter()
                .enumerate()
                .map(|(id, u)| (u.clone(), id as u32))
                .collect(),
            vocab_size: vocab.size(),
        },
        Granularity::Word => VocabFile::WordList(vocab.units().to_vec()),
    };
    fs::write(path, serde_json::to_string_pretty(&file)?)
        .with_context(|| format!("Cannot write vocabulary to '{}'", path.display()))?;
    Ok(())
}

/// Read a vocabulary, resolving whichever layout the file uses.
pub fn load(path: &Path) -> Result<Vocab> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read vocabulary from '{}'", path.display()))?;
    let file: VocabFile = serde_json::from_str(&json)
        .with_context(|| format!("Unrecognized vocabulary layout in '{}'", path.display()))?;

    match file {
        VocabFile::CharMap {
            unit_to_id,
            vocab_size,
        } => {
            if unit_to_id.len() != vocab_size {
                bail!(
                    "vocabulary '{}' declares {} units but maps {}",
                    path.display(),
                    vocab_size,
                    unit_to_id.len()
                );
            }
            let mut units = vec![String::new(); vocab_size];
            for (unit, id) in unit_to_id {
                match units.get_mut(id as usize) {
                    Some(slot) if slot.is_empty() => *slot = unit,
                    Some(_) => bail!("vocabulary '{}' maps id {} twice", path.display(), id),
                    None => bail!(
                        "vocabulary '{}' maps '{}' to out-of-range id {}",
                        path.display(),
                        unit,
                        id
                    ),
                }
            }
            if let Some(hole) = units.iter().position(String::is_empty) {
                bail!("vocabulary '{}' has no unit for id {}", path.display(), hole);
            }
            Vocab::from_unit_list(Granularity::Char, units)
        }
        VocabFile::WordList(units) => Vocab::from_unit_list(Granularity::Word, units),
    }
}

/// Load the persisted vocabulary, or build it from the corpus
/// and persist it for the next run.
pub fn load_or_build(path: &Path, granularity: Granularity, verses: &[Verse]) -> Result<Vocab> {
    if path.exists() {
        let vocab = load(path)?;
        if vocab.granularity() != granularity {
            bail!(
                "vocabulary '{}' has the wrong granularity for this model",
                path.display()
            );
        }
        tracing::info!("Loaded vocabulary ({} units) from '{}'", vocab.size(), path.display());
        return Ok(vocab);
    }

    let vocab = match granularity {
        Granularity::Char => Vocab::chars_from_verses(verses),
        Granularity::Word => Vocab::words_from_verses(verses),
    };
    save(&vocab, path)?;
    tracing::info!("Built vocabulary ({} units), saved to '{}'", vocab.size(), path.display());
    Ok(vocab)
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

    fn temp_file(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("ayah-match-vocab-{tag}-{}.json", std::process::id()))
    }

    #[test]
    fn char_vocabulary_round_trips_through_the_map_layout() {
        let path = temp_file("char");
        let vocab = Vocab::chars_from_verses(&toy_verses());
        save(&vocab, &path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.granularity(), Granularity::Char);
        assert_eq!(loaded.size(), vocab.size());
        assert_eq!(loaded.id_of("ب"), vocab.id_of("ب"));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn word_vocabulary_round_trips_through_the_list_layout() {
        let path = temp_file("word");
        let vocab = Vocab::words_from_verses(&toy_verses());
        save(&vocab, &path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.granularity(), Granularity::Word);
        assert_eq!(loaded.id_of("الحمد"), vocab.id_of("الحمد"));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn load_or_build_persists_on_first_use() {
        let path = temp_file("build");
        fs::remove_file(&path).ok();
        let verses = toy_verses();

        let built = load_or_build(&path, Granularity::Word, &verses).unwrap();
        assert!(path.exists());

        let reloaded = load_or_build(&path, Granularity::Word, &verses).unwrap();
        assert_eq!(reloaded.size(), built.size());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn wrong_granularity_is_rejected() {
        let path = temp_file("wrong");
        let vocab = Vocab::chars_from_verses(&toy_verses());
        save(&vocab, &path).unwrap();
        assert!(load_or_build(&path, Granularity::Word, &toy_verses()).is_err());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn sparse_or_duplicate_ids_are_rejected() {
        let path = temp_file("sparse");
        fs::write(
            &path,
            r#"{"unit_to_id": {"<pad>": 0, "x": 7}, "vocab_size": 2}"#,
        )
        .unwrap();
        assert!(load(&path).is_err());
        fs::remove_file(&path).ok();
    }
}
