// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads the verse corpus: one verse per UTF-8 line. Lines that
// are empty or consist of a bare marker sentinel (`-` between
// suras, `*` page breaks) are not verses and are dropped here,
// so degenerate inputs never reach the tokenizer or a model.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::domain::traits::VerseSource;
use crate::domain::verse::Verse;

/// Lines equal to one of these are layout markers, not verses.
const MARKER_LINES: [&str; 2] = ["-", "*"];

pub struct CorpusLoader {
    path: PathBuf,
}

impl CorpusLoader {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: PathBuf::from(path.into()),
        }
    }

    /// Filter raw lines into verses with 1-based numbering.
    /// Shared with tests so the filtering rule has one home.
    pub fn verses_from_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<Verse> {
        lines
            .map(str::trim)
            .filter(|line| !line.is_empty() && !MARKER_LINES.contains(line))
            .enumerate()
            .map(|(i, line)| Verse::new(i + 1, line))
            .collect()
    }
}

impl VerseSource for CorpusLoader {
    fn load_verses(&self) -> Result<Vec<Verse>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read corpus file '{}'", self.path.display()))?;

        let verses = Self::verses_from_lines(raw.lines());
        tracing::info!(
            "Loaded {} verses from '{}'",
            verses.len(),
            self.path.display()
        );
        Ok(verses)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_markers_and_blank_lines() {
        let raw = "بسم الله الرحمن الرحيم\n-\n\nالحمد لله رب العالمين\n*\n  \nالرحمن الرحيم";
        let verses = CorpusLoader::verses_from_lines(raw.lines());
        assert_eq!(verses.len(), 3);
        assert_eq!(verses[0].number, 1);
        assert_eq!(verses[2].number, 3);
        assert_eq!(verses[1].text, "الحمد لله رب العالمين");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let verses = CorpusLoader::verses_from_lines("  قل هو الله احد  \n".lines());
        assert_eq!(verses[0].text, "قل هو الله احد");
    }
}
