// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits instead
// of concrete types, so implementations can be swapped without
// touching the orchestration code.

use crate::domain::verse::Verse;
use anyhow::Result;

// ─── VerseSource ──────────────────────────────────────────────────────────────
/// Any component that can produce the ordered verse list.
///
/// Implementations:
///   - CorpusLoader → reads a one-verse-per-line UTF-8 file
pub trait VerseSource {
    /// Load every verse, in corpus order, with 1-based numbering.
    /// Degenerate lines (empty, or bare `-` / `*` markers) must
    /// already be filtered out.
    fn load_verses(&self) -> Result<Vec<Verse>>;
}
