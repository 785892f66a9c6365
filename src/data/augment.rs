// ============================================================
// Layer 4 — Augmentation
// ============================================================
// Corruption functions that turn clean verse text into the
// kind of degraded fragments a speech transcription produces:
// dropped letters, cut-off recitations, skipped or misheard
// words. Used only to build training inputs — the label or
// expected continuation is always the clean verse.
//
// Invariants, tested below:
//   - every function is the identity at rate/fraction 0
//   - a non-empty input never corrupts to an empty output
//     (the last remaining unit is protected)

use rand::seq::SliceRandom;
use rand::Rng;

/// Randomly remove up to `rate * len` characters.
pub fn delete_random_chars(text: &str, rate: f64, rng: &mut impl Rng) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    let num_to_remove = (chars.len() as f64 * rate) as usize;
    for _ in 0..num_to_remove {
        // Never delete the last remaining character
        if chars.len() > 1 {
            let idx = rng.gen_range(0..chars.len());
            chars.remove(idx);
        }
    }
    chars.into_iter().collect()
}

/// Keep only the first `(1 - rate) * len` characters, as if the
/// reader stopped mid-verse. At least one character survives.
pub fn truncate_tail(text: &str, rate: f64) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    let keep = ((chars.len() as f64) * (1.0 - rate)) as usize;
    chars[..keep.clamp(1, chars.len())].iter().collect()
}

/// Drop the final letter of roughly `fraction` of the words.
pub fn clip_word_endings(text: &str, fraction: f64, rng: &mut impl Rng) -> String {
    text.split_whitespace()
        .map(|word| {
            let chars: Vec<char> = word.chars().collect();
            if chars.len() > 1 && rng.gen::<f64>() < fraction {
                chars[..chars.len() - 1].iter().collect()
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Omit the word at `position` (clamped). A single-word input
/// is returned unchanged so the output cannot become empty.
pub fn omit_word(text: &str, position: usize) -> String {
    let mut words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > 1 {
        words.remove(position.min(words.len() - 1));
    }
    words.join(" ")
}

/// Replace the word at `position` (clamped) with a different
/// word drawn from `pool`. Only when `pool` offers no
/// alternative does the original word stay.
pub fn substitute_word(
    text: &str,
    position: usize,
    pool: &[String],
    rng: &mut impl Rng,
) -> String {
    let mut words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
    if words.is_empty() {
        return String::new();
    }
    let position = position.min(words.len() - 1);
    let candidates: Vec<&String> = pool.iter().filter(|w| **w != words[position]).collect();
    if let Some(replacement) = candidates.choose(rng) {
        words[position] = (*replacement).clone();
    }
    words.join(" ")
}

/// Slice a `window`-character view starting at a random offset
/// of at most `max_offset`, simulating a reader who starts a
/// few characters into the verse. Shorter text passes through.
pub fn offset_window(text: &str, window: usize, max_offset: usize, rng: &mut impl Rng) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= window {
        return text.to_string();
    }
    let max_offset = max_offset.min(chars.len() - window);
    let offset = rng.gen_range(0..=max_offset);
    chars[offset..offset + window].iter().collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    const VERSE: &str = "الحمد لله رب العالمين";

    #[test]
    fn identity_at_rate_zero() {
        let mut r = rng();
        assert_eq!(delete_random_chars(VERSE, 0.0, &mut r), VERSE);
        assert_eq!(truncate_tail(VERSE, 0.0), VERSE);
        assert_eq!(clip_word_endings(VERSE, 0.0, &mut r), VERSE);
        assert_eq!(offset_window(VERSE, VERSE.chars().count(), 0, &mut r), VERSE);
    }

    #[test]
    fn never_empties_a_nonempty_input() {
        let mut r = rng();
        assert!(!delete_random_chars("اب", 1.0, &mut r).is_empty());
        assert!(!truncate_tail("اب", 1.0).is_empty());
        assert_eq!(omit_word("الله", 0), "الله");
    }

    #[test]
    fn delete_removes_expected_count() {
        let mut r = rng();
        let out = delete_random_chars(VERSE, 0.2, &mut r);
        let expected = VERSE.chars().count() - (VERSE.chars().count() as f64 * 0.2) as usize;
        assert_eq!(out.chars().count(), expected);
    }

    #[test]
    fn truncate_keeps_a_prefix() {
        let out = truncate_tail(VERSE, 0.4);
        assert!(VERSE.starts_with(&out));
        assert!(out.chars().count() < VERSE.chars().count());
    }

    #[test]
    fn clip_drops_only_final_letters() {
        let mut r = rng();
        let out = clip_word_endings(VERSE, 1.0, &mut r);
        let clipped: Vec<&str> = out.split_whitespace().collect();
        let original: Vec<&str> = VERSE.split_whitespace().collect();
        assert_eq!(clipped.len(), original.len());
        for (c, o) in clipped.iter().zip(&original) {
            assert!(o.starts_with(c));
            assert_eq!(c.chars().count(), o.chars().count() - 1);
        }
    }

    #[test]
    fn omit_removes_one_word() {
        let out = omit_word(VERSE, 1);
        assert_eq!(out, "الحمد رب العالمين");
    }

    #[test]
    fn substitute_never_picks_the_original() {
        let pool = vec!["لله".to_string(), "نور".to_string()];
        let mut r = rng();
        for _ in 0..20 {
            let out = substitute_word("لله", 0, &pool, &mut r);
            assert_eq!(out, "نور");
        }
    }

    #[test]
    fn substitute_with_no_alternative_keeps_word() {
        let pool = vec!["لله".to_string()];
        let mut r = rng();
        assert_eq!(substitute_word("لله", 0, &pool, &mut r), "لله");
    }

    #[test]
    fn offset_window_bounds() {
        let mut r = rng();
        let out = offset_window(VERSE, 10, 5, &mut r);
        assert_eq!(out.chars().count(), 10);
        let full: Vec<char> = VERSE.chars().collect();
        let got: Vec<char> = out.chars().collect();
        assert!((0..=5).any(|off| full[off..off + 10] == got[..]));
    }
}
