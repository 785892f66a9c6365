// ============================================================
// Layer 4 — Arabic Normalizer
// ============================================================
// Spoken-transcription fragments arrive without diacritics and
// with inconsistent hamza spellings, while the corpus carries
// full tashkeel. Both sides are mapped onto the same canonical
// skeleton before tokenization:
//
//   1. strip the tashkeel code points
//   2. fold hamza letter variants onto their base letter
//
// `normalize` is pure and idempotent: applying it twice gives
// the same result as applying it once.

/// Tashkeel (diacritic) code points removed during normalization.
const TASHKEEL: [char; 15] = [
    '\u{064B}', // fathatan
    '\u{064C}', // dammatan
    '\u{064D}', // kasratan
    '\u{064E}', // fatha
    '\u{064F}', // damma
    '\u{0650}', // kasra
    '\u{0651}', // shadda
    '\u{0652}', // sukun
    '\u{0653}', // maddah
    '\u{0654}', // hamza above
    '\u{0655}', // hamza below
    '\u{0656}', // subscript alef
    '\u{0657}', // inverted damma
    '\u{0658}', // mark noon ghunna
    '\u{0670}', // superscript alef
];

/// Fold a hamza-carrying letter onto its base form.
fn fold_letter(c: char) -> char {
    match c {
        'إ' | 'أ' | 'آ' => 'ا',
        'ؤ' => 'و',
        'ئ' => 'ي',
        other => other,
    }
}

/// Strip tashkeel and fold letter variants.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !TASHKEEL.contains(c))
        .map(fold_letter)
        .collect()
}
