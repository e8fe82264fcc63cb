// ============================================================
// Layer 4 — Transcript Preprocessor
// ============================================================
// Turns raw comic transcripts into word tokens, and word
// tokens into the padded index sequences the text tower eats.
//
// Transcripts come out of OCR / manual annotation and contain:
//   - Non-breaking and zero-width spaces
//   - Tabs and carriage returns
//   - Stray control characters
//   - Punctuation glued to words ("WHAT?!", "...no")
//
// Pipeline (applied in order):
//   1. clean()    — normalise whitespace, drop control chars
//   2. tokenize() — lowercase, split on whitespace, trim edge
//                   punctuation, drop empty tokens
//   3. encode()   — vocabulary index + 1 per token (0 = OOV),
//                   truncate / post-pad with 0 to max_len
//
// The same tokenize() is used to build the vocabulary, so the
// training-time lookup always agrees with vocabulary contents.

use crate::infra::vocab_store::Vocabulary;

/// Index written for padding and for words missing from the vocabulary.
pub const PAD_INDEX: u32 = 0;

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Normalise whitespace and strip control characters.
    /// The result is a single line with single spaces.
    pub fn clean(&self, text: &str) -> String {
        let normalised: String = text
            .chars()
            .map(|c| match c {
                '\t' | '\r' | '\n' => ' ',
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_control() => ' ',
                c => c,
            })
            .collect();

        normalised.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Split cleaned text into lowercase word tokens.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.clean(text)
            .split(' ')
            .map(|word| {
                word.to_lowercase()
                    .trim_matches(|c: char| !c.is_alphanumeric())
                    .to_string()
            })
            .filter(|w| !w.is_empty())
            .collect()
    }

    /// Map text to a fixed-length index sequence.
    ///
    /// Vocabulary indices are shifted by one so that 0 stays free
    /// for padding and out-of-vocabulary words; the embedding
    /// matrix reserves its row 0 for exactly this.
    pub fn encode(&self, text: &str, vocab: &Vocabulary, max_len: usize) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .tokenize(text)
            .iter()
            .take(max_len)
            .map(|tok| match vocab.index_of(tok) {
                Some(i) => (i + 1) as u32,
                None    => PAD_INDEX,
            })
            .collect();

        ids.resize(max_len, PAD_INDEX);
        ids
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
