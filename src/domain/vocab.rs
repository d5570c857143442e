// ============================================================
// Layer 3 — Character Vocabulary
// ============================================================
// Maps characters to token ids and back. Index 0 is always
// the newline character, which delimits tweets in a corpus
// and doubles as the start token when sampling without a seed.
//
// Characters outside the vocabulary are skipped when encoding.
// The model's embedding table and output head are sized by
// `len()`, so the vocabulary is persisted next to the weights.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tweet delimiter and sampling start token.
pub const DELIMITER: char = '\n';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<char>", into = "Vec<char>")]
pub struct CharVocab {
    chars: Vec<char>,
    index: HashMap<char, u32>,
}

impl CharVocab {
    /// Build a vocabulary from an explicit character list.
    /// The delimiter is inserted at index 0 if absent; duplicates
    /// keep their first position.
    pub fn from_chars(chars: impl IntoIterator<Item = char>) -> Self {
        let mut ordered = vec![DELIMITER];
        for c in chars {
            if !ordered.contains(&c) {
                ordered.push(c);
            }
        }
        let index = ordered
            .iter()
            .enumerate()
            .map(|(i, &c)| (c, i as u32))
            .collect();
        Self { chars: ordered, index }
    }

    /// Build a vocabulary from the distinct characters of `text`,
    /// sorted so the ids are stable for the same text.
    pub fn from_text(text: &str) -> Self {
        let mut chars: Vec<char> = text.chars().collect();
        chars.sort_unstable();
        chars.dedup();
        Self::from_chars(chars)
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn start_token(&self) -> u32 {
        0
    }

    pub fn char_to_index(&self, c: char) -> Option<u32> {
        self.index.get(&c).copied()
    }

    pub fn index_to_char(&self, id: u32) -> Option<char> {
        self.chars.get(id as usize).copied()
    }

    pub fn encode(&self, text: &str) -> Vec<u32> {
        text.chars().filter_map(|c| self.char_to_index(c)).collect()
    }

    /// Decode ids back into text. Unknown ids are dropped.
    pub fn decode(&self, ids: &[u32]) -> String {
        ids.iter().filter_map(|&id| self.index_to_char(id)).collect()
    }
}

/// The default vocabulary: newline plus printable ASCII.
impl Default for CharVocab {
    fn default() -> Self {
        Self::from_chars((0x20u8..=0x7e).map(char::from))
    }
}

impl From<Vec<char>> for CharVocab {
    fn from(chars: Vec<char>) -> Self {
        Self::from_chars(chars)
    }
}

impl From<CharVocab> for Vec<char> {
    fn from(vocab: CharVocab) -> Self {
        vocab.chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_is_start_token() {
        let vocab = CharVocab::from_text("ab ab");
        assert_eq!(vocab.char_to_index('\n'), Some(vocab.start_token()));
        // '\n', ' ', 'a', 'b'
        assert_eq!(vocab.len(), 4);
    }

    #[test]
    fn test_encode_decode() {
        let vocab = CharVocab::default();
        let ids   = vocab.encode("hi there\n");
        assert_eq!(vocab.decode(&ids), "hi there\n");
    }

    #[test]
    fn test_unknown_chars_are_skipped() {
        let vocab = CharVocab::from_text("ab");
        assert_eq!(vocab.encode("abc"), vec![1, 2]);
        assert_eq!(vocab.decode(&[1, 99, 2]), "ab");
    }

    #[test]
    fn test_serde_round_trip_keeps_ids() {
        let vocab = CharVocab::default();
        let json  = serde_json::to_string(&vocab).unwrap();
        let back: CharVocab = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vocab);
        assert_eq!(back.char_to_index('A'), vocab.char_to_index('A'));
    }
}
