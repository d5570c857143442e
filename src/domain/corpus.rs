// ============================================================
// Layer 3 — EncodedCorpus Domain Type
// ============================================================
// One author's tweets, joined with the newline delimiter and
// encoded into character token ids.
//
// The corpus is immutable once produced. The batch generator
// borrows it; splitting into train/validation produces two
// new corpora rather than mutating this one.
//
// Reference: Rust Book §5 (Structs), §8 (Vectors)

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// An ordered, immutable sequence of token ids.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EncodedCorpus {
    tokens: Vec<u32>,
}

impl EncodedCorpus {
    pub fn new(tokens: Vec<u32>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[u32] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Copy a contiguous range into a new corpus.
    /// The range is clamped to the corpus bounds.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let end   = range.end.min(self.tokens.len());
        let start = range.start.min(end);
        Self::new(self.tokens[start..end].to_vec())
    }

    /// Largest token id in the corpus, if any.
    pub fn max_token(&self) -> Option<u32> {
        self.tokens.iter().copied().max()
    }
}

impl From<Vec<u32>> for EncodedCorpus {
    fn from(tokens: Vec<u32>) -> Self {
        Self::new(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_is_clamped() {
        let corpus = EncodedCorpus::new(vec![1, 2, 3, 4]);
        assert_eq!(corpus.slice(1..3).tokens(), &[2, 3]);
        assert_eq!(corpus.slice(2..10).tokens(), &[3, 4]);
        assert!(corpus.slice(7..9).is_empty());
    }

    #[test]
    fn test_max_token() {
        assert_eq!(EncodedCorpus::new(vec![3, 9, 1]).max_token(), Some(9));
        assert_eq!(EncodedCorpus::default().max_token(), None);
    }
}
