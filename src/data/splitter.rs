// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Splits an encoded corpus into two contiguous parts:
//   - Validation set: the leading `val_fraction` of tokens
//   - Training set:   everything after it
//
// No shuffling. Both halves feed stateful recurrent passes,
// so each must stay in corpus order.
//
// Split ratio: 20% validation, 80% training (configurable)

use crate::domain::corpus::EncodedCorpus;

/// Split `corpus` into (train, validation).
///
/// # Arguments
/// * `corpus`       - The full encoded corpus (left untouched)
/// * `val_fraction` - Proportion for validation, e.g. 0.2 = 20%,
///                    clamped to [0, 1]
///
/// # Example
/// ```ignore
/// let (train, val) = split_corpus(&corpus, 0.2);
/// // val holds the first 20% of tokens, train the remaining 80%
/// ```
pub fn split_corpus(corpus: &EncodedCorpus, val_fraction: f64) -> (EncodedCorpus, EncodedCorpus) {
    let total    = corpus.len();
    let fraction = val_fraction.clamp(0.0, 1.0);
    let split_at = ((total as f64) * fraction).floor() as usize;
    let split_at = split_at.min(total);

    let val   = corpus.slice(0..split_at);
    let train = corpus.slice(split_at..total);

    tracing::debug!(
        "Corpus split: {} training, {} validation tokens",
        train.len(),
        val.len(),
    );

    (train, val)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(len: u32) -> EncodedCorpus {
        EncodedCorpus::new((0..len).collect())
    }

    #[test]
    fn test_correct_split_sizes() {
        let (train, val) = split_corpus(&corpus(100), 0.2);
        assert_eq!(train.len(), 80);
        assert_eq!(val.len(),   20);
    }

    #[test]
    fn test_validation_is_the_leading_slice() {
        let (train, val) = split_corpus(&corpus(10), 0.3);
        assert_eq!(val.tokens(),   &[0, 1, 2]);
        assert_eq!(train.tokens(), &[3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_all_tokens_preserved() {
        let (train, val) = split_corpus(&corpus(53), 0.17);
        assert_eq!(train.len() + val.len(), 53);
    }

    #[test]
    fn test_empty_corpus() {
        let (train, val) = split_corpus(&EncodedCorpus::default(), 0.2);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }

    #[test]
    fn test_zero_fraction_keeps_everything_for_training() {
        let (train, val) = split_corpus(&corpus(10), 0.0);
        assert_eq!(train.len(), 10);
        assert!(val.is_empty());
    }
}
