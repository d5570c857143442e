// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between the core and its collaborators:
//
//   CorpusSource   — supplies an author's encoded tweets
//                    (implemented by data::loader::TweetArchive)
//   EpochObserver  — receives (epoch, train_loss, val_loss)
//                    after every epoch (closures, MetricsLogger)
//
// The model store and the next-token model carry Burn types,
// so their traits live in the infra and ml layers.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use crate::domain::corpus::EncodedCorpus;
use crate::domain::error::CoreError;
use crate::domain::vocab::CharVocab;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can fetch an author's tweets.
///
/// Returns the cleaned raw text alongside its encoding with
/// `vocab`. A missing author, an unreadable source or an empty
/// archive is `CoreError::DataUnavailable`, never an empty corpus.
pub trait CorpusSource {
    fn fetch(&self, author: &str, vocab: &CharVocab) -> Result<(String, EncodedCorpus), CoreError>;
}

// ─── EpochObserver ────────────────────────────────────────────────────────────
/// Progress observer invoked synchronously once per epoch.
/// Implementations must not panic; failures are theirs to log.
pub trait EpochObserver {
    fn on_epoch_end(&mut self, epoch: usize, train_loss: f64, val_loss: f64);
}

impl<F> EpochObserver for F
where
    F: FnMut(usize, f64, f64),
{
    fn on_epoch_end(&mut self, epoch: usize, train_loss: f64, val_loss: f64) {
        self(epoch, train_loss, val_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_an_observer() {
        let mut seen = Vec::new();
        {
            let mut observer = |epoch: usize, _: f64, _: f64| seen.push(epoch);
            observer.on_epoch_end(1, 0.5, 0.6);
            observer.on_epoch_end(2, 0.4, 0.5);
        }
        assert_eq!(seen, vec![1, 2]);
    }
}
