// ============================================================
// Layer 3 — Run Options
// ============================================================
// The knobs recognised by the core:
//
//   TrainingOptions — architecture transform + batch generator
//                     + fine-tuner
//   SamplerOptions  — autoregressive sampler
//
// Both are plain serde structs. `validate()` is called at the
// entry point of every core operation that consumes them.

use serde::{Deserialize, Serialize};

use crate::domain::error::CoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOptions {
    /// Windows per mini-batch
    pub batch_size:     usize,
    /// Tokens per window (the unrolled sequence length)
    pub seq_len:        usize,
    /// Dropout rate applied after each recurrent layer, in [0, 1)
    pub dropout:        f64,
    /// Expand targets into one-hot rows instead of raw ids
    pub one_hot_labels: bool,
}

impl TrainingOptions {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.batch_size == 0 {
            return Err(CoreError::InvalidConfig("batch_size must be > 0".into()));
        }
        if self.seq_len == 0 {
            return Err(CoreError::InvalidConfig("seq_len must be > 0".into()));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(CoreError::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            batch_size:     64,
            seq_len:        64,
            dropout:        0.1,
            one_hot_labels: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerOptions {
    /// Exact number of tokens in the generated sequence
    pub max_length: usize,
    /// Size of the candidate pool drawn from at each step
    pub top_n:      usize,
}

impl SamplerOptions {
    pub fn validate(&self, vocab_size: usize) -> Result<(), CoreError> {
        if self.max_length == 0 {
            return Err(CoreError::InvalidConfig("max_length must be > 0".into()));
        }
        if self.top_n == 0 || self.top_n > vocab_size {
            return Err(CoreError::InvalidConfig(format!(
                "top_n must be in 1..={vocab_size}, got {}",
                self.top_n
            )));
        }
        Ok(())
    }
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self { max_length: 2048, top_n: 3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(TrainingOptions::default().validate().is_ok());
        assert!(SamplerOptions::default().validate(96).is_ok());
    }

    #[test]
    fn test_rejects_zero_sizes() {
        let opts = TrainingOptions { batch_size: 0, ..Default::default() };
        assert!(matches!(opts.validate(), Err(CoreError::InvalidConfig(_))));

        let opts = TrainingOptions { seq_len: 0, ..Default::default() };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_rejects_dropout_of_one() {
        let opts = TrainingOptions { dropout: 1.0, ..Default::default() };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_top_n_bounded_by_vocab() {
        let opts = SamplerOptions { max_length: 10, top_n: 5 };
        assert!(opts.validate(5).is_ok());
        assert!(opts.validate(4).is_err());
        assert!(SamplerOptions { max_length: 10, top_n: 0 }.validate(5).is_err());
        assert!(SamplerOptions { max_length: 0, top_n: 1 }.validate(5).is_err());
    }
}
