use serde::{Deserialize, Serialize};

/// Losses recorded at the end of one training epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean categorical cross-entropy over the training batches
    pub train_loss: f64,

    /// Mean categorical cross-entropy over the validation batches.
    /// NaN when the validation split produced no batches.
    pub val_loss: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64) -> Self {
        Self { epoch, train_loss, val_loss }
    }
}
