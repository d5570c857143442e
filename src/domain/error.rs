// ============================================================
// Layer 3 — Core Error Taxonomy
// ============================================================
// Every fallible core operation returns `CoreError`. Nothing
// in the core retries: shape and numeric errors propagate to
// the caller unchanged. The application layer converts these
// into anyhow errors with context and status text.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// The corpus supplier could not produce tweets for an author
    #[error("no training data for '{author}': {reason}")]
    DataUnavailable { author: String, reason: String },

    /// Parameters or tensors do not fit the target shape
    #[error("shape mismatch in '{layer}': expected {expected}, found {found}")]
    ShapeMismatch {
        layer:    String,
        expected: String,
        found:    String,
    },

    /// The training loss became NaN or infinite
    #[error("training diverged at epoch {epoch}, batch {batch} (loss = {loss})")]
    TrainingDivergence { epoch: usize, batch: usize, loss: f64 },

    /// An operation needed a model and none is loaded
    #[error("no model loaded")]
    ModelNotLoaded,

    /// Model store load/save/list failure
    #[error("model store error for '{key}': {reason}")]
    StoreIo { key: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A train or generate request is already running
    #[error("another train or generate request is in progress")]
    Busy,

    /// Reading tensor data back to the host failed
    #[error("tensor data error: {0}")]
    Tensor(String),
}

impl CoreError {
    pub fn shape_mismatch(
        layer:    impl Into<String>,
        expected: impl ToString,
        found:    impl ToString,
    ) -> Self {
        Self::ShapeMismatch {
            layer:    layer.into(),
            expected: expected.to_string(),
            found:    found.to_string(),
        }
    }

    pub fn store_io(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::StoreIo { key: key.into(), reason: reason.to_string() }
    }

    pub fn data_unavailable(author: impl Into<String>, reason: impl ToString) -> Self {
        Self::DataUnavailable { author: author.into(), reason: reason.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = CoreError::shape_mismatch("embedding", 960, 480);
        assert_eq!(
            err.to_string(),
            "shape mismatch in 'embedding': expected 960, found 480"
        );
    }
}
