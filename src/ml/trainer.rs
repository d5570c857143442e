// ============================================================
// Layer 5 — Fine-Tuning Loop
// ============================================================
// Gradient descent over the batch generator's windows, one
// epoch at a time:
//
//   for epoch in 1..=num_epochs
//     reset recurrent state
//     for each training batch (corpus order)
//       forward with the carried state → cross-entropy loss
//       backward pass + Adam update
//     forward every validation batch on the inner backend
//     observer.on_epoch_end(epoch, train_loss, val_loss)
//
// Batches and epochs are strictly sequential: the recurrent
// state left by batch i seeds batch i+1.
//
// Known limitation: fine-tuning is not transactional. When a
// step fails (shape mismatch, NaN/inf loss) the run stops and
// the error propagates, but the parameter updates already made
// stay in the model. The error reports how many epochs finished.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use burn::{
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{activation::log_softmax, backend::AutodiffBackend},
};
use thiserror::Error;

use crate::data::batcher::{BatchGenerator, TargetTensor, TrainingBatcher};
use crate::domain::error::CoreError;
use crate::domain::metrics::EpochMetrics;
use crate::domain::traits::EpochObserver;
use crate::ml::model::CharRnn;
use crate::ml::state::{Mode, ModelState};

/// A fine-tuning run that stopped early. Parameters updated by
/// earlier batches are kept in the model.
#[derive(Debug, Error)]
#[error("trained for {completed_epochs} of {requested_epochs} epochs")]
pub struct FineTuneError {
    pub completed_epochs: usize,
    pub requested_epochs: usize,
    #[source]
    pub cause: CoreError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub epochs_requested: usize,
    pub history:          Vec<EpochMetrics>,
}

impl TrainingReport {
    pub fn last(&self) -> Option<&EpochMetrics> {
        self.history.last()
    }
}

pub struct FineTuner {
    optimizer:     AdamConfig,
    learning_rate: f64,
}

impl FineTuner {
    pub fn new(learning_rate: f64) -> Self {
        // m = β1*m + (1-β1)*g        (mean)
        // v = β2*v + (1-β2)*g²       (variance)
        // θ = θ - lr * m / (√v + ε)  (update)
        Self { optimizer: AdamConfig::new().with_epsilon(1e-8), learning_rate }
    }

    /// Fine-tune `model` in place for `num_epochs` epochs.
    ///
    /// `model` must be in training mode with a batch size of
    /// `batch_size`, and both generators must produce windows of the
    /// model's shape and vocabulary. `observer` is called once per
    /// completed epoch, before the next epoch starts.
    pub fn fine_tune<B, O>(
        &self,
        model:      &mut ModelState<B>,
        num_epochs: usize,
        batch_size: usize,
        train:      &BatchGenerator<'_>,
        val:        &BatchGenerator<'_>,
        observer:   &mut O,
    ) -> Result<TrainingReport, FineTuneError>
    where
        B: AutodiffBackend,
        O: EpochObserver + ?Sized,
    {
        let abort = |completed_epochs: usize, cause: CoreError| FineTuneError {
            completed_epochs,
            requested_epochs: num_epochs,
            cause,
        };

        check_compatible(model, batch_size, train, val).map_err(|e| abort(0, e))?;

        let mut optim   = self.optimizer.init::<B, CharRnn<B>>();
        let mut history = Vec::with_capacity(num_epochs);

        for epoch in 1..=num_epochs {
            let metrics = self
                .run_epoch(epoch, model, &mut optim, train, val)
                .map_err(|e| abort(epoch - 1, e))?;

            tracing::info!(
                "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4}",
                epoch, num_epochs, metrics.train_loss, metrics.val_loss,
            );
            observer.on_epoch_end(epoch, metrics.train_loss, metrics.val_loss);
            history.push(metrics);
        }

        Ok(TrainingReport { epochs_requested: num_epochs, history })
    }

    fn run_epoch<B, Opt>(
        &self,
        epoch: usize,
        model: &mut ModelState<B>,
        optim: &mut Opt,
        train: &BatchGenerator<'_>,
        val:   &BatchGenerator<'_>,
    ) -> Result<EpochMetrics, CoreError>
    where
        B: AutodiffBackend,
        Opt: Optimizer<CharRnn<B>, B>,
    {
        // ── Training phase ────────────────────────────────────────────────────
        model.reset_state();
        let batcher = TrainingBatcher::<B>::new(model.device());

        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for (index, mini) in train.iter().enumerate() {
            let batch  = batcher.batch(&mini);
            let logits = model.forward_batch(batch.inputs)?;
            let loss   = categorical_cross_entropy(logits, batch.targets);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                return Err(CoreError::TrainingDivergence { epoch, batch: index + 1, loss: loss_val });
            }
            train_loss_sum += loss_val;
            train_batches  += 1;

            // Backward pass + Adam update
            let grads   = loss.backward();
            let grads   = GradientsParams::from_grads(grads, model.network());
            let updated = optim.step(self.learning_rate, model.network().clone(), grads);
            model.replace_network(updated);

            tracing::debug!("epoch {} batch {} loss={:.4}", epoch, index + 1, loss_val);
        }

        // ── Validation phase ──────────────────────────────────────────────────
        // valid() → ModelState<B::InnerBackend>: no gradients, no dropout,
        // and its own recurrent state carried across validation batches.
        let mut model_valid = model.valid();
        let val_batcher     = TrainingBatcher::<B::InnerBackend>::new(model_valid.device());

        let mut val_loss_sum = 0.0f64;
        let mut val_batches  = 0usize;

        for mini in val.iter() {
            let batch  = val_batcher.batch(&mini);
            let logits = model_valid.forward_batch(batch.inputs)?;
            val_loss_sum += categorical_cross_entropy(logits, batch.targets)
                .into_scalar()
                .elem::<f64>();
            val_batches += 1;
        }

        Ok(EpochMetrics::new(
            epoch,
            mean(train_loss_sum, train_batches),
            mean(val_loss_sum, val_batches),
        ))
    }
}

impl Default for FineTuner {
    fn default() -> Self {
        Self::new(1e-3)
    }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count > 0 { sum / count as f64 } else { f64::NAN }
}

fn check_compatible<B: AutodiffBackend>(
    model:      &ModelState<B>,
    batch_size: usize,
    train:      &BatchGenerator<'_>,
    val:        &BatchGenerator<'_>,
) -> Result<(), CoreError> {
    let shape = model.shape();
    if shape.mode != Mode::Training {
        return Err(CoreError::shape_mismatch("mode", "training", "inference"));
    }
    if shape.batch_size != batch_size {
        return Err(CoreError::shape_mismatch("batch", batch_size, shape.batch_size));
    }
    for (name, generator) in [("train", train), ("validation", val)] {
        let opts = generator.options();
        if opts.batch_size != batch_size || opts.seq_len != shape.seq_len {
            return Err(CoreError::shape_mismatch(
                format!("{name} batches"),
                format!("{}x{}", batch_size, shape.seq_len),
                format!("{}x{}", opts.batch_size, opts.seq_len),
            ));
        }
        if opts.vocab_size != model.vocab_size() {
            return Err(CoreError::shape_mismatch(
                format!("{name} targets"),
                model.vocab_size(),
                opts.vocab_size,
            ));
        }
    }
    if train.num_batches() == 0 {
        return Err(CoreError::InvalidConfig(format!(
            "training corpus is shorter than one window of {} tokens",
            shape.seq_len + 1
        )));
    }
    Ok(())
}

/// Mean categorical cross-entropy over every position.
///
/// logits: [rows, seq_len, vocab]; targets are ids [rows, seq_len]
/// or one-hot rows [rows, seq_len, vocab]. Both encodings give the
/// same value for the same labels.
pub fn categorical_cross_entropy<B: Backend>(logits: Tensor<B, 3>, targets: TargetTensor<B>) -> Tensor<B, 1> {
    let [rows, steps, vocab] = logits.dims();
    match targets {
        TargetTensor::Ids(ids) => {
            let ce = CrossEntropyLossConfig::new().init(&logits.device());
            ce.forward(logits.reshape([rows * steps, vocab]), ids.reshape([rows * steps]))
        }
        TargetTensor::OneHot(one_hot) => {
            let log_probs = log_softmax(logits, 2);
            (one_hot * log_probs).sum_dim(2).mean().neg()
        }
    }
}
