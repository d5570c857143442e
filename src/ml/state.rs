// ============================================================
// Layer 5 — Model State
// ============================================================
// A ModelState bundles three things:
//
//   network — the CharRnn module and its learned parameters
//   shape   — an immutable descriptor of the mode the network
//             was built for (batch size, unroll length,
//             statefulness, dropout)
//   hidden  — an explicit handle on the recurrent state carried
//             between successive forward calls
//
// The hidden state is the only mutable resource shared across
// calls. It is cleared by `reset_state()`; the fine-tuner does
// so at every epoch boundary and the sampler at the start of
// every generation run. Methods that touch it take `&mut self`,
// so two runs can never interleave on one handle.

use std::fmt;

use burn::{
    module::AutodiffModule,
    nn::LstmState,
    prelude::*,
    tensor::{activation::softmax, backend::AutodiffBackend},
};
use serde::{Deserialize, Serialize};

use crate::domain::error::CoreError;
use crate::domain::options::TrainingOptions;
use crate::ml::model::{CharRnn, CharRnnConfig, LayerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Fixed batch size, unrolled over a window of `seq_len` steps
    Training,
    /// One sequence, one step per call
    Inference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelShape {
    pub mode:       Mode,
    /// Upper bound on rows per forward call
    pub batch_size: usize,
    /// Exact number of time steps per forward call
    pub seq_len:    usize,
    /// Carry the recurrent state from one call into the next
    pub stateful:   bool,
    pub dropout:    f64,
}

impl ModelShape {
    pub fn training(options: &TrainingOptions) -> Self {
        Self {
            mode:       Mode::Training,
            batch_size: options.batch_size,
            seq_len:    options.seq_len,
            stateful:   true,
            dropout:    options.dropout,
        }
    }

    pub fn inference() -> Self {
        Self {
            mode:       Mode::Inference,
            batch_size: 1,
            seq_len:    1,
            stateful:   true,
            dropout:    0.0,
        }
    }

    pub fn for_mode(mode: Mode, options: &TrainingOptions) -> Self {
        match mode {
            Mode::Training  => Self::training(options),
            Mode::Inference => Self::inference(),
        }
    }
}

// ─── HiddenState ──────────────────────────────────────────────────────────────
/// Per-layer recurrent state carried between forward calls.
pub struct HiddenState<B: Backend> {
    layers: Option<Vec<LayerState<B>>>,
}

impl<B: Backend> HiddenState<B> {
    pub fn empty() -> Self {
        Self { layers: None }
    }

    pub fn reset(&mut self) {
        self.layers = None;
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_none()
    }

    /// Rows of the carried state, if any.
    pub fn batch_size(&self) -> Option<usize> {
        self.layers
            .as_ref()
            .and_then(|layers| layers.first())
            .map(|state| state.hidden.dims()[0])
    }

    /// Hand out the carried state for a call with `rows` rows.
    /// Row r continues row r, so a wider state is cut down to its
    /// first `rows` rows. A narrower one cannot seed the call; it
    /// is discarded and the call starts from zeros.
    fn take_for(&mut self, rows: usize) -> Option<Vec<LayerState<B>>> {
        let carried = self.batch_size()?;
        let layers  = self.layers.take()?;
        if carried == rows {
            return Some(layers);
        }
        if carried < rows {
            tracing::debug!("Dropping carried state: {} rows for a batch of {}", carried, rows);
            return None;
        }
        Some(
            layers
                .into_iter()
                .map(|s| LstmState::new(s.cell.slice([0..rows]), s.hidden.slice([0..rows])))
                .collect(),
        )
    }

    /// Keep the state for the next call, cut off from the graph that
    /// produced it (truncated backpropagation through time).
    fn store(&mut self, layers: Vec<LayerState<B>>) {
        self.layers = Some(
            layers
                .into_iter()
                .map(|s| LstmState::new(s.cell.detach(), s.hidden.detach()))
                .collect(),
        );
    }
}

impl<B: Backend> Default for HiddenState<B> {
    fn default() -> Self {
        Self::empty()
    }
}

// ─── ModelState ───────────────────────────────────────────────────────────────
pub struct ModelState<B: Backend> {
    network: CharRnn<B>,
    config:  CharRnnConfig,
    shape:   ModelShape,
    hidden:  HiddenState<B>,
}

impl<B: Backend> ModelState<B> {
    /// Wrap a freshly built or freshly loaded network. It starts in
    /// single-step inference shape, the shape a stored model has.
    pub fn new(network: CharRnn<B>, config: CharRnnConfig) -> Self {
        let shape = ModelShape { dropout: config.dropout, ..ModelShape::inference() };
        Self::from_parts(network, config, shape)
    }

    /// A randomly initialised model.
    pub fn init(config: CharRnnConfig, device: &B::Device) -> Self {
        let network = config.init::<B>(device);
        Self::new(network, config)
    }

    pub(crate) fn from_parts(network: CharRnn<B>, config: CharRnnConfig, shape: ModelShape) -> Self {
        Self { network, config, shape, hidden: HiddenState::empty() }
    }

    pub fn network(&self) -> &CharRnn<B> {
        &self.network
    }

    pub fn config(&self) -> &CharRnnConfig {
        &self.config
    }

    pub fn shape(&self) -> &ModelShape {
        &self.shape
    }

    pub fn mode(&self) -> Mode {
        self.shape.mode
    }

    pub fn vocab_size(&self) -> usize {
        self.config.vocab_size
    }

    pub fn num_params(&self) -> usize {
        self.network.num_params()
    }

    pub fn device(&self) -> B::Device {
        self.network.device()
    }

    pub fn hidden_state(&self) -> &HiddenState<B> {
        &self.hidden
    }

    pub fn reset_state(&mut self) {
        self.hidden.reset();
    }

    /// Swap in updated parameters (after an optimiser step).
    /// The carried hidden state is kept.
    pub(crate) fn replace_network(&mut self, network: CharRnn<B>) {
        self.network = network;
    }

    /// inputs: [rows, seq_len] → logits: [rows, seq_len, vocab_size]
    ///
    /// `rows` may be smaller than the shape's batch size (a short
    /// final batch) but never larger; the number of time steps must
    /// match exactly.
    pub fn forward_batch(&mut self, inputs: Tensor<B, 2, Int>) -> Result<Tensor<B, 3>, CoreError> {
        let [rows, steps] = inputs.dims();
        if rows == 0 || rows > self.shape.batch_size {
            return Err(CoreError::shape_mismatch(
                "input",
                format!("1..={} rows", self.shape.batch_size),
                rows,
            ));
        }
        if steps != self.shape.seq_len {
            return Err(CoreError::shape_mismatch(
                "input",
                format!("{} time steps", self.shape.seq_len),
                steps,
            ));
        }

        let carried = if self.shape.stateful { self.hidden.take_for(rows) } else { None };
        let (logits, state) = self.network.forward(inputs, carried);
        if self.shape.stateful {
            self.hidden.store(state);
        }
        Ok(logits)
    }

    /// Feed one token and return the next-token probabilities.
    /// Only valid in inference mode; the hidden state advances by
    /// one step.
    pub fn step(&mut self, token: u32) -> Result<Vec<f32>, CoreError> {
        if self.shape.mode != Mode::Inference {
            return Err(CoreError::shape_mismatch("mode", "inference", "training"));
        }
        let vocab_size = self.config.vocab_size;
        if token as usize >= vocab_size {
            return Err(CoreError::shape_mismatch(
                "embedding",
                format!("token id < {vocab_size}"),
                token,
            ));
        }

        let device = self.device();
        let input  = Tensor::<B, 2, Int>::from_ints([[token as i32]], &device);
        let logits = self.forward_batch(input)?;

        softmax(logits.reshape([1, vocab_size]), 1)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| CoreError::Tensor(format!("{e:?}")))
    }
}

impl<B: AutodiffBackend> ModelState<B> {
    /// The same parameters on the inner backend: no autodiff graph,
    /// dropout disabled. The copy starts with an empty hidden state.
    pub fn valid(&self) -> ModelState<B::InnerBackend> {
        ModelState::from_parts(self.network.valid(), self.config.clone(), self.shape.clone())
    }
}

impl<B: Backend> fmt::Debug for ModelState<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelState")
            .field("config", &self.config)
            .field("shape", &self.shape)
            .field("carried_rows", &self.hidden.batch_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn tiny_state() -> ModelState<TestBackend> {
        let config = CharRnnConfig::new(5).with_embedding_dim(3).with_hidden_size(4);
        ModelState::init(config, &Default::default())
    }

    #[test]
    fn test_new_model_is_in_inference_shape() {
        let state = tiny_state();
        assert_eq!(state.mode(), Mode::Inference);
        assert_eq!(state.shape().batch_size, 1);
        assert!(state.hidden_state().is_empty());
    }

    #[test]
    fn test_step_returns_a_distribution_and_carries_state() {
        let mut state = tiny_state();
        let probs = state.step(2).unwrap();
        assert_eq!(probs.len(), 5);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        assert_eq!(state.hidden_state().batch_size(), Some(1));

        state.reset_state();
        assert!(state.hidden_state().is_empty());
    }

    #[test]
    fn test_reset_restores_the_first_step_output() {
        let mut state = tiny_state();
        let first = state.step(1).unwrap();
        let second = state.step(1).unwrap();
        assert_ne!(first, second);

        state.reset_state();
        assert_eq!(state.step(1).unwrap(), first);
    }

    #[test]
    fn test_step_rejects_unknown_tokens() {
        let mut state = tiny_state();
        let err = state.step(5).unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_forward_batch_checks_the_shape() {
        let mut state = tiny_state();
        let device = Default::default();
        let too_long = Tensor::<TestBackend, 2, Int>::zeros([1, 3], &device);
        assert!(matches!(
            state.forward_batch(too_long),
            Err(CoreError::ShapeMismatch { .. })
        ));
        let too_wide = Tensor::<TestBackend, 2, Int>::zeros([2, 1], &device);
        assert!(state.forward_batch(too_wide).is_err());
    }

    #[test]
    fn test_shorter_batch_keeps_the_leading_rows_state() {
        let base   = tiny_state();
        let shape  = ModelShape {
            mode: Mode::Training, batch_size: 3, seq_len: 1, stateful: true, dropout: 0.0,
        };
        let mut wide   = ModelState::from_parts(base.network().clone(), base.config().clone(), shape.clone());
        let mut narrow = ModelState::from_parts(base.network().clone(), base.config().clone(), shape.clone());
        let mut fresh  = ModelState::from_parts(base.network().clone(), base.config().clone(), shape);
        let device = Default::default();
        let ints   = |rows: &[i32]| {
            Tensor::<TestBackend, 1, Int>::from_ints(rows, &device).reshape([rows.len(), 1])
        };
        let floats = |t: Tensor<TestBackend, 3>| t.into_data().to_vec::<f32>().unwrap();

        wide.forward_batch(ints(&[1, 2, 3])).unwrap();
        let continued = floats(wide.forward_batch(ints(&[4])).unwrap());
        assert_eq!(wide.hidden_state().batch_size(), Some(1));

        // row 0 on its own sees the same history
        narrow.forward_batch(ints(&[1])).unwrap();
        let expected = floats(narrow.forward_batch(ints(&[4])).unwrap());
        for (a, e) in continued.iter().zip(&expected) {
            assert!((a - e).abs() < 1e-5, "{continued:?} != {expected:?}");
        }

        let from_zeros = floats(fresh.forward_batch(ints(&[4])).unwrap());
        assert_ne!(continued, from_zeros);
    }

    #[test]
    fn test_wider_batch_starts_from_zeros() {
        let base  = tiny_state();
        let shape = ModelShape {
            mode: Mode::Training, batch_size: 2, seq_len: 1, stateful: true, dropout: 0.0,
        };
        let mut state = ModelState::from_parts(base.network().clone(), base.config().clone(), shape.clone());
        let mut fresh = ModelState::from_parts(base.network().clone(), base.config().clone(), shape);
        let device = Default::default();

        state.forward_batch(Tensor::<TestBackend, 2, Int>::from_ints([[1]], &device)).unwrap();
        let input = Tensor::<TestBackend, 2, Int>::from_ints([[4], [4]], &device);
        let after_narrow = state.forward_batch(input.clone()).unwrap().into_data().to_vec::<f32>().unwrap();
        let from_zeros   = fresh.forward_batch(input).unwrap().into_data().to_vec::<f32>().unwrap();
        assert_eq!(after_narrow, from_zeros);
        assert_eq!(state.hidden_state().batch_size(), Some(2));
    }
}
