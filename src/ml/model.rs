use burn::{
    nn::{
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
        Lstm, LstmConfig, LstmState,
    },
    prelude::*,
};

/// Recurrent state of one LSTM layer: `cell` and `hidden`, both
/// `[batch, hidden_size]`.
pub type LayerState<B> = LstmState<B, 2>;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct CharRnnConfig {
    pub vocab_size:    usize,
    #[config(default = 64)]
    pub embedding_dim: usize,
    #[config(default = 256)]
    pub hidden_size:   usize,
    #[config(default = 2)]
    pub num_layers:    usize,
    #[config(default = 0.0)]
    pub dropout:       f64,
}

impl CharRnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> CharRnn<B> {
        let embedding = EmbeddingConfig::new(self.vocab_size, self.embedding_dim).init(device);
        let layers: Vec<Lstm<B>> = (0..self.num_layers)
            .map(|i| {
                let d_input = if i == 0 { self.embedding_dim } else { self.hidden_size };
                LstmConfig::new(d_input, self.hidden_size, true).init(device)
            })
            .collect();
        let dropouts = (0..self.num_layers)
            .map(|_| DropoutConfig::new(self.dropout).init())
            .collect();
        let head = LinearConfig::new(self.hidden_size, self.vocab_size).init(device);
        CharRnn { embedding, layers, dropouts, head }
    }
}

/// embedding → [LSTM → dropout] × num_layers → linear head
#[derive(Module, Debug)]
pub struct CharRnn<B: Backend> {
    pub embedding: Embedding<B>,
    pub layers:    Vec<Lstm<B>>,
    pub dropouts:  Vec<Dropout>,
    pub head:      Linear<B>,
}

impl<B: Backend> CharRnn<B> {
    /// input_ids: [batch, seq_len] → logits: [batch, seq_len, vocab_size]
    ///
    /// `state` seeds each layer's recurrence; a missing entry starts
    /// that layer from zeros. The returned state is the one left
    /// after the last time step, one entry per layer.
    pub fn forward(
        &self,
        input_ids: Tensor<B, 2, Int>,
        state:     Option<Vec<LayerState<B>>>,
    ) -> (Tensor<B, 3>, Vec<LayerState<B>>) {
        let mut carried    = state.map(Vec::into_iter);
        let mut next_state = Vec::with_capacity(self.layers.len());

        let mut x = self.embedding.forward(input_ids);
        for (lstm, dropout) in self.layers.iter().zip(&self.dropouts) {
            let layer_state = carried.as_mut().and_then(Iterator::next);
            let (output, state) = lstm.forward(x, layer_state);
            next_state.push(state);
            x = dropout.forward(output);
        }

        (self.head.forward(x), next_state)
    }

    pub fn device(&self) -> B::Device {
        self.head.weight.val().device()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn tiny_config() -> CharRnnConfig {
        CharRnnConfig::new(7)
            .with_embedding_dim(4)
            .with_hidden_size(6)
            .with_num_layers(2)
    }

    #[test]
    fn test_forward_shapes() {
        let device = Default::default();
        let model  = tiny_config().init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 2, Int>::zeros([3, 5], &device);
        let (logits, state) = model.forward(input, None);

        assert_eq!(logits.dims(), [3, 5, 7]);
        assert_eq!(state.len(), 2);
        assert_eq!(state[0].hidden.dims(), [3, 6]);
        assert_eq!(state[1].cell.dims(),   [3, 6]);
    }

    #[test]
    fn test_layers_and_dropouts_pair_up() {
        let device = Default::default();
        let model  = tiny_config().with_num_layers(3).init::<TestBackend>(&device);
        assert_eq!(model.layers.len(), 3);
        assert_eq!(model.dropouts.len(), 3);
    }

    #[test]
    fn test_carried_state_changes_the_output() {
        let device = Default::default();
        let model  = tiny_config().init::<TestBackend>(&device);

        let first = Tensor::<TestBackend, 2, Int>::from_ints([[1, 2, 3]], &device);
        let (_, state) = model.forward(first, None);

        let next = Tensor::<TestBackend, 2, Int>::from_ints([[4]], &device);
        let (fresh, _)   = model.forward(next.clone(), None);
        let (carried, _) = model.forward(next, Some(state));

        let fresh: Vec<f32>   = fresh.into_data().to_vec().unwrap();
        let carried: Vec<f32> = carried.into_data().to_vec().unwrap();
        assert_ne!(fresh, carried);
    }
}
