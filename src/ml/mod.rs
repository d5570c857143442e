// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn framework specific code of the
// core. The domain and data-loading layers stay framework-free
// apart from the tensor batcher.
//
// What's in this layer:
//
//   backend.rs      — Backend aliases (NdArray, or Wgpu with
//                     the `wgpu` feature)
//
//   model.rs        — The character-level recurrent network:
//                     embedding → stacked LSTM (+ dropout)
//                     → linear vocabulary head
//
//   state.rs        — ModelState: network + immutable shape
//                     descriptor + explicit hidden-state handle
//
//   architecture.rs — Training ⇄ inference architecture
//                     transform with checked parameter copy
//
//   trainer.rs      — The fine-tuning loop (Adam, categorical
//                     cross-entropy, stateful epochs)
//
//   sampler.rs      — Top-N autoregressive text generation
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Hochreiter & Schmidhuber (1997) LSTM

/// Backend type aliases used by the CLI and application layer
pub mod backend;

/// Character-level LSTM architecture
pub mod model;

/// Model state, shape descriptor and hidden-state handle
pub mod state;

/// Mode switch between training and inference shapes
pub mod architecture;

/// Fine-tuning loop with per-epoch observer callbacks
pub mod trainer;

/// Autoregressive top-N sampler
pub mod sampler;
