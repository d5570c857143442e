// ============================================================
// Layer 5 — Architecture Transformer
// ============================================================
// Switches a model between its two shapes:
//
//   Training  — batch_size × seq_len windows, stateful within an
//               epoch, dropout after every recurrent layer
//   Inference — one row, one step per call, state carried across
//               calls, no dropout
//
// The transform never edits the source. It builds a fresh
// network for the target shape, then copies every trainable
// layer across by position:
//
//   embedding → lstm.0 … lstm.N-1 → head
//
// Each layer's parameter count is compared with the freshly
// built layer first; any difference is a ShapeMismatch. The
// copied layers are clones of the source modules, so source and
// result share parameter ids and values. Dropout layers carry no
// parameters and come from the target shape.

use burn::prelude::*;

use crate::domain::error::CoreError;
use crate::domain::options::TrainingOptions;
use crate::ml::model::CharRnn;
use crate::ml::state::{Mode, ModelShape, ModelState};

/// Rebuild `source` for `mode`.
///
/// `options` supplies the training batch size, window length and
/// dropout (ignored for inference). `vocab_size` sizes the
/// embedding and output head of the target network.
pub fn transform<B: Backend>(
    source:     &ModelState<B>,
    mode:       Mode,
    options:    &TrainingOptions,
    vocab_size: usize,
) -> Result<ModelState<B>, CoreError> {
    if mode == Mode::Training {
        options.validate()?;
    }
    let shape = ModelShape::for_mode(mode, options);

    let mut config = source.config().clone();
    config.vocab_size = vocab_size;
    config.dropout    = shape.dropout;

    let mut target: CharRnn<B> = config.init(&source.device());
    copy_parameters(source.network(), &mut target)?;

    tracing::debug!(
        "Transformed model to {:?}: batch_size={}, seq_len={}, dropout={}, {} parameters",
        shape.mode,
        shape.batch_size,
        shape.seq_len,
        shape.dropout,
        target.num_params(),
    );

    Ok(ModelState::from_parts(target, config, shape))
}

fn copy_parameters<B: Backend>(source: &CharRnn<B>, target: &mut CharRnn<B>) -> Result<(), CoreError> {
    if source.layers.len() != target.layers.len() {
        return Err(CoreError::shape_mismatch(
            "lstm",
            format!("{} recurrent layers", target.layers.len()),
            source.layers.len(),
        ));
    }

    copy_layer("embedding", &source.embedding, &mut target.embedding)?;
    for (i, (src, dst)) in source.layers.iter().zip(target.layers.iter_mut()).enumerate() {
        copy_layer(&format!("lstm.{i}"), src, dst)?;
    }
    copy_layer("head", &source.head, &mut target.head)
}

fn copy_layer<B: Backend, M: Module<B>>(name: &str, source: &M, target: &mut M) -> Result<(), CoreError> {
    let expected = target.num_params();
    let found    = source.num_params();
    if expected != found {
        return Err(CoreError::shape_mismatch(
            name,
            format!("{expected} parameters"),
            format!("{found} parameters"),
        ));
    }
    *target = source.clone();
    Ok(())
}
