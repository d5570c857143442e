// ============================================================
// Layer 4 — Batch Generator + Tensor Batcher
// ============================================================
// Turns a flat EncodedCorpus into (input, target) mini-batches.
//
// Windowing:
//   The corpus is cut into contiguous, non-overlapping windows
//   of `seq_len` tokens. Window i reads
//
//     input  = corpus[i*seq_len     .. i*seq_len + seq_len]
//     target = corpus[i*seq_len + 1 .. i*seq_len + seq_len + 1]
//
//   A window whose target slice would run past the end of the
//   corpus is dropped, never padded. That leaves
//   floor((len - 1) / seq_len) windows.
//
// Batching:
//   The training model is stateful: row r of batch i+1 starts
//   from the state row r of batch i ended with. So each row
//   reads its own contiguous run of windows, one per batch:
//
//     W windows, N = ceil(W / batch_size) batches
//     row r of batch i = window start(r) + i
//
//   The first `full` rows get N windows and the rest N - 1,
//   where full = W - (N - 1) * batch_size. Only the last batch
//   may be short, and it keeps rows 0..full. No shuffling.
//
// The generator is lazy and restartable. Every call to
// `iter()` starts a fresh pass that yields the same batches.
//
// Reference: Burn Book §4 (Batcher)
//            Rust Book §13 (Iterators)

use burn::prelude::*;

use crate::domain::corpus::EncodedCorpus;
use crate::domain::error::CoreError;
use crate::domain::options::TrainingOptions;

// ─── BatchOptions ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub batch_size:     usize,
    pub seq_len:        usize,
    pub one_hot_labels: bool,
    /// Width of one-hot target rows; also bounds every token id
    pub vocab_size:     usize,
}

impl BatchOptions {
    pub fn from_training(options: &TrainingOptions, vocab_size: usize) -> Self {
        Self {
            batch_size:     options.batch_size,
            seq_len:        options.seq_len,
            one_hot_labels: options.one_hot_labels,
            vocab_size,
        }
    }
}

// ─── MiniBatch ────────────────────────────────────────────────────────────────
/// Targets of a mini-batch, in the encoding the loss expects.
#[derive(Debug, Clone, PartialEq)]
pub enum Targets {
    /// Raw ids, row-major `[rows, seq_len]`
    Ids(Vec<u32>),
    /// One-hot rows, row-major `[rows, seq_len, vocab_size]`
    OneHot { vocab_size: usize, values: Vec<f32> },
}

impl Targets {
    fn one_hot(ids: &[u32], vocab_size: usize) -> Self {
        let mut values = vec![0.0f32; ids.len() * vocab_size];
        for (i, &id) in ids.iter().enumerate() {
            values[i * vocab_size + id as usize] = 1.0;
        }
        Self::OneHot { vocab_size, values }
    }

    /// Target ids regardless of encoding.
    pub fn ids(&self) -> Vec<u32> {
        match self {
            Self::Ids(ids) => ids.clone(),
            Self::OneHot { vocab_size, values } => values
                .chunks(*vocab_size)
                .map(|row| row.iter().position(|&v| v == 1.0).unwrap_or(0) as u32)
                .collect(),
        }
    }
}

/// A rectangular block of `rows` windows.
#[derive(Debug, Clone, PartialEq)]
pub struct MiniBatch {
    pub rows:    usize,
    pub seq_len: usize,
    /// Row-major `[rows, seq_len]`
    pub inputs:  Vec<u32>,
    pub targets: Targets,
}

impl MiniBatch {
    pub fn input_row(&self, row: usize) -> &[u32] {
        &self.inputs[row * self.seq_len..(row + 1) * self.seq_len]
    }
}

// ─── BatchGenerator ───────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct BatchGenerator<'a> {
    corpus:  &'a EncodedCorpus,
    options: BatchOptions,
}

impl<'a> BatchGenerator<'a> {
    /// Fails with `InvalidConfig` on zero sizes or when a token id
    /// does not fit the vocabulary.
    pub fn new(corpus: &'a EncodedCorpus, options: BatchOptions) -> Result<Self, CoreError> {
        if options.batch_size == 0 || options.seq_len == 0 {
            return Err(CoreError::InvalidConfig(
                "batch_size and seq_len must be > 0".into(),
            ));
        }
        if let Some(max) = corpus.max_token() {
            if max as usize >= options.vocab_size {
                return Err(CoreError::InvalidConfig(format!(
                    "token id {max} outside a vocabulary of {}",
                    options.vocab_size
                )));
            }
        }
        Ok(Self { corpus, options })
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    pub fn num_windows(&self) -> usize {
        self.corpus.len().saturating_sub(1) / self.options.seq_len
    }

    pub fn num_batches(&self) -> usize {
        self.num_windows().div_ceil(self.options.batch_size)
    }

    /// Start a fresh pass over the corpus.
    pub fn iter(&self) -> BatchIter<'a> {
        let num_batches = self.num_batches();
        let full_rows   = self.num_windows() - num_batches.saturating_sub(1) * self.options.batch_size;
        BatchIter {
            tokens:     self.corpus.tokens(),
            options:    self.options,
            next_batch: 0,
            num_batches,
            full_rows,
        }
    }
}

impl<'a> IntoIterator for &BatchGenerator<'a> {
    type Item     = MiniBatch;
    type IntoIter = BatchIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct BatchIter<'a> {
    tokens:      &'a [u32],
    options:     BatchOptions,
    next_batch:  usize,
    num_batches: usize,
    /// Rows that own a window in every batch, the last included
    full_rows:   usize,
}

impl BatchIter<'_> {
    /// Index of the first window of `row`'s run.
    fn run_start(&self, row: usize) -> usize {
        row * self.num_batches - row.saturating_sub(self.full_rows)
    }
}

impl Iterator for BatchIter<'_> {
    type Item = MiniBatch;

    fn next(&mut self) -> Option<MiniBatch> {
        if self.next_batch >= self.num_batches {
            return None;
        }
        let BatchOptions { batch_size, seq_len, one_hot_labels, vocab_size } = self.options;

        let batch = self.next_batch;
        self.next_batch += 1;

        let rows = if self.next_batch == self.num_batches { self.full_rows } else { batch_size };
        let mut inputs     = Vec::with_capacity(rows * seq_len);
        let mut target_ids = Vec::with_capacity(rows * seq_len);
        for row in 0..rows {
            let start = (self.run_start(row) + batch) * seq_len;
            inputs.extend_from_slice(&self.tokens[start..start + seq_len]);
            target_ids.extend_from_slice(&self.tokens[start + 1..start + seq_len + 1]);
        }

        let targets = if one_hot_labels {
            Targets::one_hot(&target_ids, vocab_size)
        } else {
            Targets::Ids(target_ids)
        };

        Some(MiniBatch { rows, seq_len, inputs, targets })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.num_batches - self.next_batch;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BatchIter<'_> {}

// ─── TrainingBatch ────────────────────────────────────────────────────────────
/// Target tensor matching the loss the fine-tuner applies.
#[derive(Debug, Clone)]
pub enum TargetTensor<B: Backend> {
    /// `[rows, seq_len]`
    Ids(Tensor<B, 2, Int>),
    /// `[rows, seq_len, vocab_size]`
    OneHot(Tensor<B, 3>),
}

/// A MiniBatch on the device.
#[derive(Debug, Clone)]
pub struct TrainingBatch<B: Backend> {
    /// `[rows, seq_len]`
    pub inputs:  Tensor<B, 2, Int>,
    pub targets: TargetTensor<B>,
}

// ─── TrainingBatcher ──────────────────────────────────────────────────────────
/// Holds the target device so tensors are created on the
/// correct GPU/CPU.
#[derive(Clone, Debug)]
pub struct TrainingBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> TrainingBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Stack a MiniBatch into tensors.
    /// Burn Int tensors are built from i32, so ids are converted.
    pub fn batch(&self, mini: &MiniBatch) -> TrainingBatch<B> {
        let shape = [mini.rows, mini.seq_len];

        let input_flat: Vec<i32> = mini.inputs.iter().map(|&x| x as i32).collect();
        let inputs = Tensor::<B, 1, Int>::from_ints(input_flat.as_slice(), &self.device)
            .reshape(shape);

        let targets = match &mini.targets {
            Targets::Ids(ids) => {
                let flat: Vec<i32> = ids.iter().map(|&x| x as i32).collect();
                TargetTensor::Ids(
                    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).reshape(shape),
                )
            }
            Targets::OneHot { vocab_size, values } => TargetTensor::OneHot(
                Tensor::<B, 1>::from_floats(values.as_slice(), &self.device)
                    .reshape([mini.rows, mini.seq_len, *vocab_size]),
            ),
        };

        TrainingBatch { inputs, targets }
    }
}
