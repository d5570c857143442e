// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from an author's raw tweet archive to the
// tensor batches the fine-tuner consumes:
//
//   <author>.txt       (one tweet per line)
//       │
//       ▼
//   TweetArchive      → reads the file, cleans each tweet
//       │
//       ▼
//   Preprocessor      → normalises whitespace, entities, quotes
//       │
//       ▼
//   CharVocab         → joins tweets with '\n', encodes to ids
//       │
//       ▼
//   split_corpus      → leading validation / trailing training
//       │
//       ▼
//   BatchGenerator    → contiguous (input, target) windows
//       │
//       ▼
//   TrainingBatcher   → stacks a MiniBatch into Burn tensors
//
// Reference: Burn Book §4 (Datasets and Batchers)
//            Rust Book §13 (Iterators and Closures)

/// Reads `<author>.txt` tweet archives from a directory
pub mod loader;

/// Cleans and normalises a single tweet
pub mod preprocessor;

/// Lazy, restartable mini-batch windows + tensor batcher
pub mod batcher;

/// Order-preserving train/validation corpus split
pub mod splitter;
