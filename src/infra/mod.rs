// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Concerns used by several layers that belong to none of them:
//
//   checkpoint.rs — Model persistence
//                   The ModelStore trait and its filesystem
//                   implementation: weights via Burn's
//                   CompactRecorder, architecture config and
//                   vocabulary as JSON, one directory per
//                   named model.
//
//   metrics.rs    — Training metrics logging
//                   An EpochObserver that appends every
//                   epoch's losses to a CSV file.
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Named model saving, loading and listing
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
