// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits that define the core concepts
// of the system: encoded corpora, the character vocabulary,
// run options, the error taxonomy, and the seams (traits) the
// outer layers implement.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// An author's tweets as an immutable sequence of token ids
pub mod corpus;

// Character-level vocabulary used to encode and decode text
pub mod vocab;

// Training and sampling options with validation
pub mod options;

// Per-epoch metrics shared by the trainer and the CSV logger
pub mod metrics;

// Typed error taxonomy for the core
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
