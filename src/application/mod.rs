// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// user action (train a model, generate tweets).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No UI or printing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Loaded model, downloaded corpus and the busy flag
pub mod session;

// The fine-tuning workflow
pub mod train_use_case;

// The text generation workflow
pub mod generate_use_case;
