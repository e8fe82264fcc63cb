// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one goal: train a classifier, build a vocabulary, or
// describe a model.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No direct file parsing (that's Layer 4 and 6)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// Vocabulary building from a manifest
pub mod vocab_use_case;

// Model construction + parameter / contract report
pub mod summary_use_case;
