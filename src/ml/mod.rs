// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model code lives here. Bottom-up:
//
//   embedding.rs — vocabulary + optional pretrained vectors
//                  → (vocab+1, D) matrix, row 0 = padding/OOV,
//                  wrapped in a masking embedding layer
//   lstm.rs      — masked LSTM and its bidirectional pairing
//   text.rs      — Text Tower: embedding → BiLSTM (all steps)
//   vision.rs    — Vision Tower: ResNet bottleneck backbone
//   model.rs     — Model Composer: both towers side by side,
//                  with the input/output contract
//   head.rs      — fusion head + the trainable classifier pair
//   trainer.rs   — epoch loop, metrics, best-only checkpoints
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)

/// Embedding matrix construction and masked lookup
pub mod embedding;

/// Masked (bidirectional) LSTM
pub mod lstm;

/// Text tower
pub mod text;

/// Vision tower
pub mod vision;

/// Two-tower composite model
pub mod model;

/// Classification head attached by the training driver
pub mod head;

/// Training loop with validation and checkpointing
pub mod trainer;
