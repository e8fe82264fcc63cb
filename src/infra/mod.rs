// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File formats and persistence used by more than one layer:
//
//   vocab_store.rs  — vocabulary files (.json / .txt), and the
//                     frequency-based builder behind `build-vocab`
//
//   pretrained.rs   — GloVe-style pretrained vector files
//
//   checkpoint.rs   — best-epoch weights via Burn's
//                     CompactRecorder, the run's TrainConfig as
//                     JSON, and the final saved model
//
//   metrics.rs      — multi-label confusion counts and the
//                     per-epoch CSV log
//
// Reference: Burn Book §5 (Records and Checkpointing)

/// Vocabulary loading and building
pub mod vocab_store;

/// Pretrained word-vector parsing
pub mod pretrained;

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Classification metrics and CSV logger
pub mod metrics;
