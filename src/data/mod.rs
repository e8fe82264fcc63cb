// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between a manifest on disk and tensor batches:
//
//   train.jsonl
//       │  ManifestLoader   → Vec<EmotionRecord>
//       ▼
//   EmotionDataset        → decode images, encode transcripts,
//       │                   multi-hot labels
//       ▼
//   split_train_val       → optional seeded hold-out split
//       │
//       ▼
//   EmotionBatcher        → [N,H,W,3] / [N,max_len] / [N,classes]
//       │
//       ▼
//   DataLoader            → feeds the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads JSON-lines manifests
pub mod loader;

/// Image decoding and resizing
pub mod image_io;

/// Transcript cleaning, tokenisation and index encoding
pub mod preprocessor;

/// Burn Dataset over decoded samples
pub mod dataset;

/// Burn Batcher producing tensor batches
pub mod batcher;

/// Seeded train/validation split
pub mod splitter;
