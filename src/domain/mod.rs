// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types for the things the system talks about:
// emotion classes, raw dataset records, and the traits the
// data layer implements.
//
// Rules for this layer:
//   - NO Burn types
//   - NO file I/O
//   - Only structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

/// The fixed set of emotion classes and multi-hot encoding
pub mod emotion;

/// One raw (image, transcript, labels) record from a manifest
pub mod record;

/// Abstractions implemented by the data layer
pub mod traits;
