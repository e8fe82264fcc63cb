// ============================================================
// Layer 3 — Core Traits
// ============================================================
// The application layer asks for records through this trait
// and never learns where they came from (JSON-lines manifest
// today; a CSV or a database tomorrow).

use anyhow::Result;

use crate::domain::record::EmotionRecord;

/// Anything that can produce the raw records of a dataset split.
pub trait RecordSource {
    fn load_all(&self) -> Result<Vec<EmotionRecord>>;
}
