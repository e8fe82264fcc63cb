// ============================================================
// Layer 3 — Emotion Record
// ============================================================
// One line of a dataset manifest, before any decoding:
//
//   {"image": "panels/0001.jpg",
//    "transcripts": ["WHAT?!", "no way..."],
//    "labels": ["surprise", "fear"]}
//
// A panel can hold several speech balloons; they are joined
// with a space to form the transcript the text tower reads.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionRecord {
    /// Image path; relative paths are resolved against the
    /// manifest's directory by the loader.
    pub image: PathBuf,

    #[serde(default)]
    pub transcripts: Vec<String>,

    #[serde(default)]
    pub labels: Vec<String>,
}

impl EmotionRecord {
    pub fn new(image: impl Into<PathBuf>, transcripts: Vec<String>, labels: Vec<String>) -> Self {
        Self { image: image.into(), transcripts, labels }
    }

    /// All balloons of the panel as one string.
    pub fn transcript(&self) -> String {
        self.transcripts.join(" ")
    }
}
