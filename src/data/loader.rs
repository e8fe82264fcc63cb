// ============================================================
// Layer 4 — Manifest Loader
// ============================================================
// Reads a JSON-lines manifest, one EmotionRecord per line.
//
//   dataset/
//     train.jsonl          ← the manifest
//     panels/0001.jpg      ← "image": "panels/0001.jpg"
//
// Relative image paths are resolved against the manifest's
// own directory so a dataset folder can be moved as a whole.
//
// A malformed line fails the whole load (with its line
// number). Missing image files are not checked here; the
// dataset builder skips those with a warning.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::record::EmotionRecord;
use crate::domain::traits::RecordSource;

pub struct ManifestLoader {
    path: PathBuf,
}

impl ManifestLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn base_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

impl RecordSource for ManifestLoader {
    fn load_all(&self) -> Result<Vec<EmotionRecord>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read manifest '{}'", self.path.display()))?;

        let mut records = Vec::new();
        for (n, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut record: EmotionRecord = serde_json::from_str(line).with_context(|| {
                format!("Bad record at '{}' line {}", self.path.display(), n + 1)
            })?;
            if record.image.is_relative() {
                record.image = self.base_dir().join(&record.image);
            }
            records.push(record);
        }

        tracing::info!("Read {} records from '{}'", records.len(), self.path.display());
        Ok(records)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_relative_images() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("train.jsonl");
        fs::write(
            &manifest,
            "{\"image\": \"panels/1.png\", \"transcripts\": [\"hi\"], \"labels\": [\"happy\"]}\n\n\
             {\"image\": \"/abs/2.png\"}\n",
        )
        .unwrap();

        let records = ManifestLoader::new(&manifest).load_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].image, dir.path().join("panels/1.png"));
        assert_eq!(records[0].labels, vec!["happy"]);
        assert_eq!(records[1].image, PathBuf::from("/abs/2.png"));
    }

    #[test]
    fn test_bad_line_reports_position() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("train.jsonl");
        fs::write(&manifest, "{\"image\": \"a.png\"}\nnot json\n").unwrap();

        let err = ManifestLoader::new(&manifest).load_all().unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_missing_manifest() {
        assert!(ManifestLoader::new("/no/such/train.jsonl").load_all().is_err());
    }
}
