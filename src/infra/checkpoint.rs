// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores classifier weights using Burn's
// CompactRecorder (MessagePack + gzip, half precision).
//
// Layout of one experiment directory:
//
//   checkpoints/<experiment>/
//     best_model.mpk.gz     ← weights of the best epoch so far
//     best_epoch.json       ← which epoch that was
//     train_config.json     ← everything needed to rebuild it
//
//   saved_models/<experiment>/
//     model.mpk.gz          ← weights after the last epoch
//     train_config.json
//
// Only the best epoch is kept: a new checkpoint overwrites the
// previous one when the monitored loss improves.
//
// Loading needs a freshly built model of the same architecture
// (rebuilt from train_config.json); the record is then loaded
// into it and fails if the shapes do not match.

use anyhow::{bail, Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::CompactRecorder,
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::head::EmotionClassifier;

pub const BEST_MODEL: &str = "best_model";
pub const FINAL_MODEL: &str = "model";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Attach to a directory a previous run wrote; it must exist.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            bail!("No experiment directory at '{}'", dir.display());
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `model` as `<dir>/<name>.mpk.gz`.
    pub fn save_model<B: Backend>(&self, model: &EmotionClassifier<B>, name: &str) -> Result<()> {
        let path = self.dir.join(name);
        model
            .clone()
            .save_file(path.clone(), &CompactRecorder::new())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }

    /// Save the best-so-far weights and remember their epoch.
    pub fn save_best<B: Backend>(&self, model: &EmotionClassifier<B>, epoch: usize) -> Result<()> {
        self.save_model(model, BEST_MODEL)?;
        fs::write(self.dir.join("best_epoch.json"), serde_json::to_string(&epoch)?)
            .with_context(|| "Failed to write best_epoch.json")?;
        Ok(())
    }

    /// Load `<dir>/<name>.mpk.gz` into a model of matching architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:  EmotionClassifier<B>,
        name:   &str,
        device: &B::Device,
    ) -> Result<EmotionClassifier<B>> {
        let path = self.dir.join(name);
        model
            .load_file(path.clone(), &CompactRecorder::new(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))
    }

    pub fn best_epoch(&self) -> Result<usize> {
        let path = self.dir.join("best_epoch.json");
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'. Has training run?", path.display()))?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}
