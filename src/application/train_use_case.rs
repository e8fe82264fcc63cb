// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the training manifest    (Layer 4 - data)
//   Step 2: Load the vocabulary           (Layer 6 - infra)
//   Step 3: Decode + encode samples       (Layer 4 - data)
//   Step 4: Pick the validation set       (Layer 4 - data)
//   Step 5: Prepare experiment dirs       (Layer 6 - infra)
//   Step 6: Save config                   (Layer 6 - infra)
//   Step 7: Run training loop             (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Result};
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    dataset::{EmotionDataset, SampleShape},
    loader::ManifestLoader,
    splitter::split_train_val,
};
use crate::domain::{emotion::Emotion, traits::RecordSource};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    vocab_store::VocabStore,
};
use crate::ml::{
    model::EmoRecModelConfig,
    text::TextShape,
    trainer::{run_training, RunArtifacts},
    vision::IMAGE_CHANNELS,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run. Serialised next to the
// checkpoints so the exact model can be rebuilt later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub experiment_name:      String,
    pub num_class:            usize,
    pub text_len:             usize,
    pub image_height:         usize,
    pub image_width:          usize,
    pub embedding_dim:        Option<usize>,
    pub batch_size:           usize,
    pub learning_rate:        f64,
    pub epochs:               usize,
    pub vocabs:               PathBuf,
    pub train_data:           PathBuf,
    pub validation_data:      Option<PathBuf>,
    pub val_fraction:         Option<f64>,
    pub logdir:               PathBuf,
    pub checkpoint_dir:       PathBuf,
    pub pretrained_embedding: Option<PathBuf>,
    pub saved_models:         PathBuf,
    pub seed:                 u64,
    pub text_hidden:          usize,
    pub backbone_width:       usize,
    pub backbone_weights:     Option<PathBuf>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            experiment_name:      "model".to_string(),
            num_class:            Emotion::COUNT,
            text_len:             128,
            image_height:         224,
            image_width:          224,
            embedding_dim:        None,
            batch_size:           16,
            learning_rate:        1e-3,
            epochs:               10,
            vocabs:               PathBuf::from("dataset/vocabs.json"),
            train_data:           PathBuf::from("dataset/train.jsonl"),
            validation_data:      None,
            val_fraction:         None,
            logdir:               PathBuf::from("logs"),
            checkpoint_dir:       PathBuf::from("checkpoints"),
            pretrained_embedding: None,
            saved_models:         PathBuf::from("saved_models"),
            seed:                 2021,
            text_hidden:          128,
            backbone_width:       64,
            backbone_weights:     None,
        }
    }
}

impl TrainConfig {
    /// The composite-model configuration this run trains.
    pub fn model_config(&self) -> EmoRecModelConfig {
        EmoRecModelConfig::new(
            [self.image_height, self.image_width, IMAGE_CHANNELS],
            TextShape::new(self.text_len),
            self.vocabs.clone(),
        )
        .with_embed_dim(self.embedding_dim)
        .with_pretrained_embed(self.pretrained_embedding.clone())
        .with_seed(self.seed)
        .with_text_hidden(self.text_hidden)
        .with_backbone_width(self.backbone_width)
        .with_backbone_weights(self.backbone_weights.clone())
    }

    pub fn sample_shape(&self) -> SampleShape {
        SampleShape { height: self.image_height, width: self.image_width, max_len: self.text_len }
    }

    fn validate(&self) -> Result<()> {
        if self.num_class != Emotion::COUNT {
            bail!(
                "num_class={} but the manifest labels have {} emotion classes",
                self.num_class,
                Emotion::COUNT
            );
        }
        if self.batch_size == 0 || self.epochs == 0 {
            bail!("batch_size and epochs must both be positive");
        }
        if let Some(f) = self.val_fraction {
            if !(0.0..1.0).contains(&f) {
                bail!("val_fraction must be in [0, 1), got {f}");
            }
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Load the manifest ─────────────────────────────────────────
        let records = ManifestLoader::new(&cfg.train_data).load_all()?;

        // ── Step 2: Load the vocabulary ───────────────────────────────────────
        let vocab = VocabStore::new(&cfg.vocabs).load()?;

        // ── Step 3: Build samples ─────────────────────────────────────────────
        let train = EmotionDataset::from_records(&records, &vocab, cfg.sample_shape());
        if train.is_empty() {
            bail!("No usable samples in '{}'", cfg.train_data.display());
        }

        // ── Step 4: Validation set ────────────────────────────────────────────
        // A separate manifest wins; otherwise an optional seeded hold-out.
        let (train, val) = match (&cfg.validation_data, cfg.val_fraction) {
            (Some(path), _) => {
                let records = ManifestLoader::new(path).load_all()?;
                let val = EmotionDataset::from_records(&records, &vocab, cfg.sample_shape());
                (train, Some(val))
            }
            (None, Some(fraction)) => {
                let (t, v) = split_train_val(train.into_samples(), 1.0 - fraction, cfg.seed);
                (EmotionDataset::new(t), Some(EmotionDataset::new(v)))
            }
            (None, None) => (train, None),
        };
        // An empty validation set would make val loss NaN every epoch.
        let val = val.filter(|v| !v.is_empty());
        tracing::info!(
            "Split: {} train, {} validation",
            train.len(),
            val.as_ref().map_or(0, |v| v.len())
        );

        // ── Step 5: Experiment directories ────────────────────────────────────
        let name = &cfg.experiment_name;
        let artifacts = RunArtifacts {
            checkpoints:  CheckpointManager::new(cfg.checkpoint_dir.join(name))?,
            saved_models: CheckpointManager::new(cfg.saved_models.join(name))?,
            metrics:      MetricsLogger::new(cfg.logdir.join(name))?,
        };

        // ── Step 6: Save config for rebuilding ────────────────────────────────
        artifacts.checkpoints.save_config(cfg)?;
        artifacts.saved_models.save_config(cfg)?;

        // ── Step 7: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, &cfg.model_config(), train, val, artifacts)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_cli() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.num_class, 8);
        assert_eq!(cfg.text_len, 128);
        assert_eq!(cfg.seed, 2021);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_model_config_carries_shapes() {
        let cfg = TrainConfig {
            image_height:  96,
            image_width:   64,
            text_len:      20,
            embedding_dim: Some(50),
            ..TrainConfig::default()
        };
        let model = cfg.model_config();
        assert_eq!(model.img_shape, [96, 64, 3]);
        assert_eq!(model.text_shape.max_len, 20);
        assert_eq!(model.embed_dim, Some(50));
        assert_eq!(model.seed, 2021);
        assert_eq!(model.backbone_width, 64);
    }

    #[test]
    fn test_rejects_bad_settings() {
        let wrong_classes = TrainConfig { num_class: 5, ..TrainConfig::default() };
        assert!(wrong_classes.validate().is_err());

        let bad_fraction = TrainConfig { val_fraction: Some(1.5), ..TrainConfig::default() };
        assert!(bad_fraction.validate().is_err());
    }

    #[test]
    fn test_config_json_roundtrip() {
        let cfg = TrainConfig { val_fraction: Some(0.2), ..TrainConfig::default() };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
