// ============================================================
// Layer 2 — SummaryUseCase
// ============================================================
// Builds the composite model and reports what came out:
//
//   - parameter counts per tower (and the head the trainer adds)
//   - the named input / output contract
//   - with an experiment directory: which weights were loaded
//
// Two sources:
//   Config(cfg)        — exactly the model `train` would build
//   Experiment(dir)    — rebuilt from dir/train_config.json, then
//                        the best checkpoint (or the final model
//                        when no best epoch was recorded) loaded
//
// Runs on the CPU backend; nothing is trained or written.

use anyhow::Result;
use burn::{backend::NdArray, module::Module};
use std::{fmt, path::PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::infra::checkpoint::{CheckpointManager, BEST_MODEL, FINAL_MODEL};
use crate::ml::{head::EmotionClassifier, model::ModelContract};

type SummaryBackend = NdArray;

/// Where the loaded weights came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedWeights {
    /// `best_model`, written at this epoch
    Best { dir: PathBuf, epoch: usize },
    /// `model`, written after the last epoch
    Final { dir: PathBuf },
}

#[derive(Debug, Clone)]
pub struct ModelSummary {
    pub vision_params: usize,
    pub text_params:   usize,
    pub head_params:   usize,
    pub contract:      ModelContract,
    pub weights:       Option<LoadedWeights>,
}

impl ModelSummary {
    pub fn total(&self) -> usize {
        self.vision_params + self.text_params + self.head_params
    }
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.weights {
            Some(LoadedWeights::Best { dir, epoch }) => {
                writeln!(f, "Weights      : best checkpoint (epoch {epoch}) from '{}'", dir.display())?
            }
            Some(LoadedWeights::Final { dir }) => {
                writeln!(f, "Weights      : final model from '{}'", dir.display())?
            }
            None => writeln!(f, "Weights      : freshly initialised")?,
        }
        writeln!(f, "Vision tower : {:>12} parameters", self.vision_params)?;
        writeln!(f, "Text tower   : {:>12} parameters", self.text_params)?;
        writeln!(f, "Fusion head  : {:>12} parameters", self.head_params)?;
        writeln!(f, "Total        : {:>12} parameters", self.total())?;
        writeln!(f)?;
        write!(f, "{}", self.contract)
    }
}

enum Source {
    Config(TrainConfig),
    Experiment(PathBuf),
}

pub struct SummaryUseCase {
    source: Source,
}

impl SummaryUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { source: Source::Config(config) }
    }

    pub fn from_experiment(dir: impl Into<PathBuf>) -> Self {
        Self { source: Source::Experiment(dir.into()) }
    }

    pub fn execute(&self) -> Result<ModelSummary> {
        let device = Default::default();

        let (model, weights) = match &self.source {
            Source::Config(cfg) => (build(cfg, &device)?, None),
            Source::Experiment(dir) => {
                let ckpt = CheckpointManager::open(dir)?;
                let cfg = ckpt.load_config()?;
                let fresh = build(&cfg, &device)?;

                let (name, weights) = match ckpt.best_epoch() {
                    Ok(epoch) => (BEST_MODEL, LoadedWeights::Best { dir: dir.clone(), epoch }),
                    Err(_)    => (FINAL_MODEL, LoadedWeights::Final { dir: dir.clone() }),
                };
                let model = ckpt.load_model(fresh, name, &device)?;
                tracing::info!("Loaded '{}' from '{}'", name, dir.display());
                (model, Some(weights))
            }
        };

        Ok(ModelSummary {
            vision_params: model.towers.vision.num_params(),
            text_params:   model.towers.text.num_params(),
            head_params:   model.head.num_params(),
            contract:      model.towers.contract(),
            weights,
        })
    }
}

fn build(
    cfg:    &TrainConfig,
    device: &<SummaryBackend as burn::tensor::backend::Backend>::Device,
) -> Result<EmotionClassifier<SummaryBackend>> {
    let towers = cfg.model_config().init::<SummaryBackend>(device)?;
    Ok(EmotionClassifier::new(towers, cfg.num_class, device))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, path::Path};

    fn tiny_config(dir: &Path) -> TrainConfig {
        let vocabs = dir.join("vocabs.json");
        fs::write(&vocabs, r#"{"hello": 0, "world": 1}"#).unwrap();
        TrainConfig {
            vocabs,
            image_height:   32,
            image_width:    32,
            text_len:       4,
            embedding_dim:  Some(4),
            text_hidden:    2,
            backbone_width: 1,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_summary_counts_text_tower() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig { backbone_width: 64, ..tiny_config(dir.path()) };
        let summary = SummaryUseCase::new(cfg).execute().unwrap();

        // embedding 3×4, two LSTMs of (4·4·2 + 4·2 + 2·4·2) each
        assert_eq!(summary.text_params, 12 + 2 * (32 + 8 + 16));
        // head: (2048 + 4) inputs → 8 logits, plus bias
        assert_eq!(summary.head_params, 2052 * 8 + 8);
        assert!(summary.vision_params > 20_000_000);
        assert_eq!(summary.contract.outputs[0].shape, vec![1, 1, 2048]);
        assert_eq!(summary.weights, None);

        let printed = summary.to_string();
        assert!(printed.contains("transcripts"));
        assert!(printed.contains("freshly initialised"));
    }

    #[test]
    fn test_summary_loads_best_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_config(dir.path());
        let run = dir.path().join("checkpoints").join("model");

        let ckpt = CheckpointManager::new(&run).unwrap();
        ckpt.save_config(&cfg).unwrap();
        let trained = build(&cfg, &Default::default()).unwrap();
        ckpt.save_best(&trained, 2).unwrap();

        let summary = SummaryUseCase::from_experiment(&run).execute().unwrap();
        assert_eq!(summary.weights, Some(LoadedWeights::Best { dir: run.clone(), epoch: 2 }));
        assert_eq!(summary.head_params, trained.head.num_params());
        assert_eq!(summary.contract.outputs[0].shape, vec![1, 1, 32]);
        assert!(summary.to_string().contains("epoch 2"));
    }

    #[test]
    fn test_summary_falls_back_to_final_model() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_config(dir.path());
        let run = dir.path().join("saved_models").join("model");

        let saved = CheckpointManager::new(&run).unwrap();
        saved.save_config(&cfg).unwrap();
        saved.save_model(&build(&cfg, &Default::default()).unwrap(), FINAL_MODEL).unwrap();

        let summary = SummaryUseCase::from_experiment(&run).execute().unwrap();
        assert_eq!(summary.weights, Some(LoadedWeights::Final { dir: run }));
    }

    #[test]
    fn test_summary_of_missing_experiment_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SummaryUseCase::from_experiment(dir.path().join("nope")).execute().is_err());

        // directory exists but holds no config
        assert!(SummaryUseCase::from_experiment(dir.path()).execute().is_err());
    }
}
