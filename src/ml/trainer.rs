// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Drives an EmotionClassifier (towers + fusion head) through
// epochs of Adam updates on multi-label binary cross-entropy.
//
//   per epoch:
//     train batches   forward_loss → backward → Adam step
//     val batches     model.valid() (inner backend, no autodiff)
//     metrics         loss, binary accuracy, precision, recall,
//                     per-class AUC at the 0.5 threshold
//     checkpoint      best-only, monitored on val loss
//                     (train loss when there is no val set)
//   after the last epoch:
//     final weights → saved_models/<experiment>/model.mpk.gz
//
// train_loop is generic over the autodiff backend; the binary
// runs it on Autodiff<Wgpu>, the tests on Autodiff<NdArray>.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{activation::sigmoid, backend::AutodiffBackend},
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::EmotionBatcher,
    dataset::{EmotionDataset, SampleShape},
};
use crate::infra::{
    checkpoint::{CheckpointManager, FINAL_MODEL},
    metrics::{ClassCounts, ConfusionCounts, EpochMetrics, MetricsLogger},
};
use crate::ml::{head::EmotionClassifier, model::EmoRecModelConfig};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Loop hyperparameters, independent of where they came from.
#[derive(Debug, Clone)]
pub struct TrainerSettings {
    pub epochs:        usize,
    pub batch_size:    usize,
    pub learning_rate: f64,
    pub seed:          u64,
    pub shape:         SampleShape,
}

impl From<&TrainConfig> for TrainerSettings {
    fn from(cfg: &TrainConfig) -> Self {
        Self {
            epochs:        cfg.epochs,
            batch_size:    cfg.batch_size,
            learning_rate: cfg.learning_rate,
            seed:          cfg.seed,
            shape: SampleShape {
                height:  cfg.image_height,
                width:   cfg.image_width,
                max_len: cfg.text_len,
            },
        }
    }
}

/// Where a run writes its outputs.
pub struct RunArtifacts {
    pub checkpoints:  CheckpointManager,
    pub saved_models: CheckpointManager,
    pub metrics:      MetricsLogger,
}

pub fn run_training(
    cfg:       &TrainConfig,
    model_cfg: &EmoRecModelConfig,
    train:     EmotionDataset,
    val:       Option<EmotionDataset>,
    artifacts: RunArtifacts,
) -> Result<()> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);

    let towers = model_cfg.init::<MyBackend>(&device)?;
    let model = EmotionClassifier::new(towers, cfg.num_class, &device);
    tracing::info!("Classifier ready: {} parameters", model.num_params());

    train_loop(&TrainerSettings::from(cfg), model, train, val, &artifacts, device)?;
    Ok(())
}

pub fn train_loop<B: AutodiffBackend>(
    settings:  &TrainerSettings,
    mut model: EmotionClassifier<B>,
    train:     EmotionDataset,
    val:       Option<EmotionDataset>,
    artifacts: &RunArtifacts,
    device:    B::Device,
) -> Result<EmotionClassifier<B>> {
    let mut optim = AdamConfig::new().init();

    tracing::info!(
        "Training on {} samples, validating on {}",
        train.len(),
        val.as_ref().map_or(0, |v| v.len())
    );

    let train_loader = DataLoaderBuilder::new(EmotionBatcher::<B>::new(device.clone(), settings.shape))
        .batch_size(settings.batch_size)
        .shuffle(settings.seed)
        .num_workers(1)
        .build(train);

    let val_loader = val.map(|val| {
        DataLoaderBuilder::new(EmotionBatcher::<B::InnerBackend>::new(device.clone(), settings.shape))
            .batch_size(settings.batch_size)
            .num_workers(1)
            .build(val)
    });

    let mut best = f64::INFINITY;

    for epoch in 1..=settings.epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;
        let mut train_counts   = ClassCounts::default();

        for batch in train_loader.iter() {
            let (input, labels) = batch.into_parts();
            let (loss, logits) = model.forward_loss(input, labels.clone())?;

            train_loss_sum += loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;
            train_counts.add(&confusion(logits.detach(), labels));

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(settings.learning_rate, model, grads);
        }

        let train_loss = mean(train_loss_sum, train_batches);

        // ── Validation phase ──────────────────────────────────────────────────
        let (val_loss, counts) = match &val_loader {
            Some(loader) => {
                let model_valid = model.valid();
                let mut loss_sum = 0.0f64;
                let mut batches  = 0usize;
                let mut counts   = ClassCounts::default();

                for batch in loader.iter() {
                    let (input, labels) = batch.into_parts();
                    let (loss, logits) = model_valid.forward_loss(input, labels.clone())?;
                    loss_sum += loss.into_scalar().elem::<f64>();
                    batches  += 1;
                    counts.add(&confusion(logits, labels));
                }
                (mean(loss_sum, batches), counts)
            }
            None => (f64::NAN, train_counts),
        };

        let metrics = EpochMetrics { epoch, train_loss, val_loss, counts };
        artifacts.metrics.log(&metrics)?;

        let c = &metrics.counts;
        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | acc={:.1}% | precision={:.3} | recall={:.3} | auc={:.3}",
            epoch, settings.epochs, train_loss, val_loss,
            c.accuracy() * 100.0, c.precision(), c.recall(), c.auc(),
        );

        if metrics.is_improvement(best) {
            tracing::info!(
                "Monitored loss improved from {:.4} to {:.4}, saving checkpoint",
                best,
                metrics.monitored_loss()
            );
            best = metrics.monitored_loss();
            artifacts.checkpoints.save_best(&model, epoch)?;
        }
    }

    artifacts.saved_models.save_model(&model, FINAL_MODEL)?;
    tracing::info!(
        "Training complete! Final model in '{}', metrics in '{}'",
        artifacts.saved_models.dir().display(),
        artifacts.metrics.csv_path().display()
    );
    Ok(model)
}

fn mean(sum: f64, n: usize) -> f64 {
    if n > 0 { sum / n as f64 } else { f64::NAN }
}

/// Threshold logits at probability 0.5 and count, per class,
/// against multi-hot labels.
pub fn confusion<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 2, Int>) -> ClassCounts {
    let [rows, _] = logits.dims();
    let preds = sigmoid(logits).greater_equal_elem(0.5).float();
    let targets = labels.float();

    // column sums → one count per class
    let per_class = |t: Tensor<B, 2>| -> Vec<u64> {
        t.sum_dim(0).into_data().iter::<f32>().map(|v| v.round() as u64).collect()
    };
    let true_pos  = per_class(preds.clone() * targets.clone());
    let predicted = per_class(preds);
    let actual    = per_class(targets);

    let classes = true_pos
        .iter()
        .zip(predicted.iter().zip(&actual))
        .map(|(&tp, (&pred, &act))| {
            let false_pos = pred - tp;
            let false_neg = act - tp;
            ConfusionCounts {
                true_pos: tp,
                false_pos,
                false_neg,
                true_neg: rows as u64 - tp - false_pos - false_neg,
            }
        })
        .collect();

    ClassCounts::new(classes)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::EmotionSample;
    use crate::ml::text::TextShape;
    use burn::backend::{Autodiff, NdArray};
    use std::fs;

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn test_confusion_counts() {
        let device = Default::default();
        let logits = Tensor::<NdArray, 2>::from_data(
            TensorData::new(vec![5.0f32, -5.0, 5.0, -5.0], [2, 2]),
            &device,
        );
        let labels = Tensor::<NdArray, 2, Int>::from_data(
            TensorData::new(vec![1i64, 1, 0, 0], [2, 2]),
            &device,
        );
        let c = confusion(logits, labels);
        // class 0: predicted for both rows, true for the first
        // class 1: predicted for neither, true for the first
        assert_eq!(
            c.classes(),
            &[
                ConfusionCounts { true_pos: 1, false_pos: 1, false_neg: 0, true_neg: 0 },
                ConfusionCounts { true_pos: 0, false_pos: 0, false_neg: 1, true_neg: 1 },
            ]
        );
        assert_eq!(c.pooled(), ConfusionCounts { true_pos: 1, false_pos: 1, false_neg: 1, true_neg: 1 });
        // class 0: tpr 1, fpr 1 → 0.5; class 1: tpr 0, fpr 0 → 0.5
        assert_eq!(c.auc(), 0.5);
    }

    fn sample(label: usize) -> EmotionSample {
        let mut labels = vec![0u8; 8];
        labels[label] = 1;
        EmotionSample {
            image:      vec![(label * 30) as u8; 32 * 32 * 3],
            transcript: vec![1, 2, 0, 0],
            labels,
        }
    }

    #[test]
    fn test_tiny_run_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let vocabs = dir.path().join("vocabs.json");
        fs::write(&vocabs, r#"{"hello": 0, "world": 1}"#).unwrap();

        let device = Default::default();
        let towers = EmoRecModelConfig::new([32, 32, 3], TextShape::new(4), vocabs)
            .with_embed_dim(Some(4))
            .with_text_hidden(2)
            .with_backbone_blocks([1, 1, 1, 1])
            .with_backbone_width(1)
            .init::<TestBackend>(&device)
            .unwrap();
        let model = EmotionClassifier::new(towers, 8, &device);

        let artifacts = RunArtifacts {
            checkpoints:  CheckpointManager::new(dir.path().join("ckpt")).unwrap(),
            saved_models: CheckpointManager::new(dir.path().join("saved")).unwrap(),
            metrics:      MetricsLogger::new(dir.path().join("logs")).unwrap(),
        };
        let settings = TrainerSettings {
            epochs:        2,
            batch_size:    2,
            learning_rate: 1e-3,
            seed:          1,
            shape:         SampleShape { height: 32, width: 32, max_len: 4 },
        };

        let train = EmotionDataset::new(vec![sample(0), sample(3), sample(3)]);
        let val = EmotionDataset::new(vec![sample(0)]);
        train_loop(&settings, model, train, Some(val), &artifacts, device).unwrap();

        let csv = fs::read_to_string(artifacts.metrics.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.lines().all(|l| l.split(',').count() == 7));
        assert!(csv.starts_with("epoch,train_loss,val_loss,accuracy,precision,recall,auc"));
        assert!(artifacts.checkpoints.best_epoch().unwrap() >= 1);
        assert!(dir.path().join("ckpt").join("best_model.mpk.gz").exists());
        assert!(dir.path().join("saved").join("model.mpk.gz").exists());
    }
}
