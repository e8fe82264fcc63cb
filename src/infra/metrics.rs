// ============================================================
// Layer 6 — Metrics
// ============================================================
// Multi-label classification metrics at a fixed 0.5 threshold.
// Counts are kept per class; the first three metrics pool them
// over every (sample, class) cell:
//
//   binary accuracy = (tp + tn) / cells
//   precision       = tp / (tp + fp)
//   recall          = tp / (tp + fn)
//
// AUC is per class, then averaged over classes. With a single
// threshold the ROC curve has one interior point, so each
// class's AUC is the trapezoid area under
//
//   (0, 0) → (fpr, tpr) → (1, 1)   =   (1 + tpr - fpr) / 2
//
// Counts are accumulated batch by batch and only turned into
// ratios at the end of an epoch, so small last batches are not
// over-weighted.
//
// One CSV row per epoch goes to <logdir>/<experiment>/metrics.csv:
//
//   epoch,train_loss,val_loss,accuracy,precision,recall,auc
//   1,0.412331,0.398210,0.861500,0.512000,0.204000,0.583100

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// Confusion counts over a set of (sample, class) cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_pos:  u64,
    pub false_pos: u64,
    pub false_neg: u64,
    pub true_neg:  u64,
}

impl ConfusionCounts {
    pub fn add(&mut self, other: ConfusionCounts) {
        self.true_pos  += other.true_pos;
        self.false_pos += other.false_pos;
        self.false_neg += other.false_neg;
        self.true_neg  += other.true_neg;
    }

    pub fn total(&self) -> u64 {
        self.true_pos + self.false_pos + self.false_neg + self.true_neg
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_pos + self.true_neg, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_pos, self.true_pos + self.false_pos)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_pos, self.true_pos + self.false_neg)
    }

    pub fn false_positive_rate(&self) -> f64 {
        ratio(self.false_pos, self.false_pos + self.true_neg)
    }

    /// Area under the one-threshold ROC curve.
    pub fn auc(&self) -> f64 {
        (1.0 + self.recall() - self.false_positive_rate()) / 2.0
    }
}

/// One `ConfusionCounts` per class, in label order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassCounts {
    classes: Vec<ConfusionCounts>,
}

impl ClassCounts {
    pub fn new(classes: Vec<ConfusionCounts>) -> Self {
        Self { classes }
    }

    pub fn classes(&self) -> &[ConfusionCounts] {
        &self.classes
    }

    /// Accumulate another batch. An empty accumulator takes the
    /// other's class count.
    pub fn add(&mut self, other: &ClassCounts) {
        if self.classes.is_empty() {
            self.classes = vec![ConfusionCounts::default(); other.classes.len()];
        }
        for (mine, theirs) in self.classes.iter_mut().zip(&other.classes) {
            mine.add(*theirs);
        }
    }

    /// All classes pooled together.
    pub fn pooled(&self) -> ConfusionCounts {
        let mut total = ConfusionCounts::default();
        for c in &self.classes {
            total.add(*c);
        }
        total
    }

    pub fn accuracy(&self) -> f64 {
        self.pooled().accuracy()
    }

    pub fn precision(&self) -> f64 {
        self.pooled().precision()
    }

    pub fn recall(&self) -> f64 {
        self.pooled().recall()
    }

    /// Mean of the per-class AUCs.
    pub fn auc(&self) -> f64 {
        if self.classes.is_empty() {
            return 0.0;
        }
        self.classes.iter().map(ConfusionCounts::auc).sum::<f64>() / self.classes.len() as f64
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// One row of metrics data for a single training epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:      usize,
    pub train_loss: f64,
    /// NaN when the run has no validation set.
    pub val_loss:   f64,
    /// Validation counts when available, training counts otherwise.
    pub counts:     ClassCounts,
}

impl EpochMetrics {
    /// The loss used to decide whether this epoch is the best so far.
    pub fn monitored_loss(&self) -> f64 {
        if self.val_loss.is_nan() { self.train_loss } else { self.val_loss }
    }

    /// Returns true if this epoch improved over the previous best.
    pub fn is_improvement(&self, best: f64) -> bool {
        self.monitored_loss() < best
    }
}

/// Appends epoch metrics to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,val_loss,accuracy,precision,recall,auc")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.val_loss,
            m.counts.accuracy(),
            m.counts.precision(),
            m.counts.recall(),
            m.counts.auc(),
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
