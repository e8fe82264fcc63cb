// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `build-vocab` and
// `summary`, and all their configurable flags.
//
// `summary` accepts the same model flags as `train`, so it
// describes exactly the model a training run would build, or
// with --from, the model a finished run left behind.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the emotion classifier on a JSON-lines manifest
    Train(TrainArgs),

    /// Build a vocabulary file from a manifest's transcripts
    BuildVocab(BuildVocabArgs),

    /// Build the model and print parameter counts and its I/O contract
    Summary(SummaryArgs),
}

/// Everything that determines the model's architecture.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Number of emotion classes
    #[arg(long, default_value_t = 8)]
    pub num_class: usize,

    /// Transcript length in tokens (padded / truncated)
    #[arg(long, default_value_t = 128)]
    pub text_len: usize,

    #[arg(long, default_value_t = 224)]
    pub image_height: usize,

    #[arg(long, default_value_t = 224)]
    pub image_width: usize,

    /// Word embedding width. Ignored (with a warning) when a
    /// pretrained embedding file is given; required otherwise.
    #[arg(long)]
    pub embedding_dim: Option<usize>,

    /// Vocabulary file (.json or .txt)
    #[arg(long, default_value = "dataset/vocabs.json")]
    pub vocabs: PathBuf,

    /// GloVe-style text file: `token v1 v2 ... vD` per line
    #[arg(long)]
    pub pretrained_embedding: Option<PathBuf>,

    /// Hidden units per LSTM direction
    #[arg(long, default_value_t = 128)]
    pub text_hidden: usize,

    /// Width of the first backbone stage (64 = ResNet-50)
    #[arg(long, default_value_t = 64)]
    pub backbone_width: usize,

    /// Burn record with pretrained vision backbone weights (frozen when given)
    #[arg(long)]
    pub backbone_weights: Option<PathBuf>,

    /// Seed for embedding initialisation, shuffling and splitting
    #[arg(long, default_value_t = 2021)]
    pub seed: u64,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Name of the run; used as sub-directory under every output dir
    #[arg(long, default_value = "model")]
    pub experiment_name: String,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 0.001)]
    pub learning_rate: f64,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Training manifest (JSON lines)
    #[arg(long, default_value = "dataset/train.jsonl")]
    pub train_data: PathBuf,

    /// Validation manifest (JSON lines)
    #[arg(long)]
    pub validation_data: Option<PathBuf>,

    /// Hold out this fraction of the training data when no
    /// validation manifest is given
    #[arg(long)]
    pub val_fraction: Option<f64>,

    /// Per-epoch metrics CSV goes under <logdir>/<experiment-name>
    #[arg(long, default_value = "logs")]
    pub logdir: PathBuf,

    /// Best-epoch checkpoint goes under <checkpoint-dir>/<experiment-name>
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Final model goes under <saved-models>/<experiment-name>
    #[arg(long, default_value = "saved_models")]
    pub saved_models: PathBuf,
}

#[derive(Args, Debug)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Experiment directory (checkpoints/<name> or saved_models/<name>)
    /// to rebuild and load instead of using the model flags
    #[arg(long)]
    pub from: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BuildVocabArgs {
    /// Manifest whose transcripts are tokenised
    #[arg(long, default_value = "dataset/train.jsonl")]
    pub data: PathBuf,

    /// Where to write the vocabulary (JSON)
    #[arg(long, default_value = "dataset/vocabs.json")]
    pub output: PathBuf,

    /// Keep at most this many of the most frequent tokens
    #[arg(long, default_value_t = 20000)]
    pub max_size: usize,
}

/// A model-only config: training fields keep their defaults.
impl From<ModelArgs> for TrainConfig {
    fn from(m: ModelArgs) -> Self {
        TrainConfig {
            num_class:            m.num_class,
            text_len:             m.text_len,
            image_height:         m.image_height,
            image_width:          m.image_width,
            embedding_dim:        m.embedding_dim,
            vocabs:               m.vocabs,
            pretrained_embedding: m.pretrained_embedding,
            text_hidden:          m.text_hidden,
            backbone_width:       m.backbone_width,
            backbone_weights:     m.backbone_weights,
            seed:                 m.seed,
            ..TrainConfig::default()
        }
    }
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            experiment_name: a.experiment_name,
            batch_size:      a.batch_size,
            learning_rate:   a.learning_rate,
            epochs:          a.epochs,
            train_data:      a.train_data,
            validation_data: a.validation_data,
            val_fraction:    a.val_fraction,
            logdir:          a.logdir,
            checkpoint_dir:  a.checkpoint_dir,
            saved_models:    a.saved_models,
            ..TrainConfig::from(a.model)
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults() {
        let cli = Cli::try_parse_from(["emorecom", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        assert_eq!(TrainConfig::from(args), TrainConfig::default());
    }

    #[test]
    fn test_train_flags() {
        let cli = Cli::try_parse_from([
            "emorecom", "train",
            "--experiment-name", "glove",
            "--text-len", "64",
            "--pretrained-embedding", "glove.6B.100d.txt",
            "--val-fraction", "0.1",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg = TrainConfig::from(args);
        assert_eq!(cfg.experiment_name, "glove");
        assert_eq!(cfg.text_len, 64);
        assert_eq!(cfg.pretrained_embedding, Some(PathBuf::from("glove.6B.100d.txt")));
        assert_eq!(cfg.val_fraction, Some(0.1));
        assert_eq!(cfg.epochs, 10);
    }

    #[test]
    fn test_summary_from_experiment() {
        let cli = Cli::try_parse_from(["emorecom", "summary", "--from", "checkpoints/glove"]).unwrap();
        let Commands::Summary(args) = cli.command else { panic!("expected summary") };
        assert_eq!(args.from, Some(PathBuf::from("checkpoints/glove")));

        let cli = Cli::try_parse_from(["emorecom", "summary", "--backbone-width", "16"]).unwrap();
        let Commands::Summary(args) = cli.command else { panic!("expected summary") };
        assert_eq!(args.from, None);
        assert_eq!(TrainConfig::from(args.model).backbone_width, 16);
    }

    #[test]
    fn test_build_vocab_flags() {
        let cli = Cli::try_parse_from(["emorecom", "build-vocab", "--max-size", "500"]).unwrap();
        let Commands::BuildVocab(args) = cli.command else { panic!("expected build-vocab") };
        assert_eq!(args.max_size, 500);
        assert_eq!(args.output, PathBuf::from("dataset/vocabs.json"));
    }
}
