// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All work is delegated to Layer 2 (application).
//
//   1. `train`       — train the classifier on a manifest
//   2. `build-vocab` — build a vocabulary from transcripts
//   3. `summary`     — describe the model a run would build
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{BuildVocabArgs, Commands, SummaryArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "emorecom",
    version = "0.1.0",
    about = "Train a multimodal (image + transcript) emotion classifier."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route to the matching use case; nothing is computed here.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)      => run_train(args),
            Commands::BuildVocab(args) => run_build_vocab(args),
            Commands::Summary(args)    => run_summary(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}'", args.train_data.display());
    let experiment = args.experiment_name.clone();
    TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Experiment '{}' saved.", experiment);
    Ok(())
}

fn run_build_vocab(args: BuildVocabArgs) -> Result<()> {
    use crate::application::vocab_use_case::BuildVocabUseCase;

    let vocab = BuildVocabUseCase::new(args.data, args.output.clone(), args.max_size).execute()?;
    println!("Wrote {} tokens to '{}'", vocab.len(), args.output.display());
    Ok(())
}

fn run_summary(args: SummaryArgs) -> Result<()> {
    use crate::application::summary_use_case::SummaryUseCase;

    let use_case = match args.from {
        Some(dir) => SummaryUseCase::from_experiment(dir),
        None      => SummaryUseCase::new(args.model.into()),
    };
    let summary = use_case.execute()?;
    println!("{summary}");
    Ok(())
}
