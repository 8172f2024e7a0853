// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`    — trains a model from a JSON config
//   2. `evaluate` — restores the latest checkpoint and runs a
//                   full validation pass
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

// Declare the commands submodule
pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

/// The main CLI struct — clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "tree2seq",
    version = "0.1.0",
    about = "Train and evaluate tree-to-sequence models on sharded tree datasets."
)]
pub struct Cli {
    /// The subcommand to run (train or evaluate)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// This keeps the CLI layer thin — it only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => Self::run_train(args),
            Commands::Evaluate(args) => Self::run_evaluate(args),
        }
    }

    /// Handles the `train` subcommand.
    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::{TrainConfig, TrainUseCase};

        tracing::info!("Starting training with config: {}", args.config.display());
        let config = TrainConfig::from_file(&args.config)?;
        TrainUseCase::new(config).execute()?;

        println!("Training complete. Checkpoints saved.");
        Ok(())
    }

    /// Handles the `evaluate` subcommand.
    fn run_evaluate(args: EvaluateArgs) -> Result<()> {
        use crate::application::evaluate_use_case::EvaluateUseCase;

        EvaluateUseCase::new(
            args.data,
            args.vocabulary,
            args.checkpoints,
            args.logs,
            args.batch_size,
        )
        .execute()
    }
}
