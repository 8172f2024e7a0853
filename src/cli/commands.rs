// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `evaluate`
// and their configurable flags.
//
// Training is driven by a JSON config file rather than a wall
// of flags: a run is described once and the same file is kept
// next to its checkpoints for reproducibility.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, PathBuf, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a tree-to-sequence model from a JSON config
    Train(TrainArgs),

    /// Evaluate the latest checkpoint on a dataset
    Evaluate(EvaluateArgs),
}

/// Arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Path to the training configuration JSON file
    #[arg(long)]
    pub config: PathBuf,
}

/// Arguments for the `evaluate` command.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Folder with the shard files to evaluate on
    #[arg(long)]
    pub data: PathBuf,

    /// Path to the vocabulary JSON (same as used during training)
    #[arg(long)]
    pub vocabulary: PathBuf,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoints: PathBuf,

    /// Directory for the metrics CSV
    #[arg(long, default_value = "logs")]
    pub logs: PathBuf,

    /// Number of trees per assembled batch
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,
}
