// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a full training run in order:
//
//   Step 1: Load the vocabulary        (Layer 3 - domain)
//   Step 2: Index the shard folders    (Layer 4 - data)
//   Step 3: Build the model factory    (Layer 5 - ml)
//   Step 4: Save the model config      (Layer 6 - infra)
//   Step 5: Open the metrics log       (Layer 6 - infra)
//   Step 6: Run the training loop      (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::application::schedule::NEVER;
use crate::data::dataset::ShardedTreeDataset;
use crate::domain::vocabulary::Vocabulary;
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::factory::{ComponentSpec, HiddenStates, ModelFactory, VocabularySizes};
use crate::ml::trainer::run_training;

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run, read from a JSON file.
// The #[derive(Serialize, Deserialize)] macros from serde handle
// reading/writing this struct automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub train:      PathBuf,
    pub validate:   PathBuf,
    pub vocabulary: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub paths:         PathsConfig,
    pub batch_size:    usize,
    pub hidden_states: HiddenStates,

    pub embedding: ComponentSpec,
    pub encoder:   ComponentSpec,
    pub decoder:   ComponentSpec,

    pub lr:           f64,
    pub weight_decay: f64,
    pub n_epochs:     usize,

    /// Modulo schedules; logging and evaluation fire on batch
    /// steps, checkpointing on epochs. -1 disables one.
    pub logging_step:    i64,
    pub evaluation_step: i64,
    pub checkpoint_step: i64,

    pub checkpoints_folder: PathBuf,
    pub logging_folder:     PathBuf,
}

impl TrainConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config '{}'", path.display()))?;
        let config: TrainConfig = serde_json::from_str(&raw)
            .with_context(|| format!("malformed config '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.batch_size > 0, "batch_size must be positive");
        anyhow::ensure!(self.n_epochs > 0, "n_epochs must be positive");
        for (name, step) in [
            ("logging_step", self.logging_step),
            ("evaluation_step", self.evaluation_step),
            ("checkpoint_step", self.checkpoint_step),
        ] {
            anyhow::ensure!(
                step > 0 || step == NEVER,
                "{name} must be positive or {NEVER} (never), got {step}"
            );
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
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

        // ── Step 1: Load the vocabulary ──────────────────────────────────────
        tracing::info!("Loading vocabulary from '{}'", cfg.paths.vocabulary.display());
        let vocabulary = Vocabulary::load(&cfg.paths.vocabulary)?;
        tracing::info!(
            "Vocabulary: {} tokens, {} node types, {} labels",
            vocabulary.token_count(),
            vocabulary.type_count(),
            vocabulary.label_count()
        );

        // ── Step 2: Index the shard folders ──────────────────────────────────
        // Edge inversion on: shards store root → leaves edges, the
        // encoder sweeps leaves → root.
        let mut train_dataset =
            ShardedTreeDataset::new(&cfg.paths.train, cfg.batch_size, true)?;
        let mut val_dataset =
            ShardedTreeDataset::new(&cfg.paths.validate, cfg.batch_size, true)?;
        tracing::info!(
            "Datasets ready: {} train batches, {} validation batches",
            train_dataset.len(),
            val_dataset.len()
        );

        // ── Step 3: Build the model factory ──────────────────────────────────
        let factory = ModelFactory::new(
            cfg.embedding.clone(),
            cfg.encoder.clone(),
            cfg.decoder.clone(),
            cfg.hidden_states,
            VocabularySizes::from(&vocabulary),
        )?;

        // ── Step 4: Save the model configuration ─────────────────────────────
        // The evaluate command rebuilds the architecture from this
        // file, without the training config.
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoints_folder)?;
        factory.save_configuration(&ckpt_manager.configuration_path())?;

        // ── Step 5: Open the metrics log ─────────────────────────────────────
        let mut metrics_logger = MetricsLogger::new(&cfg.logging_folder)?;

        // ── Step 6: Run the training loop (Layer 5) ──────────────────────────
        run_training(
            cfg,
            &mut train_dataset,
            &mut val_dataset,
            &vocabulary,
            &factory,
            &ckpt_manager,
            &mut metrics_logger,
        )
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> TrainConfig {
        TrainConfig {
            paths: PathsConfig {
                train:      PathBuf::from("data/train"),
                validate:   PathBuf::from("data/validate"),
                vocabulary: PathBuf::from("data/vocabulary.json"),
            },
            batch_size:    2,
            hidden_states: HiddenStates { embedding: 8, encoder: 8, decoder: 8 },
            embedding:     ComponentSpec::plain("FullTokenEmbedding"),
            encoder:       ComponentSpec::plain("TreeLSTM"),
            decoder:       ComponentSpec::plain("LSTMDecoder"),
            lr:            1e-3,
            weight_decay:  1e-5,
            n_epochs:      1,
            logging_step:    10,
            evaluation_step: NEVER,
            checkpoint_step: NEVER,
            checkpoints_folder: PathBuf::from("checkpoints"),
            logging_folder:     PathBuf::from("logs"),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = sample_config();
        config.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_schedule_rejected() {
        let mut config = sample_config();
        config.logging_step = -3;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging_step"));
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, serde_json::to_string(&sample_config()).unwrap()).unwrap();

        let reloaded = TrainConfig::from_file(&path).unwrap();
        assert_eq!(reloaded.batch_size, 2);
        assert_eq!(reloaded.decoder.name, "LSTMDecoder");
    }
}
