// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// What lives in a checkpoint directory:
//   1. Model weights (.mpk.gz per epoch) — all learned parameters
//   2. latest_epoch.json                 — which epoch was last saved
//   3. model_configuration.json          — component names and sizes
//
// Why save the configuration separately?
//   The evaluate command has no training config; it rebuilds the
//   exact architecture from model_configuration.json, then loads
//   the weights into it. CompactRecorder is type-safe, so a
//   mismatched architecture fails at load rather than silently
//   mis-mapping parameters.
//
// File naming convention:
//   checkpoints/
//     model_epoch_1.mpk.gz       ← weights after epoch 1
//     model_epoch_2.mpk.gz       ← weights after epoch 2
//     ...
//     latest_epoch.json          ← number of the latest epoch
//     model_configuration.json   ← architecture description
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::ml::factory::ModelConfiguration;
use crate::ml::model::Tree2Seq;

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a manager, making the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn configuration_path(&self) -> PathBuf {
        self.dir.join("model_configuration.json")
    }

    /// Save model weights for a given epoch and move the latest
    /// pointer to it.
    pub fn save_model<B: Backend>(&self, model: &Tree2Seq<B>, epoch: usize) -> Result<()> {
        // Recorder adds the .mpk.gz extension itself.
        let path = self.dir.join(format!("model_epoch_{epoch}"));
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("failed to save checkpoint '{}'", path.display()))?;

        let latest_path = self.dir.join("latest_epoch.json");
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| "failed to write latest_epoch.json")?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Restore weights from the latest checkpoint into a freshly
    /// constructed model of the same architecture.
    pub fn load_model<B: Backend>(
        &self,
        model: Tree2Seq<B>,
        device: &B::Device,
    ) -> Result<Tree2Seq<B>> {
        let epoch = self.latest_epoch()?;
        let path = self.dir.join(format!("model_epoch_{epoch}"));
        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new().load(path.clone(), device).with_context(|| {
            format!(
                "cannot load checkpoint '{}'. Have you trained the model first?",
                path.display()
            )
        })?;
        Ok(model.load_record(record))
    }

    /// Read the persisted architecture description.
    pub fn load_configuration(&self) -> Result<ModelConfiguration> {
        let path = self.configuration_path();
        let raw = fs::read_to_string(&path).with_context(|| {
            format!(
                "cannot read '{}'. Make sure 'train' has run before 'evaluate'.",
                path.display()
            )
        })?;
        serde_json::from_str(&raw)
            .with_context(|| format!("malformed model configuration '{}'", path.display()))
    }

    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join("latest_epoch.json");
        let raw = fs::read_to_string(&path)
            .with_context(|| "cannot find 'latest_epoch.json'. Have you run 'train' first?")?;
        Ok(serde_json::from_str::<usize>(&raw)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::factory::{ComponentSpec, HiddenStates, ModelFactory, VocabularySizes};
    use crate::ml::trainer::{EvalBackend, TrainDevice};

    fn small_factory() -> ModelFactory {
        ModelFactory::new(
            ComponentSpec::plain("FullTokenEmbedding"),
            ComponentSpec::plain("TreeLSTM"),
            ComponentSpec::plain("LinearDecoder"),
            HiddenStates { embedding: 4, encoder: 4, decoder: 4 },
            VocabularySizes { tokens: 8, types: 2, labels: 6 },
        )
        .unwrap()
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        let device = TrainDevice::default();

        let model: Tree2Seq<EvalBackend> = small_factory().construct_model(&device);
        manager.save_model(&model, 3).unwrap();
        assert_eq!(manager.latest_epoch().unwrap(), 3);

        let fresh: Tree2Seq<EvalBackend> = small_factory().construct_model(&device);
        let restored = manager.load_model(fresh, &device).unwrap();
        assert_eq!(restored.decoder.out_size(), 6);
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        assert!(manager.latest_epoch().is_err());
    }
}
