// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Restores the latest checkpoint and runs one full validation
// pass:
//
//   Step 1: Rebuild the architecture from the checkpoint dir
//   Step 2: Load the latest weights into it
//   Step 3: Index the validation shards
//   Step 4: Run the validation pass and log one "full" row

use std::path::PathBuf;

use anyhow::Result;

use crate::data::{batcher::TreeBatcher, dataset::ShardedTreeDataset};
use crate::domain::vocabulary::Vocabulary;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{LogStep, MetricsLogger},
};
use crate::ml::factory::ModelFactory;
use crate::ml::model::Tree2Seq;
use crate::ml::trainer::{evaluate_dataset, EvalBackend, TrainDevice};

pub struct EvaluateUseCase {
    data_folder:        PathBuf,
    vocabulary_path:    PathBuf,
    checkpoints_folder: PathBuf,
    logging_folder:     PathBuf,
    batch_size:         usize,
}

impl EvaluateUseCase {
    pub fn new(
        data_folder: PathBuf,
        vocabulary_path: PathBuf,
        checkpoints_folder: PathBuf,
        logging_folder: PathBuf,
        batch_size: usize,
    ) -> Self {
        Self { data_folder, vocabulary_path, checkpoints_folder, logging_folder, batch_size }
    }

    pub fn execute(&self) -> Result<()> {
        let device = TrainDevice::default();

        // ── Step 1: Rebuild the architecture ─────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&self.checkpoints_folder)?;
        let factory = ModelFactory::from_configuration(ckpt_manager.load_configuration()?)?;
        tracing::info!(
            "Restored configuration: {} → {} → {}",
            factory.configuration().embedding.name,
            factory.configuration().encoder.name,
            factory.configuration().decoder.name,
        );

        // ── Step 2: Load the latest weights ──────────────────────────────────
        let model: Tree2Seq<EvalBackend> = factory.construct_model(&device);
        let model = ckpt_manager.load_model(model, &device)?;
        let epoch = ckpt_manager.latest_epoch()?;

        // ── Step 3: Index the validation shards ──────────────────────────────
        let vocabulary = Vocabulary::load(&self.vocabulary_path)?;
        let framing = vocabulary.label_framing()?;
        let mut dataset = ShardedTreeDataset::new(&self.data_folder, self.batch_size, true)?;
        tracing::info!("Evaluating {} batches", dataset.len());

        // ── Step 4: Validation pass ──────────────────────────────────────────
        let batcher = TreeBatcher::<EvalBackend>::new(device, framing);
        let state = evaluate_dataset(&mut dataset, &model, &batcher, framing.pad)?.state();
        tracing::info!(
            "epoch {epoch} evaluation: loss={:.4} accuracy={:.4}",
            state.loss,
            state.accuracy,
        );

        let mut metrics_logger = MetricsLogger::new(&self.logging_folder)?;
        metrics_logger.log(epoch, LogStep::FullDataset, &state)
    }
}
