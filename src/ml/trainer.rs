// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop over the sharded dataset with Adam, plus the
// shared loss/statistics helpers the evaluation pass reuses.
//
// Backend split:
//   - Training runs on TrainBackend (Autodiff<NdArray>)
//   - model.valid() strips the autodiff graph for evaluation,
//     so the validation batcher targets EvalBackend
//
// Batches are pulled by index rather than through a DataLoader:
// the dataset's shard cache only pays off when consecutive
// batches come from the same shard, so order stays sequential.
//
// Reference: Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{decay::WeightDecayConfig, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::schedule::is_current_step_match;
use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{TreeBatch, TreeBatcher},
    dataset::ShardedTreeDataset,
};
use crate::domain::vocabulary::Vocabulary;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{BatchInfo, LearningInfo, LogStep, MetricsLogger};
use crate::ml::factory::ModelFactory;
use crate::ml::model::Tree2Seq;

pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;
pub type EvalBackend  = burn::backend::NdArray;
pub type TrainDevice  = burn::backend::ndarray::NdArrayDevice;

const SEED: u64 = 7;

pub fn run_training(
    cfg:            &TrainConfig,
    train_dataset:  &mut ShardedTreeDataset,
    val_dataset:    &mut ShardedTreeDataset,
    vocabulary:     &Vocabulary,
    factory:        &ModelFactory,
    ckpt_manager:   &CheckpointManager,
    metrics_logger: &mut MetricsLogger,
) -> Result<()> {
    let device = TrainDevice::default();
    TrainBackend::seed(SEED);

    let mut model: Tree2Seq<TrainBackend> = factory.construct_model(&device);
    tracing::info!(
        "Model ready: {} → {} → {}",
        factory.configuration().embedding.name,
        factory.configuration().encoder.name,
        factory.configuration().decoder.name,
    );

    let optim_cfg = AdamConfig::new()
        .with_weight_decay(Some(WeightDecayConfig::new(cfg.weight_decay as _)));
    let mut optim = optim_cfg.init();

    let framing = vocabulary.label_framing()?;
    let train_batcher = TreeBatcher::<TrainBackend>::new(device, framing);
    let val_batcher   = TreeBatcher::<EvalBackend>::new(device, framing);
    let pad = framing.pad;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.n_epochs {
        // Accumulates since the last logged step, not since the
        // epoch start, so each metrics row covers its own window.
        let mut train_info = LearningInfo::default();

        let progress = ProgressBar::new(train_dataset.len() as u64).with_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress.set_message(format!("epoch {epoch}/{}", cfg.n_epochs));

        for batch_id in 0..train_dataset.len() {
            let assembled = train_dataset.get_batch(batch_id)?;
            let batch = train_batcher.batch(&assembled)?;
            let (updated, info) = train_on_batch(model, &mut optim, cfg.lr, &batch, pad)?;
            model = updated;
            train_info.accumulate(&info);
            progress.inc(1);

            let step = batch_id as i64;
            if is_current_step_match(step, cfg.logging_step) {
                let state = std::mem::take(&mut train_info).state();
                tracing::info!(
                    "epoch {epoch} step {batch_id}: loss={:.4} accuracy={:.4}",
                    state.loss,
                    state.accuracy,
                );
                metrics_logger.log(epoch, LogStep::Batch(batch_id), &state)?;
            }
            if is_current_step_match(step, cfg.evaluation_step) {
                let state =
                    evaluate_dataset(val_dataset, &model.valid(), &val_batcher, pad)?.state();
                tracing::info!(
                    "epoch {epoch} step {batch_id} validation: loss={:.4} accuracy={:.4}",
                    state.loss,
                    state.accuracy,
                );
                metrics_logger.log(epoch, LogStep::FullDataset, &state)?;
            }
        }
        progress.finish();

        // A full validation pass closes every epoch; checkpoints
        // follow their own epoch-indexed schedule.
        let val_state =
            evaluate_dataset(val_dataset, &model.valid(), &val_batcher, pad)?.state();
        tracing::info!(
            "epoch {epoch} done: validation loss={:.4} accuracy={:.4}",
            val_state.loss,
            val_state.accuracy,
        );
        metrics_logger.log(epoch, LogStep::FullDataset, &val_state)?;
        if is_current_step_match(epoch as i64, cfg.checkpoint_step) {
            ckpt_manager.save_model(&model, epoch)?;
        }
    }

    tracing::info!("Training complete");
    Ok(())
}

/// One forward/backward/update step. Consumes and returns the
/// model because the optimizer step does.
pub fn train_on_batch<B: AutodiffBackend>(
    model: Tree2Seq<B>,
    optim: &mut impl Optimizer<Tree2Seq<B>, B>,
    lr: f64,
    batch: &TreeBatch<B>,
    pad: u32,
) -> Result<(Tree2Seq<B>, BatchInfo)> {
    let logits = model.forward(batch)?;
    let loss = sequence_loss(logits.clone(), &batch.ground_truth, pad);
    let loss_value: f64 = loss.clone().into_scalar().elem();
    let info = batch_statistics(&model, logits, &batch.ground_truth, loss_value, pad);

    let grads = loss.backward();
    let grads = GradientsParams::from_grads(grads, &model);
    let model = optim.step(lr, model, grads);
    Ok((model, info))
}

/// Cross-entropy over steps 1..max_len; position 0 holds the
/// start-of-sequence seed and is never scored, and PAD targets
/// are ignored.
pub fn sequence_loss<B: Backend>(
    logits: Tensor<B, 3>,
    ground_truth: &Tensor<B, 2, Int>,
    pad: u32,
) -> Tensor<B, 1> {
    let [max_len, batch_size, classes] = logits.dims();
    let scored = logits
        .slice([1..max_len, 0..batch_size, 0..classes])
        .reshape([(max_len - 1) * batch_size, classes]);
    let targets = ground_truth
        .clone()
        .slice([1..max_len, 0..batch_size])
        .reshape([(max_len - 1) * batch_size]);

    CrossEntropyLossConfig::new()
        .with_pad_tokens(Some(vec![pad as usize]))
        .init(&scored.device())
        .forward(scored, targets)
}

/// Token-level accuracy counts over the scored positions, with
/// PAD slots masked out of both counts.
pub fn batch_statistics<B: Backend>(
    model: &Tree2Seq<B>,
    logits: Tensor<B, 3>,
    ground_truth: &Tensor<B, 2, Int>,
    loss: f64,
    pad: u32,
) -> BatchInfo {
    let [max_len, batch_size, _] = logits.dims();
    let predictions = model
        .predict(logits)
        .slice([1..max_len, 0..batch_size]);
    let targets = ground_truth.clone().slice([1..max_len, 0..batch_size]);

    let mask = targets.clone().not_equal_elem(pad as i32).int();
    let total: i64 = mask.clone().sum().into_scalar().elem();
    let correct: i64 = (predictions.equal(targets).int() * mask)
        .sum()
        .into_scalar()
        .elem();

    BatchInfo {
        loss,
        correct_tokens: correct as usize,
        total_tokens:   total as usize,
    }
}

/// Full pass over a dataset without gradient tracking.
pub fn evaluate_dataset(
    dataset: &mut ShardedTreeDataset,
    model: &Tree2Seq<EvalBackend>,
    batcher: &TreeBatcher<EvalBackend>,
    pad: u32,
) -> Result<LearningInfo> {
    let mut info = LearningInfo::default();
    for batch_id in 0..dataset.len() {
        let assembled = dataset.get_batch(batch_id)?;
        let batch = batcher.batch(&assembled)?;
        let logits = model.forward(&batch)?;
        let loss: f64 = sequence_loss(logits.clone(), &batch.ground_truth, pad)
            .into_scalar()
            .elem();
        info.accumulate(&batch_statistics(model, logits, &batch.ground_truth, loss, pad));
    }
    Ok(info)
}
