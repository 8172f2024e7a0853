// ============================================================
// Layer 4 — Tree Batcher
// ============================================================
// Converts one host-side AssembledBatch into device tensors.
//
// What crosses the device boundary here:
//   - node token/type ids     → Int tensor [n_nodes]
//   - root positions          → Int tensor [batch]
//   - framed label sequences  → Int tensor [max_len, batch]
//
// What stays on the host: the graph topology (edges, tree sizes).
// The encoder schedules its bottom-up sweep from those directly.
//
// Ground-truth framing: every column is SOS, the label ids, EOS,
// then PAD up to the longest sequence in the batch. max_len is
// therefore longest + 2. Row 0 is always SOS — the decoding seed
// the orchestrator never predicts.

use burn::prelude::*;

use crate::data::dataset::AssembledBatch;
use crate::domain::error::Tree2SeqError;
use crate::domain::tree::BatchedTrees;
use crate::domain::vocabulary::LabelFraming;

// ─── TreeBatch ────────────────────────────────────────────────────────────────
/// One batch ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct TreeBatch<B: Backend> {
    /// Host-side topology for the encoder's level schedule.
    pub graph: BatchedTrees,

    /// Token id per node — shape: [n_nodes]
    pub token_ids: Tensor<B, 1, Int>,

    /// Node-type id per node — shape: [n_nodes]
    pub type_ids: Tensor<B, 1, Int>,

    /// Root position per tree in the flattened ordering — shape: [batch]
    pub root_indexes: Tensor<B, 1, Int>,

    /// Framed label sequences — shape: [max_len, batch]
    pub ground_truth: Tensor<B, 2, Int>,

    pub max_length: usize,
    pub batch_size: usize,
}

// ─── TreeBatcher ──────────────────────────────────────────────────────────────
/// Holds the target device and the label-framing specials so the
/// same batcher wiring works on any backend.
#[derive(Debug, Clone)]
pub struct TreeBatcher<B: Backend> {
    device:  B::Device,
    framing: LabelFraming,
}

impl<B: Backend> TreeBatcher<B> {
    pub fn new(device: B::Device, framing: LabelFraming) -> Self {
        Self { device, framing }
    }

    pub fn batch(&self, assembled: &AssembledBatch) -> Result<TreeBatch<B>, Tree2SeqError> {
        let trees = &assembled.trees;
        let batch_size = trees.tree_count();
        if batch_size == 0 {
            return Err(Tree2SeqError::ShapeMismatch("assembled batch has no trees".into()));
        }
        if assembled.labels.len() != batch_size {
            return Err(Tree2SeqError::ShapeMismatch(format!(
                "{} label sequences for {batch_size} trees",
                assembled.labels.len()
            )));
        }

        let token_flat: Vec<i32> = trees.token_ids.iter().map(|&id| id as i32).collect();
        let type_flat: Vec<i32> = trees.type_ids.iter().map(|&id| id as i32).collect();
        let root_flat: Vec<i32> = trees.root_indexes().iter().map(|&p| p as i32).collect();

        let token_ids = Tensor::<B, 1, Int>::from_ints(token_flat.as_slice(), &self.device);
        let type_ids = Tensor::<B, 1, Int>::from_ints(type_flat.as_slice(), &self.device);
        let root_indexes = Tensor::<B, 1, Int>::from_ints(root_flat.as_slice(), &self.device);

        let (ground_truth, max_length) = self.frame_labels(&assembled.labels, batch_size);

        Ok(TreeBatch {
            graph: trees.clone(),
            token_ids,
            type_ids,
            root_indexes,
            ground_truth,
            max_length,
            batch_size,
        })
    }

    /// Build the [max_len, batch] ground-truth tensor, one framed
    /// sequence per column.
    fn frame_labels(
        &self,
        labels: &[Vec<u32>],
        batch_size: usize,
    ) -> (Tensor<B, 2, Int>, usize) {
        let longest = labels.iter().map(|sequence| sequence.len()).max().unwrap_or(0);
        // SOS + labels + EOS, padded to the batch's longest sequence
        let max_length = longest + 2;

        let mut flat = vec![self.framing.pad as i32; max_length * batch_size];
        for (column, sequence) in labels.iter().enumerate() {
            flat[column] = self.framing.sos as i32;
            for (step, &id) in sequence.iter().enumerate() {
                flat[(step + 1) * batch_size + column] = id as i32;
            }
            flat[(sequence.len() + 1) * batch_size + column] = self.framing.eos as i32;
        }

        let ground_truth = Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([max_length, batch_size]);
        (ground_truth, max_length)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tree::{NodeFeatures, Tree};

    type B = burn::backend::NdArray;

    fn framing() -> LabelFraming {
        LabelFraming { sos: 0, eos: 1, pad: 2 }
    }

    fn assembled(labels: Vec<Vec<u32>>) -> AssembledBatch {
        let trees: Vec<Tree> = (0..labels.len() as u32)
            .map(|t| {
                Tree::new(
                    NodeFeatures { token_ids: vec![t, t + 1], type_ids: vec![0, 1] },
                    vec![(1, 0)],
                )
            })
            .collect();
        AssembledBatch { trees: BatchedTrees::batch(&trees), labels }
    }

    #[test]
    fn test_ground_truth_layout() {
        let batcher = TreeBatcher::<B>::new(Default::default(), framing());
        let batch = batcher.batch(&assembled(vec![vec![10, 11], vec![12]])).unwrap();

        assert_eq!(batch.max_length, 4);
        assert_eq!(batch.batch_size, 2);

        let rows: Vec<i64> = batch.ground_truth.into_data().to_vec().unwrap();
        // [max_len, batch] row-major:
        //   row 0 (seed):  SOS SOS
        //   row 1:         10  12
        //   row 2:         11  EOS
        //   row 3:         EOS PAD
        assert_eq!(rows, vec![0, 0, 10, 12, 11, 1, 1, 2]);
    }

    #[test]
    fn test_tensor_shapes_match_the_graph() {
        let batcher = TreeBatcher::<B>::new(Default::default(), framing());
        let batch = batcher.batch(&assembled(vec![vec![5], vec![6], vec![7]])).unwrap();

        assert_eq!(batch.token_ids.dims(), [6]);
        assert_eq!(batch.type_ids.dims(), [6]);
        assert_eq!(batch.root_indexes.dims(), [3]);
        assert_eq!(batch.ground_truth.dims(), [3, 3]);

        let roots: Vec<i64> = batch.root_indexes.into_data().to_vec().unwrap();
        assert_eq!(roots, vec![0, 2, 4]);
    }

    #[test]
    fn test_label_tree_count_mismatch_is_rejected() {
        let batcher = TreeBatcher::<B>::new(Default::default(), framing());
        let mut bad = assembled(vec![vec![5], vec![6]]);
        bad.labels.pop();
        let err = batcher.batch(&bad).unwrap_err();
        assert!(matches!(err, Tree2SeqError::ShapeMismatch(_)));
    }
}
