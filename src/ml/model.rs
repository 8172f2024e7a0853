// ============================================================
// Layer 5 — Tree2Seq Model
// ============================================================
// End-to-end orchestration: embed nodes, encode the batched
// trees, seed the decoder with each tree's root state, then
// unroll teacher-forced decode steps against the framed labels.
//
// Output layout mirrors the ground truth — [max_len, batch,
// label_vocab] — with position 0 left as zeros: that slot holds
// the start-of-sequence seed, never a prediction.

use burn::prelude::*;
use burn::tensor::activation::softmax;

use crate::data::batcher::TreeBatch;
use crate::domain::error::Tree2SeqError;
use crate::domain::tree::BatchedTrees;
use crate::ml::decoder::{DecoderState, LabelDecoder};
use crate::ml::embedding::FullTokenEmbedding;
use crate::ml::encoder::TreeLstm;

#[derive(Module, Debug)]
pub struct Tree2Seq<B: Backend> {
    pub embedding: FullTokenEmbedding<B>,
    pub encoder:   TreeLstm<B>,
    pub decoder:   LabelDecoder<B>,
}

impl<B: Backend> Tree2Seq<B> {
    /// Teacher-forced forward pass.
    /// → logits [max_len, batch, label_vocab]
    pub fn forward(&self, batch: &TreeBatch<B>) -> Result<Tensor<B, 3>, Tree2SeqError> {
        let device = batch.token_ids.device();
        let batch_size = batch.batch_size;
        let out_size = self.decoder.out_size();

        let embedded = self
            .embedding
            .forward(batch.token_ids.clone(), batch.type_ids.clone());
        let (node_hidden, node_memory) = self.encoder.forward(&batch.graph, embedded);

        let [root_count] = batch.root_indexes.dims();
        if root_count != batch_size {
            return Err(Tree2SeqError::ShapeMismatch(format!(
                "{root_count} roots for a batch of {batch_size} trees"
            )));
        }
        let root_hidden = node_hidden.clone().select(0, batch.root_indexes.clone());
        let root_memory = node_memory.select(0, batch.root_indexes.clone());
        let mut state = DecoderState::from_encoder(root_hidden, root_memory);

        let attention_memory = self
            .decoder
            .uses_attention()
            .then(|| padded_node_states(&batch.graph, &node_hidden));

        let mut outputs =
            Tensor::<B, 3>::zeros([batch.max_length, batch_size, out_size], &device);
        for step in 1..batch.max_length {
            // Teacher forcing: feed the reference label from the
            // previous position, not the model's own guess.
            let previous = batch
                .ground_truth
                .clone()
                .slice([step - 1..step, 0..batch_size])
                .reshape([batch_size]);
            let (logits, next_state) =
                self.decoder.forward(previous, state, attention_memory.as_ref());
            state = next_state;
            outputs = outputs.slice_assign(
                [step..step + 1, 0..batch_size, 0..out_size],
                logits.unsqueeze::<3>(),
            );
        }
        Ok(outputs)
    }

    /// Collapse step logits to label ids — [max_len, batch].
    pub fn predict(&self, logits: Tensor<B, 3>) -> Tensor<B, 2, Int> {
        softmax(logits, 2).argmax(2).squeeze::<2>(2)
    }
}

/// Scatter per-node states into a per-tree padded block for the
/// attention variant — [batch, max_nodes, hidden]. Padding slots
/// stay zero.
fn padded_node_states<B: Backend>(
    graph: &BatchedTrees,
    node_states: &Tensor<B, 2>,
) -> Tensor<B, 3> {
    let [_, hidden_size] = node_states.dims();
    let max_nodes = graph.tree_sizes.iter().copied().max().unwrap_or(0);
    let device = node_states.device();

    let mut padded =
        Tensor::<B, 3>::zeros([graph.tree_count(), max_nodes, hidden_size], &device);
    let mut offset = 0;
    for (tree, &size) in graph.tree_sizes.iter().enumerate() {
        let states = node_states
            .clone()
            .slice([offset..offset + size, 0..hidden_size])
            .unsqueeze::<3>();
        padded = padded.slice_assign([tree..tree + 1, 0..size, 0..hidden_size], states);
        offset += size;
    }
    padded
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::TreeBatcher;
    use crate::data::dataset::AssembledBatch;
    use crate::domain::tree::{NodeFeatures, Tree};
    use crate::domain::vocabulary::LabelFraming;
    use crate::ml::attention::LuongConcatAttentionConfig;
    use crate::ml::decoder::LabelDecoderConfig;
    use crate::ml::embedding::FullTokenEmbeddingConfig;
    use crate::ml::encoder::TreeLstmConfig;

    type B = burn::backend::NdArray;

    const HIDDEN: usize = 6;
    const LABELS: usize = 12;

    fn model(attention: bool, device: &<B as Backend>::Device) -> Tree2Seq<B> {
        let attention =
            attention.then(|| LuongConcatAttentionConfig::new(HIDDEN).init::<B>(device));
        Tree2Seq {
            embedding: FullTokenEmbeddingConfig::new(20, 5, HIDDEN).init(device),
            encoder:   TreeLstmConfig::new(HIDDEN, HIDDEN).init(device),
            decoder:   LabelDecoderConfig::new(LABELS, 4, HIDDEN).init(attention, device),
        }
    }

    fn sample_batch(device: &<B as Backend>::Device) -> TreeBatch<B> {
        let trees = vec![
            Tree::new(
                NodeFeatures { token_ids: vec![1, 2, 3], type_ids: vec![0, 1, 1] },
                vec![(1, 0), (2, 0)],
            ),
            Tree::new(NodeFeatures { token_ids: vec![4], type_ids: vec![2] }, Vec::new()),
        ];
        let assembled = AssembledBatch {
            trees:  crate::domain::tree::BatchedTrees::batch(&trees),
            labels: vec![vec![5, 6], vec![7]],
        };
        let framing = LabelFraming { sos: 0, eos: 1, pad: 2 };
        TreeBatcher::new(*device, framing).batch(&assembled).unwrap()
    }

    #[test]
    fn test_forward_shape_and_masked_first_position() {
        let device = Default::default();
        let batch = sample_batch(&device);
        let logits = model(false, &device).forward(&batch).unwrap();

        // longest label (2) + SOS + EOS
        assert_eq!(logits.dims(), [4, 2, LABELS]);

        let first: Vec<f32> = logits
            .slice([0..1, 0..2, 0..LABELS])
            .into_data()
            .to_vec()
            .unwrap();
        assert!(first.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_forward_with_attention() {
        let device = Default::default();
        let batch = sample_batch(&device);
        let logits = model(true, &device).forward(&batch).unwrap();
        assert_eq!(logits.dims(), [4, 2, LABELS]);
    }

    #[test]
    fn test_predict_shape_and_range() {
        let device = Default::default();
        let batch = sample_batch(&device);
        let model = model(false, &device);
        let predictions = model.predict(model.forward(&batch).unwrap());

        assert_eq!(predictions.dims(), [4, 2]);
        let ids: Vec<i64> = predictions.into_data().to_vec().unwrap();
        assert!(ids.iter().all(|&id| id >= 0 && (id as usize) < LABELS));
    }

    #[test]
    fn test_padded_node_states_layout() {
        let device = Default::default();
        let trees = vec![
            Tree::new(
                NodeFeatures { token_ids: vec![1, 2], type_ids: vec![0, 0] },
                vec![(1, 0)],
            ),
            Tree::new(NodeFeatures { token_ids: vec![3], type_ids: vec![0] }, Vec::new()),
        ];
        let graph = crate::domain::tree::BatchedTrees::batch(&trees);
        let states = Tensor::<B, 2>::from_floats(
            [[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]],
            &device,
        );

        let padded = padded_node_states(&graph, &states);
        assert_eq!(padded.dims(), [2, 2, 2]);

        let values: Vec<f32> = padded.into_data().to_vec().unwrap();
        // tree 0 keeps both nodes; tree 1 pads its second slot
        assert_eq!(values, vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 0.0, 0.0]);
    }
}
