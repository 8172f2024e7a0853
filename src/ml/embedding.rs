// ============================================================
// Layer 5 — Node Embedding
// ============================================================
// FullTokenEmbedding: every AST node is represented as the sum
// of its token embedding and its node-type embedding, both of
// width `embedding_size`. This is the only registered embedding;
// the factory rejects any other name.

use burn::{
    nn::{Embedding, EmbeddingConfig},
    prelude::*,
};

#[derive(Config, Debug)]
pub struct FullTokenEmbeddingConfig {
    pub token_vocab_size: usize,
    pub type_vocab_size:  usize,
    pub embedding_size:   usize,
}

impl FullTokenEmbeddingConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FullTokenEmbedding<B> {
        FullTokenEmbedding {
            token:     EmbeddingConfig::new(self.token_vocab_size, self.embedding_size).init(device),
            node_type: EmbeddingConfig::new(self.type_vocab_size, self.embedding_size).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct FullTokenEmbedding<B: Backend> {
    token:     Embedding<B>,
    node_type: Embedding<B>,
}

impl<B: Backend> FullTokenEmbedding<B> {
    /// token_ids, type_ids: [n_nodes] → node features [n_nodes, embedding_size]
    pub fn forward(
        &self,
        token_ids: Tensor<B, 1, Int>,
        type_ids: Tensor<B, 1, Int>,
    ) -> Tensor<B, 2> {
        // burn's Embedding expects [batch, seq]; treat the whole
        // flattened node list as one sequence.
        let tokens = self.token.forward(token_ids.unsqueeze::<2>());
        let types = self.node_type.forward(type_ids.unsqueeze::<2>());
        (tokens + types).squeeze::<2>(0)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type B = burn::backend::NdArray;

    #[test]
    fn test_output_shape_is_nodes_by_embedding() {
        let device = Default::default();
        let embedding = FullTokenEmbeddingConfig::new(10, 4, 8).init::<B>(&device);
        let tokens = Tensor::<B, 1, Int>::from_ints([0, 3, 9, 1].as_slice(), &device);
        let types = Tensor::<B, 1, Int>::from_ints([0, 1, 2, 3].as_slice(), &device);
        let features = embedding.forward(tokens, types);
        assert_eq!(features.dims(), [4, 8]);
    }
}
