// ============================================================
// Layer 5 — Luong Concat Attention
// ============================================================
// Scores each encoder node state against the current decoder
// hidden state with the "concat" formulation:
//
//   score(h, m_j) = v^T tanh(W [h ; m_j])
//
// Softmax over a tree's node positions yields the mixing weights
// for its context vector. Padded node slots carry all-zero
// states, so their scores stay finite and their contribution to
// the context is proportionally negligible for real trees.
//
// Reference: Luong et al. (2015) Effective Approaches to
//            Attention-based Neural Machine Translation

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::softmax,
};

#[derive(Config, Debug)]
pub struct LuongConcatAttentionConfig {
    pub hidden_size: usize,
}

impl LuongConcatAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LuongConcatAttention<B> {
        LuongConcatAttention {
            attn: LinearConfig::new(2 * self.hidden_size, self.hidden_size).init(device),
            score: LinearConfig::new(self.hidden_size, 1)
                .with_bias(false)
                .init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct LuongConcatAttention<B: Backend> {
    attn:  Linear<B>,
    score: Linear<B>,
}

impl<B: Backend> LuongConcatAttention<B> {
    /// hidden: [batch, hidden]; memory: [batch, max_nodes, hidden]
    /// → context [batch, hidden]
    pub fn forward(&self, hidden: Tensor<B, 2>, memory: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch_size, max_nodes, hidden_size] = memory.dims();

        let query = hidden
            .unsqueeze_dim::<3>(1)
            .expand([batch_size, max_nodes, hidden_size]);
        let energy = self
            .attn
            .forward(Tensor::cat(vec![query, memory.clone()], 2))
            .tanh();

        // [batch, max_nodes, 1] → softmax over node positions
        let scores = self.score.forward(energy).squeeze::<2>(2);
        let weights = softmax(scores, 1);

        weights.unsqueeze_dim::<3>(1).matmul(memory).squeeze(1)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type B = burn::backend::NdArray;

    #[test]
    fn test_context_shape() {
        let device = Default::default();
        let attention = LuongConcatAttentionConfig::new(6).init::<B>(&device);

        let hidden =
            Tensor::<B, 2>::random([3, 6], burn::tensor::Distribution::Default, &device);
        let memory =
            Tensor::<B, 3>::random([3, 9, 6], burn::tensor::Distribution::Default, &device);

        let context = attention.forward(hidden, memory);
        assert_eq!(context.dims(), [3, 6]);
    }

    #[test]
    fn test_uniform_memory_yields_that_state() {
        let device = Default::default();
        let attention = LuongConcatAttentionConfig::new(4).init::<B>(&device);

        // Every node state identical: whatever the weights, the
        // convex mix must reproduce that state.
        let state = Tensor::<B, 2>::random([1, 4], burn::tensor::Distribution::Default, &device);
        let memory = state.clone().unsqueeze_dim::<3>(1).expand([1, 5, 4]);
        let hidden = Tensor::<B, 2>::random([1, 4], burn::tensor::Distribution::Default, &device);

        let context = attention.forward(hidden, memory);
        let expected: Vec<f32> = state.into_data().to_vec().unwrap();
        let actual: Vec<f32> = context.into_data().to_vec().unwrap();
        for (a, e) in actual.iter().zip(&expected) {
            assert!((a - e).abs() < 1e-5);
        }
    }
}
