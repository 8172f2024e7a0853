// ============================================================
// Layer 5 — Label Decoder
// ============================================================
// One step of autoregressive label prediction. Three shapes of
// decoder share this module, selected by configuration:
//
//   LinearDecoder        — embed + project, state passes through
//   LSTMDecoder          — LSTM cell over the embedded input
//   LSTMAttentionDecoder — LSTM cell + Luong attention over the
//                          padded encoder node states
//
// The hidden/cell pair travels as [1, batch, hidden] so the
// orchestrating model never cares which variant runs inside.

use burn::{
    nn::{Embedding, EmbeddingConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::sigmoid,
};

use crate::ml::attention::LuongConcatAttention;

/// Recurrent state threaded through decode steps, both tensors
/// shaped [1, batch, hidden].
#[derive(Clone, Debug)]
pub struct DecoderState<B: Backend> {
    pub hidden: Tensor<B, 3>,
    pub memory: Tensor<B, 3>,
}

impl<B: Backend> DecoderState<B> {
    pub fn zeros(batch_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        DecoderState {
            hidden: Tensor::zeros([1, batch_size, hidden_size], device),
            memory: Tensor::zeros([1, batch_size, hidden_size], device),
        }
    }

    /// Seed the decoder with per-sequence encoder outputs,
    /// `roots` shaped [batch, hidden].
    pub fn from_encoder(hidden_roots: Tensor<B, 2>, memory_roots: Tensor<B, 2>) -> Self {
        DecoderState {
            hidden: hidden_roots.unsqueeze::<3>(),
            memory: memory_roots.unsqueeze::<3>(),
        }
    }
}

#[derive(Config, Debug)]
pub struct LabelDecoderConfig {
    pub label_vocab_size: usize,
    pub embedding_size:   usize,
    pub hidden_size:      usize,
    /// LSTM cell between embedding and projection; disabled for
    /// the linear variant.
    #[config(default = true)]
    pub recurrent: bool,
}

impl LabelDecoderConfig {
    pub fn init<B: Backend>(
        &self,
        attention: Option<LuongConcatAttention<B>>,
        device: &B::Device,
    ) -> LabelDecoder<B> {
        let recurrence = self.recurrent.then(|| DecoderRecurrence {
            input_gates: LinearConfig::new(self.embedding_size, 4 * self.hidden_size).init(device),
            hidden_gates: LinearConfig::new(self.hidden_size, 4 * self.hidden_size)
                .with_bias(false)
                .init(device),
        });
        let attention_combine = attention
            .is_some()
            .then(|| LinearConfig::new(2 * self.hidden_size, self.hidden_size).init(device));
        LabelDecoder {
            embedding: EmbeddingConfig::new(self.label_vocab_size, self.embedding_size)
                .init(device),
            recurrence,
            attention,
            attention_combine,
            out: LinearConfig::new(
                if self.recurrent { self.hidden_size } else { self.embedding_size },
                self.label_vocab_size,
            )
            .init(device),
            hidden_size: self.hidden_size,
            out_size:    self.label_vocab_size,
        }
    }
}

#[derive(Module, Debug)]
pub struct DecoderRecurrence<B: Backend> {
    input_gates:  Linear<B>,
    hidden_gates: Linear<B>,
}

impl<B: Backend> DecoderRecurrence<B> {
    /// Standard LSTM cell; all tensors [batch, *].
    fn step(
        &self,
        input: Tensor<B, 2>,
        hidden: Tensor<B, 2>,
        memory: Tensor<B, 2>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let gates = self.input_gates.forward(input) + self.hidden_gates.forward(hidden);
        let gates = gates.chunk(4, 1);
        let input_gate = sigmoid(gates[0].clone());
        let forget_gate = sigmoid(gates[1].clone());
        let update = gates[2].clone().tanh();
        let output_gate = sigmoid(gates[3].clone());

        let memory = forget_gate * memory + input_gate * update;
        let hidden = output_gate * memory.clone().tanh();
        (hidden, memory)
    }
}

#[derive(Module, Debug)]
pub struct LabelDecoder<B: Backend> {
    embedding:         Embedding<B>,
    recurrence:        Option<DecoderRecurrence<B>>,
    attention:         Option<LuongConcatAttention<B>>,
    attention_combine: Option<Linear<B>>,
    out:               Linear<B>,
    hidden_size: usize,
    out_size:    usize,
}

impl<B: Backend> LabelDecoder<B> {
    pub fn out_size(&self) -> usize {
        self.out_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn uses_attention(&self) -> bool {
        self.attention.is_some()
    }

    /// input: previous label ids [batch]; attention_memory:
    /// padded node states [batch, max_nodes, hidden], consulted
    /// only by the attention variant.
    /// → (logits [batch, label_vocab], next state)
    pub fn forward(
        &self,
        input: Tensor<B, 1, Int>,
        state: DecoderState<B>,
        attention_memory: Option<&Tensor<B, 3>>,
    ) -> (Tensor<B, 2>, DecoderState<B>) {
        let embedded = self.embedding.forward(input.unsqueeze::<2>()).squeeze::<2>(0);

        let Some(recurrence) = &self.recurrence else {
            // Linear variant: project straight off the embedding.
            return (self.out.forward(embedded), state);
        };

        let hidden = state.hidden.squeeze::<2>(0);
        let memory = state.memory.squeeze::<2>(0);
        let (hidden, memory) = recurrence.step(embedded, hidden, memory);

        let features = match (&self.attention, &self.attention_combine, attention_memory) {
            (Some(attention), Some(combine), Some(nodes)) => {
                let context = attention.forward(hidden.clone(), nodes.clone());
                combine
                    .forward(Tensor::cat(vec![hidden.clone(), context], 1))
                    .tanh()
            }
            _ => hidden.clone(),
        };

        (
            self.out.forward(features),
            DecoderState {
                hidden: hidden.unsqueeze::<3>(),
                memory: memory.unsqueeze::<3>(),
            },
        )
    }
}
