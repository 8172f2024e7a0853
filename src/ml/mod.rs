// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// No other layer imports from burn directly — only the data
// batcher, which materialises tensors for this one.
//
// Why isolate Burn code here?
//   - If Burn's API changes, we only update this layer
//   - The domain and data layers stay host-only and testable
//     without a backend
//   - Model architecture is clearly separated from shard
//     handling and application logic
//
// What's in this layer:
//
//   embedding.rs — FullTokenEmbedding
//                  Per-node token + node-type embedding sum
//
//   encoder.rs   — TreeLSTM
//                  Child-sum Tree-LSTM over the batched graph,
//                  scheduled by topological level
//
//   attention.rs — LuongConcatAttention
//                  Concat-style scoring of decoder state
//                  against padded encoder node states
//
//   decoder.rs   — LabelDecoder
//                  One autoregressive step: linear, LSTM, or
//                  LSTM + attention variants
//
//   model.rs     — Tree2Seq
//                  Embed → encode → teacher-forced decode fold
//
//   factory.rs   — ModelFactory
//                  Component registries, configuration
//                  persistence, model construction
//
//   trainer.rs   — Training loop
//                  Epoch loop, Adam updates, loss/accuracy
//                  statistics shared with evaluation
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Tai et al. (2015) Tree-Structured LSTM Networks

/// Node embedding component
pub mod embedding;

/// Child-sum Tree-LSTM encoder
pub mod encoder;

/// Luong concat attention
pub mod attention;

/// Autoregressive label decoder variants
pub mod decoder;

/// End-to-end tree-to-sequence model
pub mod model;

/// Component registries and model construction
pub mod factory;

/// Training loop with validation and checkpointing
pub mod trainer;
