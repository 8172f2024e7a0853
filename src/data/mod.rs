// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from shard files on disk to device-ready batches.
//
// The pipeline flows in this order:
//
//   shard_<n>.json files
//       │
//       ▼
//   Shard             → decodes one batched graph + labels
//       │
//       ▼
//   ShardedTreeDataset→ batch-id index over all shards,
//       │               single-slot shard cache, sub-range
//       │               assembly with edge inversion
//       ▼
//   TreeBatcher       → tensors on the compute device, framed
//                       ground-truth sequences
//
// The dataset layers are host-only and backend-agnostic; only
// the batcher touches Burn types.

/// Shard file decoding, validation and numeric-id naming
pub mod shard;

/// Batch-id index, shard cache and batch assembly
pub mod dataset;

/// AssembledBatch → device tensors
pub mod batcher;
