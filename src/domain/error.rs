// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Every failure the core can surface, as a typed enum.
// The application and CLI layers wrap these with anyhow and
// context strings; the core itself never retries or masks —
// all four variants are fatal to the operation that raised them.
//
//   Configuration    — missing paths, malformed config values.
//                      Raised before any training step runs.
//   UnknownComponent — a component registry rejected a name.
//   CorruptShard     — a shard file could not be decoded during
//                      index construction. No partial index is
//                      ever returned.
//   ShapeMismatch    — tensor bookkeeping diverged from the tree
//                      bookkeeping. Always an upstream
//                      data-generation bug, never padded away.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Tree2SeqError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown {kind} '{name}', try one of: {}", valid.join(", "))]
    UnknownComponent {
        kind:  &'static str,
        name:  String,
        valid: Vec<&'static str>,
    },

    #[error("corrupt shard '{path}': {reason}")]
    CorruptShard { path: PathBuf, reason: String },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}
