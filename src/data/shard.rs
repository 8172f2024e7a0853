// ============================================================
// Layer 4 — Shard Container
// ============================================================
// A shard is one persisted file holding a single large batched
// tree graph plus a parallel list of label-id sequences, one per
// tree, in exactly the same order. Shards are written by the
// data preparation pipeline and immutable afterwards; this core
// only decodes them.
//
// File naming: shard_<n>.json — the numeric <n> (not the lexical
// file name) fixes the shard order, so batch numbering is
// reproducible across runs and filesystems.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::error::Tree2SeqError;
use crate::domain::tree::BatchedTrees;

pub const SHARD_PREFIX: &str = "shard_";
pub const SHARD_EXTENSION: &str = "json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shard {
    /// All of the shard's trees merged into one batched graph.
    pub trees: BatchedTrees,

    /// One label-id sequence per tree, index-aligned with the
    /// tree order inside `trees`.
    pub labels: Vec<Vec<u32>>,
}

impl Shard {
    pub fn tree_count(&self) -> usize {
        self.trees.tree_count()
    }

    /// Decode a shard file, validating its internal consistency.
    /// Any failure here is a `CorruptShard` — the caller aborts,
    /// it never works around a bad file.
    pub fn read(path: &Path) -> Result<Shard, Tree2SeqError> {
        let raw = fs::read_to_string(path).map_err(|e| corrupt(path, e.to_string()))?;
        let shard: Shard = serde_json::from_str(&raw).map_err(|e| corrupt(path, e.to_string()))?;
        shard.validate(path)?;
        Ok(shard)
    }

    /// Serialize to a shard file. Used by tests and offline
    /// preparation tooling; the training core never writes shards.
    pub fn write(&self, path: &Path) -> Result<(), Tree2SeqError> {
        let raw = serde_json::to_string(self).map_err(|e| corrupt(path, e.to_string()))?;
        fs::write(path, raw).map_err(|e| corrupt(path, e.to_string()))
    }

    fn validate(&self, path: &Path) -> Result<(), Tree2SeqError> {
        let trees = &self.trees;
        if self.labels.len() != trees.tree_count() {
            return Err(corrupt(
                path,
                format!(
                    "{} label sequences for {} trees",
                    self.labels.len(),
                    trees.tree_count()
                ),
            ));
        }
        if trees.tree_sizes.iter().any(|&size| size == 0) {
            return Err(corrupt(path, "zero-node tree".to_string()));
        }
        let node_count = trees.node_count();
        if trees.token_ids.len() != node_count || trees.type_ids.len() != node_count {
            return Err(corrupt(
                path,
                format!(
                    "feature lengths ({}, {}) do not cover {node_count} nodes",
                    trees.token_ids.len(),
                    trees.type_ids.len()
                ),
            ));
        }
        if trees
            .edges
            .iter()
            .any(|&(source, target)| source >= node_count || target >= node_count)
        {
            return Err(corrupt(path, "edge endpoint out of node range".to_string()));
        }
        Ok(())
    }
}

fn corrupt(path: &Path, reason: String) -> Tree2SeqError {
    Tree2SeqError::CorruptShard { path: path.to_path_buf(), reason }
}

/// Extract the numeric ordering key from a shard file name.
/// Returns None for anything that is not `shard_<n>.json`.
pub fn shard_numeric_id(file_name: &str) -> Option<u64> {
    let stem = file_name
        .strip_prefix(SHARD_PREFIX)?
        .strip_suffix(SHARD_EXTENSION)?
        .strip_suffix('.')?;
    stem.parse().ok()
}

/// The canonical file name for shard number `id`.
pub fn shard_file_name(id: u64) -> String {
    format!("{SHARD_PREFIX}{id}.{SHARD_EXTENSION}")
}

/// Convenience for building a shard path inside a directory.
pub fn shard_path(dir: &Path, id: u64) -> PathBuf {
    dir.join(shard_file_name(id))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tree::{NodeFeatures, Tree};

    fn two_tree_shard() -> Shard {
        let trees = vec![
            Tree::new(
                NodeFeatures { token_ids: vec![1, 2], type_ids: vec![0, 1] },
                vec![(0, 1)],
            ),
            Tree::new(NodeFeatures { token_ids: vec![3], type_ids: vec![2] }, Vec::new()),
        ];
        Shard {
            trees:  BatchedTrees::batch(&trees),
            labels: vec![vec![4, 5], vec![6]],
        }
    }

    #[test]
    fn test_numeric_id_parsing() {
        assert_eq!(shard_numeric_id("shard_0.json"), Some(0));
        assert_eq!(shard_numeric_id("shard_42.json"), Some(42));
        assert_eq!(shard_numeric_id("shard_x.json"), None);
        assert_eq!(shard_numeric_id("other_1.json"), None);
        assert_eq!(shard_numeric_id("shard_1.bin"), None);
    }

    #[test]
    fn test_file_name_round_trip() {
        assert_eq!(shard_numeric_id(&shard_file_name(17)), Some(17));
    }

    #[test]
    fn test_read_write_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = shard_path(dir.path(), 0);
        let shard = two_tree_shard();
        shard.write(&path).unwrap();
        assert_eq!(Shard::read(&path).unwrap(), shard);
    }

    #[test]
    fn test_label_count_mismatch_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = shard_path(dir.path(), 0);
        let mut shard = two_tree_shard();
        shard.labels.pop();
        shard.write(&path).unwrap();
        let err = Shard::read(&path).unwrap_err();
        assert!(matches!(err, Tree2SeqError::CorruptShard { .. }));
    }

    #[test]
    fn test_unreadable_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = shard_path(dir.path(), 3);
        std::fs::write(&path, "not json").unwrap();
        let err = Shard::read(&path).unwrap_err();
        assert!(matches!(err, Tree2SeqError::CorruptShard { .. }));
    }
}
