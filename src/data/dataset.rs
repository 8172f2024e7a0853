// ============================================================
// Layer 4 — Sharded Tree Dataset
// ============================================================
// Maps a dense range of batch ids onto sub-ranges of shard
// files, keeping at most one decoded shard in memory.
//
// Construction pays the full index cost up front: every shard is
// decoded once to learn its tree count, and each shard's tree
// index space is sliced into consecutive batch_size chunks (the
// last chunk per shard may be shorter). The resulting descriptor
// table is never mutated afterwards.
//
// `get_batch` is built for the training-loop access pattern —
// monotonically non-decreasing batch ids — where the single-slot
// cache gives O(1) amortized shard reloads. Arbitrary access
// order stays correct, it just reloads more. One resident shard
// at a time is a deliberate memory trade-off; there is no
// multi-shard caching and no partial eviction.

use std::fs;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use crate::data::shard::{shard_numeric_id, Shard};
use crate::domain::error::Tree2SeqError;
use crate::domain::tree::{BatchedTrees, Tree};

// ─── BatchDescriptor ──────────────────────────────────────────────────────────
/// Where one batch lives: a shard file and a contiguous tree
/// range `start..end` inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDescriptor {
    pub shard_file: String,
    pub start:      usize,
    pub end:        usize,
}

// ─── AssembledBatch ───────────────────────────────────────────────────────────
/// The trees of one batch re-merged into a single graph, plus the
/// label sequences for exactly the same tree range, index-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledBatch {
    pub trees:  BatchedTrees,
    pub labels: Vec<Vec<u32>>,
}

// ─── ShardCache ───────────────────────────────────────────────────────────────
/// Single-slot cache over decoded shards. Keyed by file name,
/// replaced wholesale on miss. Owned by the dataset — never
/// shared, never global.
#[derive(Debug, Default)]
struct ShardCache {
    current_shard: Option<String>,
    contents:      Option<Shard>,
}

impl ShardCache {
    /// Return the cached shard, decoding and evicting first if the
    /// requested file differs from the resident one.
    fn get_or_load(&mut self, dir: &Path, file: &str) -> Result<&Shard, Tree2SeqError> {
        if self.contents.is_none() || self.current_shard.as_deref() != Some(file) {
            let shard = Shard::read(&dir.join(file))?;
            self.current_shard = Some(file.to_owned());
            self.contents = Some(shard);
        }
        Ok(self.contents.as_ref().expect("shard cache slot just filled"))
    }
}

// ─── ShardedTreeDataset ───────────────────────────────────────────────────────
#[derive(Debug)]
pub struct ShardedTreeDataset {
    shard_dir:    PathBuf,
    batch_size:   usize,
    invert_edges: bool,
    descriptors:  Vec<BatchDescriptor>,
    cache:        ShardCache,
}

impl ShardedTreeDataset {
    /// Build the batch-id index for a directory of shard files.
    ///
    /// Shards are ordered by the numeric id embedded in their file
    /// name; files without the `shard_<n>.json` shape are ignored.
    /// A missing directory is a Configuration error; a shard that
    /// fails to decode aborts construction with CorruptShard — no
    /// partial index is ever returned.
    pub fn new(
        shard_dir: impl Into<PathBuf>,
        batch_size: usize,
        invert_edges: bool,
    ) -> Result<Self, Tree2SeqError> {
        let shard_dir = shard_dir.into();
        if batch_size == 0 {
            return Err(Tree2SeqError::Configuration("batch_size must be positive".into()));
        }
        if !shard_dir.is_dir() {
            return Err(Tree2SeqError::Configuration(format!(
                "shard directory '{}' does not exist",
                shard_dir.display()
            )));
        }

        let mut files: Vec<(u64, String)> = Vec::new();
        for entry in fs::read_dir(&shard_dir).map_err(|e| {
            Tree2SeqError::Configuration(format!(
                "cannot read shard directory '{}': {e}",
                shard_dir.display()
            ))
        })? {
            let entry = entry.map_err(|e| {
                Tree2SeqError::Configuration(format!(
                    "cannot read shard directory '{}': {e}",
                    shard_dir.display()
                ))
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(id) = shard_numeric_id(&name) {
                files.push((id, name));
            }
        }
        files.sort_unstable();

        tracing::info!("indexing {} shard files in '{}'", files.len(), shard_dir.display());
        let progress = scan_progress(files.len());

        // Decode every shard once to learn its tree count — the one
        // unavoidable up-front I/O cost of a gap-free index.
        let mut descriptors = Vec::new();
        for (_, name) in &files {
            let shard = Shard::read(&shard_dir.join(name))?;
            let tree_count = shard.tree_count();
            let mut start = 0usize;
            while start < tree_count {
                let end = (start + batch_size).min(tree_count);
                descriptors.push(BatchDescriptor { shard_file: name.clone(), start, end });
                start = end;
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        tracing::info!("dataset ready: {} batches (batch_size={batch_size})", descriptors.len());
        Ok(Self {
            shard_dir,
            batch_size,
            invert_edges,
            descriptors,
            cache: ShardCache::default(),
        })
    }

    /// Number of batches: sum of ceil(tree_count / batch_size)
    /// over all shards.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn descriptor(&self, batch_id: usize) -> Option<&BatchDescriptor> {
        self.descriptors.get(batch_id)
    }

    /// Assemble the batch for `batch_id`: load (or reuse) the owning
    /// shard, slice out the tree range, invert each tree's edges if
    /// configured, and re-batch with the aligned label slice.
    ///
    /// Inversion is reconstructed from the cached shard on every
    /// call, so repeated requests for the same id return identical
    /// content — nothing accumulates across calls.
    pub fn get_batch(&mut self, batch_id: usize) -> Result<AssembledBatch, Tree2SeqError> {
        let descriptor = self
            .descriptors
            .get(batch_id)
            .cloned()
            .ok_or_else(|| {
                Tree2SeqError::Configuration(format!(
                    "batch id {batch_id} out of range 0..{}",
                    self.descriptors.len()
                ))
            })?;

        let shard = self.cache.get_or_load(&self.shard_dir, &descriptor.shard_file)?;
        let trees = shard.trees.unbatch();
        let selected = &trees[descriptor.start..descriptor.end];

        let rebatched = if self.invert_edges {
            let inverted: Vec<Tree> = selected.iter().map(Tree::reversed).collect();
            BatchedTrees::batch(&inverted)
        } else {
            BatchedTrees::batch(selected)
        };
        let labels = shard.labels[descriptor.start..descriptor.end].to_vec();

        Ok(AssembledBatch { trees: rebatched, labels })
    }
}

fn scan_progress(shards: usize) -> ProgressBar {
    let progress = ProgressBar::new(shards as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} indexing shards [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    progress
}
