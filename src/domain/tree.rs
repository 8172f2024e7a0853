// ============================================================
// Layer 3 — Tree Domain Types
// ============================================================
// A method's AST as flat node storage plus directed edges,
// and the batched form that merges many trees into one graph.
//
// Conventions baked into every consumer:
//   - Node 0 of a tree is its root.
//   - An edge (source, target) means "source feeds target":
//     the encoder propagates state along edge direction.
//   - Shards persist edges pointing root → leaves; the dataset
//     inverts them per tree so the encoder runs leaves → root.
//
// Node features live behind an Arc so that inverting a tree's
// edges shares the feature vectors instead of copying them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ─── NodeFeatures ─────────────────────────────────────────────────────────────
/// Per-node feature ids, parallel vectors indexed by local node id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFeatures {
    /// Token id of each node (leaf identifiers, literals, ...)
    pub token_ids: Vec<u32>,

    /// AST node-type id of each node (MethodDeclaration, Block, ...)
    pub type_ids: Vec<u32>,
}

impl NodeFeatures {
    pub fn len(&self) -> usize {
        self.token_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_ids.is_empty()
    }
}

// ─── Tree ─────────────────────────────────────────────────────────────────────
/// One AST. Features are shared (`Arc`) between a tree and its
/// edge-inverted counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Arc<NodeFeatures>,

    /// Directed edges (source, target) over local node ids.
    pub edges: Vec<(usize, usize)>,
}

impl Tree {
    pub fn new(nodes: NodeFeatures, edges: Vec<(usize, usize)>) -> Self {
        Self { nodes: Arc::new(nodes), edges }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The same tree with every edge direction flipped.
    /// Node features are shared, not duplicated — inverting twice
    /// yields the original topology over the same feature storage.
    pub fn reversed(&self) -> Tree {
        Tree {
            nodes: Arc::clone(&self.nodes),
            edges: self.edges.iter().map(|&(source, target)| (target, source)).collect(),
        }
    }
}

// ─── BatchedTrees ─────────────────────────────────────────────────────────────
/// Many trees concatenated into a single graph: features flattened
/// end to end, edges renumbered into the global id space, and the
/// per-tree node counts kept as the only boundary record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchedTrees {
    pub token_ids: Vec<u32>,
    pub type_ids:  Vec<u32>,

    /// Edges over global node ids. Both endpoints of an edge always
    /// fall inside the same tree's node range.
    pub edges: Vec<(usize, usize)>,

    /// Number of nodes per tree, in tree order.
    pub tree_sizes: Vec<usize>,
}

impl BatchedTrees {
    /// Merge trees in order into one batched graph.
    pub fn batch(trees: &[Tree]) -> BatchedTrees {
        let mut batched = BatchedTrees {
            token_ids:  Vec::new(),
            type_ids:   Vec::new(),
            edges:      Vec::new(),
            tree_sizes: Vec::with_capacity(trees.len()),
        };
        let mut offset = 0usize;
        for tree in trees {
            batched.token_ids.extend_from_slice(&tree.nodes.token_ids);
            batched.type_ids.extend_from_slice(&tree.nodes.type_ids);
            for &(source, target) in &tree.edges {
                batched.edges.push((source + offset, target + offset));
            }
            batched.tree_sizes.push(tree.node_count());
            offset += tree.node_count();
        }
        batched
    }

    /// Split back into the individual trees, restoring local node ids.
    /// Exact inverse of [`BatchedTrees::batch`].
    pub fn unbatch(&self) -> Vec<Tree> {
        let offsets = self.root_indexes();
        let mut edges_per_tree: Vec<Vec<(usize, usize)>> = vec![Vec::new(); self.tree_count()];
        for &(source, target) in &self.edges {
            // partition_point gives the first offset > source; the edge's
            // owning tree is the one whose range starts just before it.
            let tree = offsets.partition_point(|&start| start <= source) - 1;
            edges_per_tree[tree].push((source - offsets[tree], target - offsets[tree]));
        }

        let mut trees = Vec::with_capacity(self.tree_count());
        for (tree, &start) in offsets.iter().enumerate() {
            let end = start + self.tree_sizes[tree];
            let nodes = NodeFeatures {
                token_ids: self.token_ids[start..end].to_vec(),
                type_ids:  self.type_ids[start..end].to_vec(),
            };
            trees.push(Tree::new(nodes, std::mem::take(&mut edges_per_tree[tree])));
        }
        trees
    }

    pub fn tree_count(&self) -> usize {
        self.tree_sizes.len()
    }

    pub fn node_count(&self) -> usize {
        self.tree_sizes.iter().sum()
    }

    /// Position of each tree's root in the flattened node ordering.
    /// Since node 0 of every tree is its root, these are the prefix
    /// sums of `tree_sizes`: one per tree, strictly increasing.
    pub fn root_indexes(&self) -> Vec<usize> {
        let mut indexes = Vec::with_capacity(self.tree_count());
        let mut offset = 0usize;
        for &size in &self.tree_sizes {
            indexes.push(offset);
            offset += size;
        }
        indexes
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    /// root(0) → {1, 2}, 1 → 3 — stored root-to-leaves.
    fn sample_tree() -> Tree {
        Tree::new(
            NodeFeatures {
                token_ids: vec![10, 11, 12, 13],
                type_ids:  vec![1, 2, 2, 3],
            },
            vec![(0, 1), (0, 2), (1, 3)],
        )
    }

    fn leaf_tree(token: u32) -> Tree {
        Tree::new(
            NodeFeatures { token_ids: vec![token], type_ids: vec![0] },
            Vec::new(),
        )
    }

    #[test]
    fn test_reversed_flips_every_edge() {
        let tree = sample_tree();
        let reversed = tree.reversed();
        assert_eq!(reversed.edges, vec![(1, 0), (2, 0), (3, 1)]);
    }

    #[test]
    fn test_double_inversion_is_identity() {
        let tree = sample_tree();
        let round_trip = tree.reversed().reversed();
        assert_eq!(round_trip.edges, tree.edges);
        assert_eq!(round_trip.nodes, tree.nodes);
    }

    #[test]
    fn test_inversion_shares_node_features() {
        let tree = sample_tree();
        let reversed = tree.reversed();
        // Same allocation, not a copy
        assert!(Arc::ptr_eq(&tree.nodes, &reversed.nodes));
    }

    #[test]
    fn test_batch_unbatch_round_trip() {
        let trees = vec![sample_tree(), leaf_tree(42), sample_tree()];
        let batched = BatchedTrees::batch(&trees);
        assert_eq!(batched.tree_count(), 3);
        assert_eq!(batched.node_count(), 9);
        assert_eq!(batched.unbatch(), trees);
    }

    #[test]
    fn test_batched_edges_are_renumbered() {
        let trees = vec![leaf_tree(1), sample_tree()];
        let batched = BatchedTrees::batch(&trees);
        // The second tree's nodes start at global id 1
        assert_eq!(batched.edges, vec![(1, 2), (1, 3), (2, 4)]);
    }

    #[test]
    fn test_root_indexes_are_strictly_increasing() {
        let trees = vec![sample_tree(), leaf_tree(7), sample_tree()];
        let batched = BatchedTrees::batch(&trees);
        let roots = batched.root_indexes();
        assert_eq!(roots.len(), batched.tree_count());
        assert_eq!(roots, vec![0, 4, 5]);
        assert!(roots.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
