// ============================================================
// Layer 5 — TreeLSTM Encoder
// ============================================================
// Child-sum Tree-LSTM over a batched tree graph.
//
// The whole batch is processed as one graph: nodes are grouped
// into topological levels following edge direction (an edge
// (source, target) means source's state feeds target), and each
// level is computed in one batched gate evaluation. With the
// dataset's inverted edges the sweep runs leaves → roots, so a
// root's state summarises its entire tree.
//
// Gate math per node j with children C(j):
//   h~  = Σ_{k∈C(j)} h_k
//   i,o = σ(W x_j + U h~)        u = tanh(W x_j + U h~)
//   f_k = σ(W_f x_j + U_f h_k)   per child k
//   c_j = i ⊙ u + Σ_k f_k ⊙ c_k
//   h_j = o ⊙ tanh(c_j)
//
// Reference: Tai et al. (2015) Improved Semantic Representations
//            From Tree-Structured LSTM Networks

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::sigmoid,
};

use crate::domain::tree::BatchedTrees;

#[derive(Config, Debug)]
pub struct TreeLstmConfig {
    pub input_size:  usize,
    pub hidden_size: usize,
}

impl TreeLstmConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TreeLstm<B> {
        TreeLstm {
            w_iou: LinearConfig::new(self.input_size, 3 * self.hidden_size).init(device),
            u_iou: LinearConfig::new(self.hidden_size, 3 * self.hidden_size)
                .with_bias(false)
                .init(device),
            w_f: LinearConfig::new(self.input_size, self.hidden_size).init(device),
            u_f: LinearConfig::new(self.hidden_size, self.hidden_size)
                .with_bias(false)
                .init(device),
            hidden_size: self.hidden_size,
        }
    }
}

#[derive(Module, Debug)]
pub struct TreeLstm<B: Backend> {
    w_iou: Linear<B>,
    u_iou: Linear<B>,
    w_f:   Linear<B>,
    u_f:   Linear<B>,
    hidden_size: usize,
}

impl<B: Backend> TreeLstm<B> {
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// graph: host topology; x: embedded nodes [n_nodes, input_size]
    /// → (hidden, memory) per node, each [n_nodes, hidden_size]
    pub fn forward(&self, graph: &BatchedTrees, x: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let n_nodes = graph.node_count();
        let device = x.device();
        let hidden = self.hidden_size;

        let levels = topological_levels(n_nodes, &graph.edges);

        // Out-edges grouped by the level of their source: once a
        // level's states exist, its contributions flow to targets
        // in strictly later levels.
        let mut level_of = vec![0usize; n_nodes];
        for (level_id, level) in levels.iter().enumerate() {
            for &node in level {
                level_of[node] = level_id;
            }
        }
        let mut edges_by_level: Vec<Vec<(usize, usize)>> = vec![Vec::new(); levels.len()];
        for &(source, target) in &graph.edges {
            edges_by_level[level_of[source]].push((source, target));
        }

        let mut h = Tensor::<B, 2>::zeros([n_nodes, hidden], &device);
        let mut c = Tensor::<B, 2>::zeros([n_nodes, hidden], &device);
        // Running child sums, accumulated as levels complete
        let mut h_sum = Tensor::<B, 2>::zeros([n_nodes, hidden], &device);
        let mut fc_sum = Tensor::<B, 2>::zeros([n_nodes, hidden], &device);

        for (level_id, level) in levels.iter().enumerate() {
            let idx = index_tensor::<B>(level, &device);

            let x_level = x.clone().select(0, idx.clone());
            let h_sum_level = h_sum.clone().select(0, idx.clone());

            let gates = self.w_iou.forward(x_level) + self.u_iou.forward(h_sum_level);
            let gates = gates.chunk(3, 1);
            let input_gate = sigmoid(gates[0].clone());
            let output_gate = sigmoid(gates[1].clone());
            let update = gates[2].clone().tanh();

            let c_level = input_gate * update + fc_sum.clone().select(0, idx.clone());
            let h_level = output_gate * c_level.clone().tanh();

            // select_assign accumulates; the slots are still zero,
            // so this writes the level's states exactly once.
            h = h.select_assign(0, idx.clone(), h_level.clone());
            c = c.select_assign(0, idx, c_level.clone());

            // Push this level's states up along its out-edges.
            let outgoing = &edges_by_level[level_id];
            if outgoing.is_empty() {
                continue;
            }
            let sources: Vec<usize> = outgoing.iter().map(|&(source, _)| source).collect();
            let targets: Vec<usize> = outgoing.iter().map(|&(_, target)| target).collect();
            let source_idx = index_tensor::<B>(&sources, &device);
            let target_idx = index_tensor::<B>(&targets, &device);

            let h_source = h.clone().select(0, source_idx.clone());
            let c_source = c.clone().select(0, source_idx);
            let x_target = x.clone().select(0, target_idx.clone());

            let forget = sigmoid(self.w_f.forward(x_target) + self.u_f.forward(h_source.clone()));
            h_sum = h_sum.select_assign(0, target_idx.clone(), h_source);
            fc_sum = fc_sum.select_assign(0, target_idx, forget * c_source);
        }

        (h, c)
    }
}

/// Kahn-style topological generations: level 0 holds every node
/// with no incoming edge, each later level the nodes whose last
/// dependency resolved in the level before it.
fn topological_levels(n_nodes: usize, edges: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut indegree = vec![0usize; n_nodes];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n_nodes];
    for &(source, target) in edges {
        indegree[target] += 1;
        outgoing[source].push(target);
    }

    let mut current: Vec<usize> = (0..n_nodes).filter(|&node| indegree[node] == 0).collect();
    let mut levels = Vec::new();
    while !current.is_empty() {
        let mut next = Vec::new();
        for &node in &current {
            for &target in &outgoing[node] {
                indegree[target] -= 1;
                if indegree[target] == 0 {
                    next.push(target);
                }
            }
        }
        levels.push(std::mem::replace(&mut current, next));
    }
    levels
}

fn index_tensor<B: Backend>(ids: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let ids: Vec<i32> = ids.iter().map(|&id| id as i32).collect();
    Tensor::from_ints(ids.as_slice(), device)
}
