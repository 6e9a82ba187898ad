use core::cmp::Reverse;
use std::collections::VecDeque;

use fixedbitset::FixedBitSet;
use priority_queue::PriorityQueue;

/// The order in which the queued nodes are visited. The order never changes
/// the fixpoint, only the number of iterations needed to reach it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WorklistOrder {
    /// First in, first out.
    #[default]
    Fifo,
    /// Last in, first out.
    Lifo,
    /// Always visit the queued node that comes first in a reverse post-order
    /// of the graph, so predecessors tend to be processed before successors.
    ReversePostOrder,
}

enum Pending {
    Fifo(VecDeque<usize>),
    Lifo(Vec<usize>),
    Rpo {
        queue: PriorityQueue<usize, Reverse<usize>>,
        order: Vec<usize>,
    },
}

/// A worklist over node numbers with set semantics: pushing a node that is
/// already queued is a no-op.
pub struct Worklist {
    pending: Pending,
    queued: FixedBitSet,
}

impl Worklist {
    /// Create an empty worklist for a graph given as successor lists over
    /// node numbers.
    pub fn new(order: WorklistOrder, succs: &[Vec<usize>]) -> Self {
        let pending = match order {
            WorklistOrder::Fifo => Pending::Fifo(VecDeque::with_capacity(succs.len())),
            WorklistOrder::Lifo => Pending::Lifo(Vec::with_capacity(succs.len())),
            WorklistOrder::ReversePostOrder => Pending::Rpo {
                queue: PriorityQueue::with_capacity(succs.len()),
                order: reverse_post_order(succs),
            },
        };
        Self {
            pending,
            queued: FixedBitSet::with_capacity(succs.len()),
        }
    }

    /// Returns false when the node was already queued.
    pub fn push(&mut self, node: usize) -> bool {
        if self.queued.contains(node) {
            return false;
        }
        self.queued.insert(node);
        match &mut self.pending {
            Pending::Fifo(queue) => queue.push_back(node),
            Pending::Lifo(stack) => stack.push(node),
            Pending::Rpo { queue, order } => {
                queue.push(node, Reverse(order[node]));
            }
        }
        true
    }

    pub fn pop(&mut self) -> Option<usize> {
        let node = match &mut self.pending {
            Pending::Fifo(queue) => queue.pop_front(),
            Pending::Lifo(stack) => stack.pop(),
            Pending::Rpo { queue, .. } => queue.pop().map(|(node, _)| node),
        }?;
        self.queued.set(node, false);
        Some(node)
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_clear()
    }
}

/// Returns the position of every node in a reverse post-order of the graph.
/// The depth first traversals start from the nodes without predecessors,
/// nodes only reachable through cycles are visited afterwards in numbering
/// order.
pub fn reverse_post_order(succs: &[Vec<usize>]) -> Vec<usize> {
    let node_num = succs.len();
    let mut has_pred = FixedBitSet::with_capacity(node_num);
    for &succ in succs.iter().flatten() {
        has_pred.insert(succ);
    }

    let roots = (0..node_num)
        .filter(|&n| !has_pred.contains(n))
        .chain(0..node_num);
    let mut visited = FixedBitSet::with_capacity(node_num);
    let mut post_order = Vec::with_capacity(node_num);
    for root in roots {
        if visited.contains(root) {
            continue;
        }
        visited.insert(root);
        let mut stack = vec![(root, 0_usize)];
        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            if let Some(&succ) = succs[node].get(next) {
                top.1 += 1;
                if !visited.contains(succ) {
                    visited.insert(succ);
                    stack.push((succ, 0));
                }
            } else {
                post_order.push(node);
                stack.pop();
            }
        }
    }

    let mut order = vec![0; node_num];
    for (position, &node) in post_order.iter().rev().enumerate() {
        order[node] = position;
    }
    order
}
