use core::fmt::Debug;
use core::hash::Hash;
use core::marker::PhantomData;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, trace};
use thiserror::Error;

use super::domains::JoinSemiLattice;
use super::graph::{Graph, GraphError};

mod worklist;
pub use worklist::*;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("node {0} was not part of the solved graph")]
    UnknownNode(String),
    #[error("the solver was cancelled before reaching a fixpoint")]
    Cancelled,
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Transfer functions need to implement this trait. For the most common
/// cases creating an [`EdgeTransfer`] from a closure should be sufficient.
pub trait TransferFunctionProvider<N, D: JoinSemiLattice> {
    /// Apply the effects of traversing the edge `pred -> succ` to the value
    /// of `pred`. The result is joined with the contributions of the other
    /// predecessors of `succ`.
    ///
    /// Requirements:
    /// * Pure: the same input always produces the same output.
    /// * Monotone: a <= b => transfer(a) <= transfer(b)
    ///
    /// It is evaluated many times per edge, so it needs to be cheap.
    fn transfer(&self, pred: &N, succ: &N, input: &D, ctx: &D::LatticeContext) -> D;
}

/// Small utility so users do not need to create a new struct for every
/// transfer function.
pub struct EdgeTransfer<F, N, D>
where
    D: JoinSemiLattice,
    F: Fn(&N, &N, &D, &D::LatticeContext) -> D,
{
    func: F,
    phantom: PhantomData<(N, D)>,
}

impl<F, N, D> TransferFunctionProvider<N, D> for EdgeTransfer<F, N, D>
where
    D: JoinSemiLattice,
    F: Fn(&N, &N, &D, &D::LatticeContext) -> D,
{
    fn transfer(&self, pred: &N, succ: &N, input: &D, ctx: &D::LatticeContext) -> D {
        (self.func)(pred, succ, input, ctx)
    }
}

impl<F, N, D> EdgeTransfer<F, N, D>
where
    D: JoinSemiLattice,
    F: Fn(&N, &N, &D, &D::LatticeContext) -> D,
{
    /// Create a new transfer function from a closure or function.
    pub fn new(func: F) -> Self {
        Self {
            func,
            phantom: PhantomData,
        }
    }
}

/// Cooperative cancellation flag. Clones share the flag, so a solve can be
/// cancelled from another thread.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The fixpoint computed by a solver: the value flowing into each node of
/// the solved graph.
#[derive(Clone, Debug)]
pub struct Solution<N, D> {
    numbers: HashMap<N, usize>,
    nodes: Vec<N>,
    values: Vec<D>,
    iterations: usize,
}

impl<N: Clone + Eq + Hash + Debug, D> Solution<N, D> {
    /// Returns [`SolverError::UnknownNode`] for nodes that were not part of
    /// the solved graph.
    pub fn get_in(&self, node: &N) -> Result<&D, SolverError> {
        self.numbers
            .get(node)
            .map(|&n| &self.values[n])
            .ok_or_else(|| SolverError::UnknownNode(format!("{node:?}")))
    }

    /// The number of nodes evaluated before reaching the fixpoint.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The nodes and their values in the order of [`Graph::nodes`].
    pub fn iter(&self) -> impl Iterator<Item = (&N, &D)> {
        self.nodes.iter().zip(self.values.iter())
    }

    pub fn into_map(self) -> HashMap<N, D> {
        self.nodes.into_iter().zip(self.values).collect()
    }
}

/// A worklist solver for monotone frameworks over lattices of finite height.
///
/// Every node starts from bottom. The value of a node is the join of the
/// transferred values of all its predecessors. Whenever the value of a node
/// changes its successors are queued for reevaluation. Use
/// [`crate::graph::invert`] for backward problems and
/// [`crate::graph::with_self_loops`] when the value of a node has to include
/// facts produced by the node itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct WorklistSolver {
    pub order: WorklistOrder,
}

impl WorklistSolver {
    pub fn new(order: WorklistOrder) -> Self {
        Self { order }
    }

    /// Run the solver to convergence. The topology of the graph is read once
    /// at the start, it must not change during the solve.
    ///
    /// The cancellation token is checked once per worklist iteration. A
    /// cancelled solve returns [`SolverError::Cancelled`] and no values.
    pub fn solve<G, D, P>(
        &self,
        graph: &G,
        ctx: &D::LatticeContext,
        transfer: &P,
        cancel: &CancelToken,
    ) -> Result<Solution<G::Node, D>, SolverError>
    where
        G: Graph,
        D: JoinSemiLattice,
        P: TransferFunctionProvider<G::Node, D> + ?Sized,
    {
        let nodes = graph.nodes();
        let numbers: HashMap<G::Node, usize> = nodes
            .iter()
            .cloned()
            .enumerate()
            .map(|(number, node)| (node, number))
            .collect();
        let number_all = |neighbours: Vec<G::Node>| -> Result<Vec<usize>, GraphError> {
            neighbours
                .iter()
                .map(|n| numbers.get(n).copied().ok_or_else(|| GraphError::invalid_node(n)))
                .collect()
        };
        let mut preds = Vec::with_capacity(nodes.len());
        let mut succs = Vec::with_capacity(nodes.len());
        for node in &nodes {
            preds.push(number_all(graph.predecessors(node)?)?);
            succs.push(number_all(graph.successors(node)?)?);
        }

        debug!(
            "Solving over {} nodes with a {:?} worklist.",
            nodes.len(),
            self.order
        );

        let mut values = vec![D::bottom(ctx); nodes.len()];
        let mut worklist = Worklist::new(self.order, &succs);
        for number in 0..nodes.len() {
            worklist.push(number);
        }

        let mut iterations = 0_usize;
        loop {
            if cancel.is_cancelled() {
                debug!("Solve cancelled after {iterations} iterations.");
                return Err(SolverError::Cancelled);
            }
            let Some(current) = worklist.pop() else {
                break;
            };
            iterations += 1;

            let mut new_value = D::bottom(ctx);
            for &pred in &preds[current] {
                let transferred =
                    transfer.transfer(&nodes[pred], &nodes[current], &values[pred], ctx);
                new_value = new_value.join(&transferred, ctx);
            }

            if new_value == values[current] {
                continue;
            }
            debug_assert!(
                values[current] <= new_value,
                "Non-monotone transfer function at {:?}",
                nodes[current]
            );
            trace!(
                "{:?}: {:?} -> {:?}",
                nodes[current], values[current], new_value
            );
            values[current] = new_value;
            for &succ in &succs[current] {
                worklist.push(succ);
            }
        }

        debug!("Converged after {iterations} iterations.");
        Ok(Solution {
            numbers,
            nodes,
            values,
            iterations,
        })
    }
}
