use core::fmt::Debug;
use core::hash::Hash;
use std::collections::HashMap;

use super::domains::{BitSet, BitSetTop, JoinSemiLattice};
use super::graph::Graph;
use super::solvers::{
    CancelToken, Solution, SolverError, TransferFunctionProvider, WorklistSolver,
};

/// The fixed, ordered domain of values tracked by a bit vector framework.
/// The position of a value in the universe is its bit in every [`BitSet`]
/// of the run, so the universe cannot change once it is built.
#[derive(Clone, Debug)]
pub struct Universe<V> {
    values: Vec<V>,
    indices: HashMap<V, usize>,
}

impl<V: Clone + Eq + Hash + Debug> Universe<V> {
    /// Duplicates are dropped, the first occurrence determines the index.
    pub fn new(values: impl IntoIterator<Item = V>) -> Self {
        let mut result = Self {
            values: Vec::new(),
            indices: HashMap::new(),
        };
        for value in values {
            if !result.indices.contains_key(&value) {
                result.indices.insert(value.clone(), result.values.len());
                result.values.push(value);
            }
        }
        result
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn index_of(&self, value: &V) -> Option<usize> {
        self.indices.get(value).copied()
    }

    pub fn value(&self, index: usize) -> Option<&V> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn context(&self) -> BitSetTop {
        BitSetTop(self.values.len())
    }

    pub fn bottom(&self) -> BitSet {
        BitSet::bottom(&self.context())
    }

    /// Returns `None` if any of the values is not part of the universe.
    pub fn to_bits<'a>(&self, values: impl IntoIterator<Item = &'a V>) -> Option<BitSet>
    where
        V: 'a,
    {
        let mut result = self.bottom();
        for value in values {
            result.insert(self.index_of(value)?);
        }
        Some(result)
    }

    /// The values of the set bits in universe order.
    pub fn to_values<'a>(&'a self, bits: &'a BitSet) -> impl Iterator<Item = &'a V> + 'a {
        bits.ones().filter_map(|index| self.values.get(index))
    }
}

/// The closed family of monotone transfer functions over bit vectors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BitVectorFunction {
    Identity,
    /// Adds the given bits to the input.
    Union(BitSet),
    /// Keeps only the given bits of the input.
    Filter(BitSet),
    /// Removes the `kill` bits, then adds the `generate` bits.
    KillGen { kill: BitSet, generate: BitSet },
    /// Ignores the input.
    Constant(BitSet),
}

impl BitVectorFunction {
    pub fn apply(&self, input: &BitSet) -> BitSet {
        match self {
            BitVectorFunction::Identity => input.clone(),
            BitVectorFunction::Union(bits) => {
                let mut result = input.clone();
                result.union_with(bits);
                result
            }
            BitVectorFunction::Filter(mask) => {
                let mut result = input.clone();
                result.intersect_with(mask);
                result
            }
            BitVectorFunction::KillGen { kill, generate } => {
                let mut result = input.clone();
                result.difference_with(kill);
                result.union_with(generate);
                result
            }
            BitVectorFunction::Constant(bits) => bits.clone(),
        }
    }
}

/// Provides the bit vector transfer functions of a framework.
///
/// The local facts of a node enter the fixpoint through the self edge of a
/// [`crate::graph::SelfLoops`] view: the default
/// [`BitVectorTransferProvider::transfer_function`] maps an edge `(n, n)` to
/// the union with the local value of `n`. A self edge of the wrapped graph
/// (e.g., a recursive call) only transfers a subset of the value of `n` in
/// a monotone framework, so the union subsumes it.
pub trait BitVectorTransferProvider<N: PartialEq> {
    /// The transfer function of an edge between two distinct nodes.
    fn edge_function(&self, pred: &N, succ: &N) -> BitVectorFunction;

    /// Facts produced by the node itself, independently of its predecessors.
    fn local_value(&self, _node: &N) -> Option<BitSet> {
        None
    }

    fn transfer_function(&self, pred: &N, succ: &N) -> BitVectorFunction {
        if pred != succ {
            return self.edge_function(pred, succ);
        }
        match self.local_value(succ) {
            Some(local) => BitVectorFunction::Union(local),
            None => BitVectorFunction::Identity,
        }
    }
}

/// Adapts a [`BitVectorTransferProvider`] to the generic solvers.
pub struct BitVectorProblem<'a, P: ?Sized>(&'a P);

impl<'a, P: ?Sized> BitVectorProblem<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self(provider)
    }
}

impl<N, P> TransferFunctionProvider<N, BitSet> for BitVectorProblem<'_, P>
where
    N: PartialEq,
    P: BitVectorTransferProvider<N> + ?Sized,
{
    fn transfer(&self, pred: &N, succ: &N, input: &BitSet, _ctx: &BitSetTop) -> BitSet {
        self.0.transfer_function(pred, succ).apply(input)
    }
}

/// Solve a bit vector framework with the default [`WorklistSolver`].
pub fn solve<G, V, P>(
    graph: &G,
    provider: &P,
    universe: &Universe<V>,
    cancel: &CancelToken,
) -> Result<Solution<G::Node, BitSet>, SolverError>
where
    G: Graph,
    V: Clone + Eq + Hash + Debug,
    P: BitVectorTransferProvider<G::Node> + ?Sized,
{
    WorklistSolver::default().solve(
        graph,
        &universe.context(),
        &BitVectorProblem::new(provider),
        cancel,
    )
}
