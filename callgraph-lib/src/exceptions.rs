use core::fmt::Display;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use dataflow::bitvector::{self, BitVectorFunction, BitVectorTransferProvider, Universe};
use dataflow::domains::{BitSet, Lattice};
use dataflow::graph::{Graph, invert, with_self_loops};
use dataflow::solvers::{CancelToken, Solution, SolverError};
use itertools::Itertools;
use log::debug;

use crate::call_graph::{CallGraph, CgNode};

/// A reference to an exception type, e.g., `java.io.IOException`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExceptionType(pub String);

impl From<&str> for ExceptionType {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl Display for ExceptionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The exception behavior of the individual methods, computed by an
/// intraprocedural analysis of each call graph node: the exceptions a node
/// throws directly and the exceptions caught around each call site.
#[derive(Clone, Debug, Default)]
pub struct IntraproceduralResult {
    thrown: BTreeMap<CgNode, BTreeSet<ExceptionType>>,
    caught: BTreeMap<(CgNode, CgNode), BTreeSet<ExceptionType>>,
}

impl IntraproceduralResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_thrown(&mut self, node: CgNode, exception: impl Into<ExceptionType>) -> &mut Self {
        self.thrown.entry(node).or_default().insert(exception.into());
        self
    }

    /// Exceptions raised by `callee` that do not escape the call in `caller`.
    pub fn add_caught(
        &mut self,
        caller: CgNode,
        callee: CgNode,
        exception: impl Into<ExceptionType>,
    ) -> &mut Self {
        self.caught
            .entry((caller, callee))
            .or_default()
            .insert(exception.into());
        self
    }

    pub fn thrown(&self, node: CgNode) -> impl Iterator<Item = &ExceptionType> {
        self.thrown.get(&node).into_iter().flatten()
    }

    pub fn caught(&self, caller: CgNode, callee: CgNode) -> impl Iterator<Item = &ExceptionType> {
        self.caught.get(&(caller, callee)).into_iter().flatten()
    }

    /// Every exception type mentioned by the result, sorted and without
    /// duplicates.
    pub fn exceptions(&self) -> BTreeSet<ExceptionType> {
        self.thrown
            .values()
            .chain(self.caught.values())
            .flatten()
            .cloned()
            .collect()
    }
}

/// Maps sets of exception types to bit vectors and back.
#[derive(Clone, Debug)]
pub struct ExceptionToBitVector {
    universe: Universe<ExceptionType>,
}

impl ExceptionToBitVector {
    pub fn new(exceptions: impl IntoIterator<Item = ExceptionType>) -> Self {
        Self {
            universe: Universe::new(exceptions),
        }
    }

    pub fn universe(&self) -> &Universe<ExceptionType> {
        &self.universe
    }

    /// Exception types outside of the universe have no bit and are skipped.
    pub fn to_bits<'a>(&self, exceptions: impl IntoIterator<Item = &'a ExceptionType>) -> BitSet {
        let mut result = self.universe.bottom();
        for index in exceptions
            .into_iter()
            .filter_map(|exception| self.universe.index_of(exception))
        {
            result.insert(index);
        }
        result
    }

    pub fn compute_exceptions(&self, bits: &BitSet) -> BTreeSet<ExceptionType> {
        self.universe.to_values(bits).cloned().collect()
    }
}

/// Transfer functions over the inverted call graph, where the edges go from
/// callees to their callers. The exceptions of a callee flow into the caller
/// except for the ones caught at the call site. The exceptions thrown by a
/// node are its local value. The masks and local values are computed once
/// when the provider is created.
pub struct ExceptionTransferProvider {
    escaping: HashMap<(CgNode, CgNode), BitSet>,
    thrown: HashMap<CgNode, BitSet>,
}

impl ExceptionTransferProvider {
    pub fn new(intra: &IntraproceduralResult, transformer: &ExceptionToBitVector) -> Self {
        let top = BitSet::top(&transformer.universe.context());
        let escaping = intra
            .caught
            .iter()
            .filter_map(|(&(caller, callee), caught)| {
                let caught = transformer.to_bits(caught);
                if caught.is_bottom() {
                    return None;
                }
                let mut mask = top.clone();
                mask.difference_with(&caught);
                Some(((callee, caller), mask))
            })
            .collect();
        let thrown = intra
            .thrown
            .iter()
            .filter_map(|(&node, thrown)| {
                let bits = transformer.to_bits(thrown);
                (!bits.is_bottom()).then_some((node, bits))
            })
            .collect();
        Self { escaping, thrown }
    }
}

impl BitVectorTransferProvider<CgNode> for ExceptionTransferProvider {
    fn edge_function(&self, callee: &CgNode, caller: &CgNode) -> BitVectorFunction {
        match self.escaping.get(&(*callee, *caller)) {
            Some(mask) => BitVectorFunction::Filter(mask.clone()),
            None => BitVectorFunction::Identity,
        }
    }

    fn local_value(&self, node: &CgNode) -> Option<BitSet> {
        self.thrown.get(node).cloned()
    }
}

/// Computes the exception types that may escape each node of a call graph.
pub struct ExceptionAnalysis {
    transformer: ExceptionToBitVector,
    solution: Solution<CgNode, BitSet>,
}

impl ExceptionAnalysis {
    pub fn new(call_graph: &CallGraph, intra: &IntraproceduralResult) -> Result<Self, SolverError> {
        Self::with_cancel(call_graph, intra, &CancelToken::new())
    }

    pub fn with_cancel(
        call_graph: &CallGraph,
        intra: &IntraproceduralResult,
        cancel: &CancelToken,
    ) -> Result<Self, SolverError> {
        let transformer = ExceptionToBitVector::new(intra.exceptions());
        debug!(
            "Exception analysis over {} call graph nodes and {} exception types.",
            call_graph.node_count(),
            transformer.universe.len()
        );
        let provider = ExceptionTransferProvider::new(intra, &transformer);
        let graph = with_self_loops(invert(call_graph));
        let solution = bitvector::solve(&graph, &provider, &transformer.universe, cancel)?;
        Ok(Self {
            transformer,
            solution,
        })
    }

    /// The exception types that may escape the node, either thrown by the
    /// node itself or by one of its transitive callees.
    pub fn cg_node_exceptions(&self, node: CgNode) -> Result<BTreeSet<ExceptionType>, SolverError> {
        Ok(self
            .transformer
            .compute_exceptions(self.solution.get_in(&node)?))
    }

    /// One line per node, e.g., `CG node 0: IOException, ParseError`.
    pub fn summary(&self) -> String {
        self.solution
            .iter()
            .map(|(node, bits)| {
                let exceptions = self.transformer.universe.to_values(bits).join(", ");
                format!("{node}: {exceptions}")
            })
            .join("\n")
    }
}
