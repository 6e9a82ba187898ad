use core::fmt::Debug;
use core::hash::Hash;
use std::collections::HashMap;

use fixedbitset::FixedBitSet;

use super::{EdgeLabels, Graph, GraphError};

/// Adjacency storage for graphs with few edges per node. Every node gets a
/// number in insertion order, and the neighbours of a node are stored as bit
/// sets over these numbers, so neighbours are always enumerated in node
/// insertion order.
#[derive(Clone, Debug)]
pub struct SparseGraph<T> {
    nodes: Vec<T>,
    numbers: HashMap<T, usize>,
    succs: Vec<FixedBitSet>,
    preds: Vec<FixedBitSet>,
}

impl<T> Default for SparseGraph<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            numbers: HashMap::new(),
            succs: Vec::new(),
            preds: Vec::new(),
        }
    }
}

fn insert_bit(set: &mut FixedBitSet, bit: usize) {
    if set.len() <= bit {
        set.grow(bit + 1);
    }
    set.insert(bit);
}

fn remove_bit(set: &mut FixedBitSet, bit: usize) {
    if set.contains(bit) {
        set.set(bit, false);
    }
}

impl<T: Clone + Eq + Hash + Debug> SparseGraph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node unless it is already present. Returns the number of the
    /// node.
    pub fn add_node(&mut self, node: T) -> usize {
        if let Some(&number) = self.numbers.get(&node) {
            return number;
        }
        let number = self.nodes.len();
        self.numbers.insert(node.clone(), number);
        self.nodes.push(node);
        self.succs.push(FixedBitSet::new());
        self.preds.push(FixedBitSet::new());
        number
    }

    /// Builder style helper to add an edge between nodes that are created
    /// on demand.
    pub fn connect(&mut self, src: T, dst: T) -> &mut Self {
        let src = self.add_node(src);
        let dst = self.add_node(dst);
        insert_bit(&mut self.succs[src], dst);
        insert_bit(&mut self.preds[dst], src);
        self
    }

    pub fn number(&self, node: &T) -> Result<usize, GraphError> {
        self.numbers
            .get(node)
            .copied()
            .ok_or_else(|| GraphError::invalid_node(node))
    }

    pub fn node(&self, number: usize) -> Option<&T> {
        self.nodes.get(number)
    }

    fn decode(&self, set: &FixedBitSet) -> Vec<T> {
        set.ones().map(|n| self.nodes[n].clone()).collect()
    }
}

impl<T: Clone + Eq + Hash + Debug> Graph for SparseGraph<T> {
    type Node = T;

    fn nodes(&self) -> Vec<T> {
        self.nodes.clone()
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn contains_node(&self, node: &T) -> bool {
        self.numbers.contains_key(node)
    }

    fn predecessors(&self, node: &T) -> Result<Vec<T>, GraphError> {
        Ok(self.decode(&self.preds[self.number(node)?]))
    }

    fn successors(&self, node: &T) -> Result<Vec<T>, GraphError> {
        Ok(self.decode(&self.succs[self.number(node)?]))
    }

    fn pred_count(&self, node: &T) -> Result<usize, GraphError> {
        Ok(self.preds[self.number(node)?].count_ones(..))
    }

    fn succ_count(&self, node: &T) -> Result<usize, GraphError> {
        Ok(self.succs[self.number(node)?].count_ones(..))
    }

    fn has_edge(&self, src: &T, dst: &T) -> bool {
        match (self.numbers.get(src), self.numbers.get(dst)) {
            (Some(&src), Some(&dst)) => self.succs[src].contains(dst),
            _ => false,
        }
    }

    fn add_edge(&mut self, src: &T, dst: &T) -> Result<(), GraphError> {
        let (src, dst) = (self.number(src)?, self.number(dst)?);
        insert_bit(&mut self.succs[src], dst);
        insert_bit(&mut self.preds[dst], src);
        Ok(())
    }

    fn remove_edge(&mut self, src: &T, dst: &T) -> Result<(), GraphError> {
        let (src, dst) = (self.number(src)?, self.number(dst)?);
        remove_bit(&mut self.succs[src], dst);
        remove_bit(&mut self.preds[dst], src);
        Ok(())
    }

    fn remove_all_incident_edges(&mut self, node: &T) -> Result<(), GraphError> {
        self.number(node)?;
        self.remove_incoming_edges(node)?;
        self.remove_outgoing_edges(node)
    }

    fn remove_incoming_edges(&mut self, node: &T) -> Result<(), GraphError> {
        let number = self.number(node)?;
        let preds = core::mem::take(&mut self.preds[number]);
        for pred in preds.ones() {
            remove_bit(&mut self.succs[pred], number);
        }
        Ok(())
    }

    fn remove_outgoing_edges(&mut self, node: &T) -> Result<(), GraphError> {
        let number = self.number(node)?;
        let succs = core::mem::take(&mut self.succs[number]);
        for succ in succs.ones() {
            remove_bit(&mut self.preds[succ], number);
        }
        Ok(())
    }
}

/// A [`SparseGraph`] where every edge carries one or more labels. Edges can
/// only be added together with a label, so [`Graph::add_edge`] is not
/// supported. Adding an existing edge again with a new label keeps the old
/// labels. Removing an edge drops all its labels.
#[derive(Clone, Debug)]
pub struct LabeledGraph<T, L> {
    graph: SparseGraph<T>,
    labels: HashMap<(usize, usize), Vec<L>>,
}

impl<T, L> Default for LabeledGraph<T, L> {
    fn default() -> Self {
        Self {
            graph: SparseGraph::default(),
            labels: HashMap::new(),
        }
    }
}

impl<T: Clone + Eq + Hash + Debug, L: Clone + Debug + PartialEq> LabeledGraph<T, L> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: T) -> usize {
        self.graph.add_node(node)
    }

    /// Adds the edge between two nodes of the graph, or a new label to an
    /// existing edge.
    pub fn add_labeled_edge(&mut self, src: &T, dst: &T, label: L) -> Result<(), GraphError> {
        let key = (self.graph.number(src)?, self.graph.number(dst)?);
        self.graph.add_edge(src, dst)?;
        self.insert_label(key, label);
        Ok(())
    }

    /// Builder style helper creating the nodes on demand.
    pub fn connect(&mut self, src: T, dst: T, label: L) -> &mut Self {
        let key = (self.graph.add_node(src.clone()), self.graph.add_node(dst.clone()));
        self.graph.connect(src, dst);
        self.insert_label(key, label);
        self
    }

    fn insert_label(&mut self, key: (usize, usize), label: L) {
        let labels = self.labels.entry(key).or_default();
        if !labels.contains(&label) {
            labels.push(label);
        }
    }

    fn drop_labels(&mut self, node: usize, incoming: bool, outgoing: bool) {
        self.labels
            .retain(|&(src, dst), _| !((incoming && dst == node) || (outgoing && src == node)));
    }
}

impl<T: Clone + Eq + Hash + Debug, L: Clone + Debug + PartialEq> Graph for LabeledGraph<T, L> {
    type Node = T;

    fn nodes(&self) -> Vec<T> {
        self.graph.nodes()
    }

    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn contains_node(&self, node: &T) -> bool {
        self.graph.contains_node(node)
    }

    fn predecessors(&self, node: &T) -> Result<Vec<T>, GraphError> {
        self.graph.predecessors(node)
    }

    fn successors(&self, node: &T) -> Result<Vec<T>, GraphError> {
        self.graph.successors(node)
    }

    fn pred_count(&self, node: &T) -> Result<usize, GraphError> {
        self.graph.pred_count(node)
    }

    fn succ_count(&self, node: &T) -> Result<usize, GraphError> {
        self.graph.succ_count(node)
    }

    fn has_edge(&self, src: &T, dst: &T) -> bool {
        self.graph.has_edge(src, dst)
    }

    fn remove_edge(&mut self, src: &T, dst: &T) -> Result<(), GraphError> {
        let key = (self.graph.number(src)?, self.graph.number(dst)?);
        self.graph.remove_edge(src, dst)?;
        self.labels.remove(&key);
        Ok(())
    }

    fn remove_all_incident_edges(&mut self, node: &T) -> Result<(), GraphError> {
        let number = self.graph.number(node)?;
        self.graph.remove_all_incident_edges(node)?;
        self.drop_labels(number, true, true);
        Ok(())
    }

    fn remove_incoming_edges(&mut self, node: &T) -> Result<(), GraphError> {
        let number = self.graph.number(node)?;
        self.graph.remove_incoming_edges(node)?;
        self.drop_labels(number, true, false);
        Ok(())
    }

    fn remove_outgoing_edges(&mut self, node: &T) -> Result<(), GraphError> {
        let number = self.graph.number(node)?;
        self.graph.remove_outgoing_edges(node)?;
        self.drop_labels(number, false, true);
        Ok(())
    }
}

impl<T: Clone + Eq + Hash + Debug, L: Clone + Debug + PartialEq> EdgeLabels for LabeledGraph<T, L> {
    type Label = L;

    fn edge_labels(&self, src: &T, dst: &T) -> Vec<L> {
        match (self.graph.number(src), self.graph.number(dst)) {
            (Ok(src), Ok(dst)) => self.labels.get(&(src, dst)).cloned().unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}
